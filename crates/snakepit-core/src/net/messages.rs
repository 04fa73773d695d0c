use serde::{Deserialize, Serialize};

use crate::grid::GridCell;
use crate::player::{PlayerId, RosterEntry};

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    CreateRoom = 0x01,
    JoinRoom = 0x02,
    LeaveRoom = 0x03,
    StartGame = 0x04,
    Move = 0x05,
    Death = 0x06,

    // Server -> Client
    RoomCreated = 0x10,
    RoomJoined = 0x11,
    Roster = 0x12,
    GameStarted = 0x13,
    PlayerMoved = 0x14,
    PlayerDead = 0x15,
    GameOver = 0x16,
    Error = 0x17,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::CreateRoom),
            0x02 => Some(Self::JoinRoom),
            0x03 => Some(Self::LeaveRoom),
            0x04 => Some(Self::StartGame),
            0x05 => Some(Self::Move),
            0x06 => Some(Self::Death),
            0x10 => Some(Self::RoomCreated),
            0x11 => Some(Self::RoomJoined),
            0x12 => Some(Self::Roster),
            0x13 => Some(Self::GameStarted),
            0x14 => Some(Self::PlayerMoved),
            0x15 => Some(Self::PlayerDead),
            0x16 => Some(Self::GameOver),
            0x17 => Some(Self::Error),
            _ => None,
        }
    }
}

// ---- Client -> Server payloads ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomMsg {
    pub protocol_version: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomMsg {
    pub room_code: String,
    pub protocol_version: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRoomMsg {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartGameMsg {
    pub room_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveMsg {
    pub room_code: String,
    pub player_id: PlayerId,
    /// Head-first cells of the reporting player's snake.
    pub cells: Vec<GridCell>,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathMsg {
    pub room_code: String,
    pub player_id: PlayerId,
}

// ---- Server -> Client payloads ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCreatedMsg {
    pub room_code: String,
    pub player_id: PlayerId,
}

/// Ack sent to a joining player before the roster broadcast, carrying the
/// identity the server assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomJoinedMsg {
    pub room_code: String,
    pub player_id: PlayerId,
}

/// Full membership list, broadcast to the whole room after every join and
/// after a leave that does not empty the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterMsg {
    pub room_code: String,
    pub players: Vec<RosterEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStartedMsg {
    pub room_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMovedMsg {
    pub player_id: PlayerId,
    pub name: String,
    pub cells: Vec<GridCell>,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDeadMsg {
    pub player_id: PlayerId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOverMsg {
    pub winner_id: PlayerId,
    pub winner_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMsg {
    pub message: String,
}

// ---- Message enums ----

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    CreateRoom(CreateRoomMsg),
    JoinRoom(JoinRoomMsg),
    LeaveRoom(LeaveRoomMsg),
    StartGame(StartGameMsg),
    Move(MoveMsg),
    Death(DeathMsg),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    RoomCreated(RoomCreatedMsg),
    RoomJoined(RoomJoinedMsg),
    Roster(RosterMsg),
    GameStarted(GameStartedMsg),
    PlayerMoved(PlayerMovedMsg),
    PlayerDead(PlayerDeadMsg),
    GameOver(GameOverMsg),
    Error(ErrorMsg),
}
