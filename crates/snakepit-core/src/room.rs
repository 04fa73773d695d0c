use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::player::{Player, PlayerId, RosterEntry};

/// Room codes are short, shareable, and case-normalized: six characters
/// drawn from uppercase letters and digits.
pub const ROOM_CODE_LEN: usize = 6;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random room code. Uniqueness against live rooms is the
/// registry's job; collisions are expected and retried there.
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Check the room code format: exactly six uppercase alphanumerics.
pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Configuration for a room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoomConfig {
    pub max_players: u8,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self { max_players: 8 }
    }
}

/// Lifecycle state of a room.
///
/// `Ended` is transient: it is entered when a round resolves and left for
/// `Lobby` in the same registry operation, so it is never observable from
/// outside the room lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    /// Accepting joins; movement relay disabled.
    Lobby,
    /// Round in progress; joins rejected, relay enabled.
    Active,
    /// Round just resolved; about to reset to Lobby.
    Ended,
}

impl RoomState {
    /// Whether moving from `self` to `target` is a legal transition.
    pub fn can_transition_to(self, target: RoomState) -> bool {
        matches!(
            (self, target),
            (RoomState::Lobby, RoomState::Active)
                | (RoomState::Active, RoomState::Ended)
                | (RoomState::Ended, RoomState::Lobby)
        )
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Active => write!(f, "Active"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}

/// Why a room operation was rejected. Every variant maps to an error
/// reply sent only to the requesting connection; none of them affect
/// other room members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomError {
    RoomNotFound,
    GameAlreadyStarted,
    NotOwner,
    InsufficientPlayers,
    RoomFull,
}

impl std::fmt::Display for RoomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoomNotFound => write!(f, "Room not found"),
            Self::GameAlreadyStarted => write!(f, "Game has already started"),
            Self::NotOwner => write!(f, "Only the room owner can start the game"),
            Self::InsufficientPlayers => write!(f, "Need at least two players to start"),
            Self::RoomFull => write!(f, "Room is full"),
        }
    }
}

impl std::error::Error for RoomError {}

/// A named session grouping players for one round.
///
/// Insertion order of `players` is join order. The struct is plain data;
/// serialization of mutations is the owner's (the registry's) concern.
#[derive(Debug, Clone)]
pub struct Room {
    pub code: String,
    pub players: Vec<Player>,
    /// Creator of the room; the only player allowed to start a round.
    pub owner: PlayerId,
    pub state: RoomState,
    pub config: RoomConfig,
}

impl Room {
    pub fn new(code: String, creator: Player, config: RoomConfig) -> Self {
        let owner = creator.id;
        Self {
            code,
            players: vec![creator],
            owner,
            state: RoomState::Lobby,
            config,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn is_member(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.config.max_players as usize
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.alive).count()
    }

    /// Remove a player. Returns true if the player was a member.
    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        self.players.len() != before
    }

    /// Reset after a resolved round: everyone back alive, state to Lobby,
    /// membership untouched so the same players can go again.
    pub fn reset_round(&mut self) {
        for p in &mut self.players {
            p.alive = true;
        }
        self.state = RoomState::Lobby;
    }

    pub fn roster(&self) -> Vec<RosterEntry> {
        self.players.iter().map(RosterEntry::from).collect()
    }
}
