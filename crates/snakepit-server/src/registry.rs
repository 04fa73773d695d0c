use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use rand::Rng;
use tokio::sync::{Mutex, RwLock, mpsc};

use snakepit_core::grid::GridCell;
use snakepit_core::net::messages::{
    GameOverMsg, GameStartedMsg, PlayerDeadMsg, PlayerMovedMsg, RosterMsg, ServerMessage,
};
use snakepit_core::net::protocol::encode_server_message;
use snakepit_core::player::{Player, PlayerId};
use snakepit_core::room::{
    Room, RoomConfig, RoomError, RoomState, generate_room_code,
};

use crate::config::RoomsConfig;

/// Per-player sender for outbound WebSocket binary messages. Bounded so a
/// slow client cannot exhaust memory; `Bytes` allows zero-copy cloning
/// when fanning out to the whole room.
pub type PlayerSender = mpsc::Sender<Bytes>;

/// A room plus the outbound channels of its connected members.
struct RoomEntry {
    room: Room,
    connections: HashMap<PlayerId, PlayerSender>,
}

impl RoomEntry {
    /// Send raw bytes to one member. Failures (slow or just-disconnected
    /// clients) are logged and dropped; a broadcast in flight to a removed
    /// connection is a no-op, not an error.
    fn send_to(&self, player_id: PlayerId, data: Bytes) {
        if let Some(sender) = self.connections.get(&player_id)
            && let Err(e) = sender.try_send(data)
        {
            tracing::debug!(
                player_id, room = %self.room.code, error = %e,
                "Failed to send to player (slow or disconnected)"
            );
        }
    }

    /// Broadcast raw bytes to all members.
    fn broadcast(&self, data: &[u8]) {
        let bytes = Bytes::copy_from_slice(data);
        for &pid in self.connections.keys() {
            self.send_to(pid, bytes.clone());
        }
    }

    /// Broadcast raw bytes to all members except one.
    fn broadcast_except(&self, exclude: PlayerId, data: &[u8]) {
        let bytes = Bytes::copy_from_slice(data);
        for &pid in self.connections.keys() {
            if pid != exclude {
                self.send_to(pid, bytes.clone());
            }
        }
    }

    /// Build and broadcast the current membership list to everyone.
    fn broadcast_roster(&self) {
        let msg = ServerMessage::Roster(RosterMsg {
            room_code: self.room.code.clone(),
            players: self.room.roster(),
        });
        if let Ok(data) = encode_server_message(&msg) {
            self.broadcast(&data);
        }
    }
}

type SharedEntry = Arc<Mutex<RoomEntry>>;

/// Registry-level maps. Guarded by one `RwLock`: code allocation and
/// membership changes take the write lock, the relay path only reads it
/// to resolve the room handle.
struct RegistryInner {
    rooms: HashMap<String, SharedEntry>,
    /// Maps each live connection to the room it belongs to. A connection
    /// is in at most one room (key invariant).
    memberships: HashMap<PlayerId, String>,
    next_player_id: PlayerId,
}

impl RegistryInner {
    fn alloc_player_id(&mut self) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        id
    }
}

/// Owns all active rooms: creates them, routes events to them, destroys
/// them when they empty.
///
/// Lock order is registry → room, never the reverse. Mutations to a given
/// room are serialized by its own mutex, so events for one room apply in
/// arrival order while independent rooms proceed concurrently.
pub struct RoomRegistry {
    room_config: RoomConfig,
    grid_size: i32,
    inner: RwLock<RegistryInner>,
}

impl RoomRegistry {
    pub fn new(config: &RoomsConfig) -> Self {
        Self {
            room_config: RoomConfig {
                max_players: config.max_players,
            },
            grid_size: config.grid_size,
            inner: RwLock::new(RegistryInner {
                rooms: HashMap::new(),
                memberships: HashMap::new(),
                next_player_id: 1,
            }),
        }
    }

    /// Create a new room with the caller as sole member and owner.
    /// Always succeeds; code collisions with live rooms are retried here
    /// and invisible to the caller.
    pub async fn create_room(&self, sender: PlayerSender) -> (String, PlayerId) {
        let mut inner = self.inner.write().await;

        let code = loop {
            let candidate = generate_room_code();
            if !inner.rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        let player_id = inner.alloc_player_id();
        let center = GridCell::new(self.grid_size / 2, self.grid_size / 2);
        let creator = Player::new(player_id, "Player 1".to_string(), center);
        let room = Room::new(code.clone(), creator, self.room_config);

        let mut connections = HashMap::new();
        connections.insert(player_id, sender);

        inner.rooms.insert(
            code.clone(),
            Arc::new(Mutex::new(RoomEntry { room, connections })),
        );
        inner.memberships.insert(player_id, code.clone());

        tracing::info!(player_id, room = %code, "Room created");
        (code, player_id)
    }

    /// Join an existing lobby. On success the new member is appended, the
    /// updated roster is broadcast to the whole room, and the assigned
    /// player id is returned.
    pub async fn join_room(
        &self,
        code: &str,
        sender: PlayerSender,
    ) -> Result<PlayerId, RoomError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .rooms
            .get(code)
            .map(Arc::clone)
            .ok_or(RoomError::RoomNotFound)?;
        let mut guard = entry.lock().await;

        if guard.room.state != RoomState::Lobby {
            return Err(RoomError::GameAlreadyStarted);
        }
        if guard.room.is_full() {
            return Err(RoomError::RoomFull);
        }

        let player_id = inner.alloc_player_id();
        let name = format!("Player {}", guard.room.players.len() + 1);
        let spawn = {
            let mut rng = rand::rng();
            GridCell::new(
                rng.random_range(0..self.grid_size),
                rng.random_range(0..self.grid_size),
            )
        };
        guard.room.players.push(Player::new(player_id, name, spawn));
        guard.connections.insert(player_id, sender);
        inner.memberships.insert(player_id, code.to_string());
        drop(inner);

        tracing::info!(
            player_id,
            room = %code,
            players = guard.room.players.len(),
            "Player joined"
        );
        guard.broadcast_roster();
        Ok(player_id)
    }

    /// Remove a connection from whatever room it belongs to. Idempotent:
    /// a connection that never joined (or already left) is a no-op. Empty
    /// rooms are destroyed immediately; otherwise the remaining members
    /// get the updated roster.
    pub async fn leave(&self, player_id: PlayerId) {
        let mut inner = self.inner.write().await;
        let Some(code) = inner.memberships.remove(&player_id) else {
            return;
        };
        let Some(entry) = inner.rooms.get(&code).map(Arc::clone) else {
            return;
        };
        let mut guard = entry.lock().await;

        guard.room.remove_player(player_id);
        guard.connections.remove(&player_id);

        if guard.room.players.is_empty() {
            inner.rooms.remove(&code);
            tracing::info!(room = %code, "Room destroyed (empty)");
            return;
        }
        drop(inner);

        tracing::info!(player_id, room = %code, "Player left");
        guard.broadcast_roster();
    }

    /// Transition a lobby to an active round. Only the owner may start,
    /// and only with at least two players present.
    pub async fn start_game(&self, code: &str, player_id: PlayerId) -> Result<(), RoomError> {
        let entry = self.entry(code).await.ok_or(RoomError::RoomNotFound)?;
        let mut guard = entry.lock().await;

        if guard.room.owner != player_id {
            return Err(RoomError::NotOwner);
        }
        if !guard.room.state.can_transition_to(RoomState::Active) {
            return Err(RoomError::GameAlreadyStarted);
        }
        if guard.room.players.len() <= 1 {
            return Err(RoomError::InsufficientPlayers);
        }

        guard.room.state = RoomState::Active;
        tracing::info!(player_id, room = %code, "Game started");

        let msg = ServerMessage::GameStarted(GameStartedMsg {
            room_code: code.to_string(),
        });
        if let Ok(data) = encode_server_message(&msg) {
            guard.broadcast(&data);
        }
        Ok(())
    }

    /// Record a client-reported position update and relay it to the other
    /// members. Silently dropped unless the room is Active and the sender
    /// is a member: clients keep reporting briefly after a round resolves
    /// or after they have been removed, and that is not an error.
    pub async fn report_move(
        &self,
        code: &str,
        player_id: PlayerId,
        cells: Vec<GridCell>,
        score: u32,
    ) {
        let Some(entry) = self.entry(code).await else {
            tracing::debug!(player_id, room = %code, "Move for unknown room, ignoring");
            return;
        };
        let mut guard = entry.lock().await;

        if guard.room.state != RoomState::Active {
            tracing::debug!(player_id, room = %code, "Move outside active round, ignoring");
            return;
        }
        let Some(player) = guard.room.player_mut(player_id) else {
            tracing::debug!(player_id, room = %code, "Move from non-member, ignoring");
            return;
        };

        player.cells = cells.clone();
        player.score = score;
        let name = player.display_name.clone();

        let msg = ServerMessage::PlayerMoved(PlayerMovedMsg {
            player_id,
            name,
            cells,
            score,
        });
        if let Ok(data) = encode_server_message(&msg) {
            guard.broadcast_except(player_id, &data);
        }
    }

    /// Record a client-reported elimination, relay it to everyone, and
    /// adjudicate the last-player-standing condition.
    pub async fn report_death(&self, code: &str, player_id: PlayerId) {
        let Some(entry) = self.entry(code).await else {
            tracing::debug!(player_id, room = %code, "Death for unknown room, ignoring");
            return;
        };
        let mut guard = entry.lock().await;

        let Some(player) = guard.room.player_mut(player_id) else {
            tracing::debug!(player_id, room = %code, "Death from non-member, ignoring");
            return;
        };
        player.alive = false;
        let name = player.display_name.clone();

        let msg = ServerMessage::PlayerDead(PlayerDeadMsg { player_id, name });
        if let Ok(data) = encode_server_message(&msg) {
            guard.broadcast(&data);
        }

        // Last player standing: exactly one survivor wins and the room
        // resets for another round. Zero survivors (a member died after
        // everyone else left mid-round) declares no winner and performs
        // no reset.
        let survivors: Vec<(PlayerId, String)> = guard
            .room
            .players
            .iter()
            .filter(|p| p.alive)
            .map(|p| (p.id, p.display_name.clone()))
            .collect();
        if let [(winner_id, winner_name)] = survivors.as_slice() {
            tracing::info!(
                winner_id = *winner_id, room = %code, winner = %winner_name,
                "Round over, last player standing"
            );
            let msg = ServerMessage::GameOver(GameOverMsg {
                winner_id: *winner_id,
                winner_name: winner_name.clone(),
            });
            if let Ok(data) = encode_server_message(&msg) {
                guard.broadcast(&data);
            }
            if guard.room.state.can_transition_to(RoomState::Ended) {
                guard.room.state = RoomState::Ended;
            }
            guard.room.reset_round();
        }
    }

    /// Number of active rooms and total players across them.
    pub async fn stats(&self) -> (usize, usize) {
        let inner = self.inner.read().await;
        let entries: Vec<SharedEntry> = inner.rooms.values().map(Arc::clone).collect();
        drop(inner);

        let mut players = 0;
        for entry in &entries {
            players += entry.lock().await.room.players.len();
        }
        (entries.len(), players)
    }

    async fn entry(&self, code: &str) -> Option<SharedEntry> {
        self.inner.read().await.rooms.get(code).map(Arc::clone)
    }
}
