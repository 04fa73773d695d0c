use serde::{Deserialize, Serialize};

use crate::grid::GridCell;

/// Opaque identity of a live connection. Allocated sequentially by the
/// server, unique for the lifetime of the process, stable for the
/// lifetime of the connection.
pub type PlayerId = u64;

/// A player's session state within a room.
///
/// Position and score are client-reported: the server records the last
/// value it saw and relays it to peers without validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    /// Head-first grid cells, as last reported by the client.
    pub cells: Vec<GridCell>,
    pub score: u32,
    /// True until an elimination is recorded for this player.
    pub alive: bool,
}

impl Player {
    /// Create a fresh player with a single-cell starting position.
    pub fn new(id: PlayerId, display_name: String, spawn: GridCell) -> Self {
        Self {
            id,
            display_name,
            cells: vec![spawn],
            score: 0,
            alive: true,
        }
    }
}

/// The slice of player state shared in roster broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub name: String,
}

impl From<&Player> for RosterEntry {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            name: p.display_name.clone(),
        }
    }
}
