use serde::{Deserialize, Serialize};

/// A single cell on the play grid.
///
/// Clients report their snake as an ordered, head-first sequence of cells.
/// The server stores and relays these verbatim; it never interprets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

impl GridCell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}
