pub mod grid;
pub mod net;
pub mod player;
pub mod room;
