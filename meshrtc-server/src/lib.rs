pub mod room;
pub mod signaling;

pub use room::RoomRegistry;
pub use signaling::{SignalingRelay, router, ws_handler};
