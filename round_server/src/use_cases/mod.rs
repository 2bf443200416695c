// Use cases layer: room relay orchestration and the per-participant session runner.

pub mod rooms;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use rooms::{RelayEnvelope, RoomError, RoomHandle, RoomRegistry, RoomSettings};
pub use session::{SessionHandle, SessionPorts, SessionSettings, spawn_session};
pub use types::{LocalAction, SessionView};
