//! Game simulation modules

pub mod physics;
pub mod session;
pub mod slot;
pub mod vector;

pub use physics::{Ball, FieldGeometry};
pub use session::{GameOverCallback, MatchSession, SessionError, SessionSettings, SessionState};
pub use slot::{Outbound, PlayerSlot};
pub use vector::Vector2;

/// Paddle side within a session
pub type SlotIndex = usize;

pub const LEFT: SlotIndex = 0;
pub const RIGHT: SlotIndex = 1;

/// The other side of the field
pub fn opponent(index: SlotIndex) -> SlotIndex {
    if index == LEFT {
        RIGHT
    } else {
        LEFT
    }
}
