//! Join failures.

use thiserror::Error;

/// Why a `joinRoom` request was refused.
///
/// The `Display` text is the exact `message` sent in the acknowledgment.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    /// Room identifier was empty or missing.
    #[error("Invalid room ID")]
    InvalidRoomId,
    /// Room already holds two other peers.
    #[error("Room is full")]
    RoomFull,
}

impl JoinError {
    /// Short machine label, used for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRoomId => "invalid_room_id",
            Self::RoomFull => "room_full",
        }
    }
}
