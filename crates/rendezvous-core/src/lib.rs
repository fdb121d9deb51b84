//! # rendezvous-core
//!
//! Transport-free room coordination for two-party signaling.
//!
//! - [`ids`]: opaque peer identities and validated room identifiers
//! - [`coordinator`]: the [`SessionCoordinator`] owning the room table and
//!   membership index
//! - [`protocol`]: wire event names, acknowledgments and outbound deliveries
//! - [`errors`]: join failures reported back through the acknowledgment

#![deny(unsafe_code)]

pub mod coordinator;
pub mod errors;
pub mod ids;
pub mod protocol;

pub use coordinator::{CoordinatorStats, Joined, ROOM_CAPACITY, SessionCoordinator};
pub use errors::JoinError;
pub use ids::{PeerId, RoomId};
pub use protocol::{Delivery, JoinAck, Notification, RelayedSignal, SignalRequest};
