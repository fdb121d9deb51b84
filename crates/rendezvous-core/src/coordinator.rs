//! `SessionCoordinator`: pairs peers into two-party rooms.
//!
//! Owns two tables that are always updated together:
//!
//! - the room table, `RoomId → members` (at most [`ROOM_CAPACITY`], never empty)
//! - the membership index, `PeerId → RoomId` (inverse of the room table)
//!
//! Operations never perform I/O. Anything that must reach another peer is
//! returned as a [`Delivery`] for the transport to send, in order.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::errors::JoinError;
use crate::ids::{PeerId, RoomId};
use crate::protocol::{Delivery, JoinAck, Notification, RelayedSignal, SignalRequest};

/// Maximum number of peers in one room.
pub const ROOM_CAPACITY: usize = 2;

/// Successful join.
#[derive(Clone, Debug, PartialEq)]
pub struct Joined {
    /// Room the peer is now a member of.
    pub room_id: RoomId,
    /// The room-mate, if one was already present.
    pub other_peer: Option<PeerId>,
    /// Notifications to send before acknowledging the joiner.
    pub deliveries: Vec<Delivery>,
}

impl Joined {
    /// Acknowledgment for the joiner.
    pub fn ack(&self) -> JoinAck {
        JoinAck::Joined {
            other_peer: self.other_peer.clone(),
        }
    }
}

/// Table sizes, for health and metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    /// Rooms with at least one member.
    pub rooms: usize,
    /// Peers currently in a room.
    pub joined_peers: usize,
}

/// Room table plus membership index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionCoordinator {
    rooms: HashMap<RoomId, Vec<PeerId>>,
    memberships: HashMap<PeerId, RoomId>,
}

impl SessionCoordinator {
    /// Create an empty coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection. Nothing is stored until the peer joins.
    pub fn connect(&self, peer: &PeerId) {
        info!(peer_id = %peer, "peer connected");
    }

    /// Forget a peer. Untracked peers are a no-op.
    ///
    /// Returns the `userLeft` notification for the remaining room-mate, if any.
    pub fn disconnect(&mut self, peer: &PeerId) -> Option<Delivery> {
        info!(peer_id = %peer, "peer disconnected");
        self.depart(peer)
    }

    /// Join `peer` to `room_id`, creating the room if needed.
    ///
    /// A peer already in another room leaves it first (its room-mate is told
    /// with `userLeft`). Joining the room the peer is already in keeps the
    /// tables as they are and re-announces the peer to its room-mate.
    pub fn join(&mut self, peer: &PeerId, room_id: &str) -> Result<Joined, JoinError> {
        let room_id = RoomId::parse(room_id).inspect_err(|_| {
            debug!(peer_id = %peer, "join refused: empty room id");
        })?;

        if let Some(members) = self.rooms.get(&room_id) {
            if members.len() >= ROOM_CAPACITY && !members.contains(peer) {
                info!(peer_id = %peer, room_id = %room_id, "join refused: room is full");
                return Err(JoinError::RoomFull);
            }
        }

        let mut deliveries = Vec::new();
        if self
            .memberships
            .get(peer)
            .is_some_and(|current| *current != room_id)
        {
            deliveries.extend(self.depart(peer));
        }

        let members = self.rooms.entry(room_id.clone()).or_default();
        if !members.contains(peer) {
            members.push(peer.clone());
        }
        let other_peer = members.iter().find(|m| *m != peer).cloned();
        let _ = self.memberships.insert(peer.clone(), room_id.clone());

        info!(peer_id = %peer, room_id = %room_id, "peer joined room");

        if let Some(other) = &other_peer {
            debug!(peer_id = %peer, other_peer = %other, "announcing new peer");
            deliveries.push(Delivery::new(
                other.clone(),
                Notification::UserJoined(peer.clone()),
            ));
        }

        Ok(Joined {
            room_id,
            other_peer,
            deliveries,
        })
    }

    /// Address a signal from `from` to the requested target.
    ///
    /// Requests without a target or payload are dropped. The target is not
    /// checked against room membership.
    pub fn relay(&self, from: &PeerId, request: SignalRequest) -> Option<Delivery> {
        let to = request.to.filter(|to| !to.is_empty());
        let signal = request.signal.filter(|s| !s.is_null());
        let (Some(to), Some(signal)) = (to, signal) else {
            debug!(peer_id = %from, "dropping unroutable signal");
            return None;
        };

        debug!(from = %from, to = %to, "relaying signal");
        Some(Delivery::new(
            to,
            Notification::Signal(RelayedSignal {
                from: from.clone(),
                signal,
            }),
        ))
    }

    /// Members of a room, in join order.
    pub fn members(&self, room_id: &str) -> Option<&[PeerId]> {
        self.rooms.get(room_id).map(Vec::as_slice)
    }

    /// Room a peer is currently in.
    pub fn room_of(&self, peer: &PeerId) -> Option<&RoomId> {
        self.memberships.get(peer)
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of peers currently in a room.
    pub fn joined_peer_count(&self) -> usize {
        self.memberships.len()
    }

    /// Snapshot of table sizes.
    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            rooms: self.room_count(),
            joined_peers: self.joined_peer_count(),
        }
    }

    /// Remove `peer` from the index and its room, collecting empty rooms.
    fn depart(&mut self, peer: &PeerId) -> Option<Delivery> {
        let room_id = self.memberships.remove(peer)?;
        let members = self.rooms.get_mut(&room_id)?;
        members.retain(|m| m != peer);
        let remaining = members.first().cloned();

        if members.is_empty() {
            let _ = self.rooms.remove(&room_id);
            debug!(room_id = %room_id, "room closed");
        }

        remaining.map(|other| {
            info!(peer_id = %peer, other_peer = %other, room_id = %room_id, "notifying room-mate of departure");
            Delivery::new(other, Notification::UserLeft(peer.clone()))
        })
    }
}
