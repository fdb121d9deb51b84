//! Coordinator task.
//!
//! A single task owns the [`SessionCoordinator`] and drains a queue of
//! [`HubEvent`]s. Each event is applied and its frames are queued on the
//! recipients' connections before the next event is read, so the tables need
//! no lock and a `userJoined` is always queued ahead of the joiner's ack.

use std::sync::Arc;

use metrics::{counter, gauge};
use rendezvous_core::{
    CoordinatorStats, Delivery, JoinAck, PeerId, SessionCoordinator, SignalRequest,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::metrics::{ROOM_JOINS_TOTAL, ROOMS_ACTIVE, SIGNALS_DROPPED_TOTAL, SIGNALS_RELAYED_TOTAL};
use crate::websocket::frames::OutboundFrame;
use crate::websocket::registry::PeerRegistry;

/// Input to the coordinator task.
#[derive(Debug)]
pub enum HubEvent {
    /// A socket was upgraded and registered.
    Connected(PeerId),
    /// A socket closed.
    Disconnected(PeerId),
    /// `joinRoom` request.
    JoinRoom {
        /// Joining peer.
        peer: PeerId,
        /// Requested room; empty when missing.
        room_id: String,
        /// Where to send the acknowledgment, if requested.
        ack_id: Option<u64>,
    },
    /// `signal` relay request.
    Signal {
        /// Sender.
        from: PeerId,
        /// Target and payload.
        request: SignalRequest,
    },
    /// Table sizes query.
    Stats(oneshot::Sender<CoordinatorStats>),
}

/// The coordinator task is no longer accepting events.
#[derive(Debug, Error)]
#[error("coordinator task has stopped")]
pub struct HubClosed;

/// Cloneable sender side of the coordinator task.
#[derive(Clone, Debug)]
pub struct HubHandle {
    tx: mpsc::Sender<HubEvent>,
}

impl HubHandle {
    pub(crate) fn new(tx: mpsc::Sender<HubEvent>) -> Self {
        Self { tx }
    }

    /// Queue an event, waiting if the queue is full.
    pub async fn send(&self, event: HubEvent) -> Result<(), HubClosed> {
        self.tx.send(event).await.map_err(|_| HubClosed)
    }

    /// Report a new connection.
    pub async fn connected(&self, peer: PeerId) -> Result<(), HubClosed> {
        self.send(HubEvent::Connected(peer)).await
    }

    /// Report a closed connection.
    pub async fn disconnected(&self, peer: PeerId) -> Result<(), HubClosed> {
        self.send(HubEvent::Disconnected(peer)).await
    }

    /// Forward a `joinRoom` request.
    pub async fn join_room(
        &self,
        peer: PeerId,
        room_id: String,
        ack_id: Option<u64>,
    ) -> Result<(), HubClosed> {
        self.send(HubEvent::JoinRoom {
            peer,
            room_id,
            ack_id,
        })
        .await
    }

    /// Forward a `signal` request.
    pub async fn signal(&self, from: PeerId, request: SignalRequest) -> Result<(), HubClosed> {
        self.send(HubEvent::Signal { from, request }).await
    }

    /// Current table sizes, or `None` if the task has stopped.
    pub async fn stats(&self) -> Option<CoordinatorStats> {
        let (tx, rx) = oneshot::channel();
        self.send(HubEvent::Stats(tx)).await.ok()?;
        rx.await.ok()
    }
}

/// Owner of the coordinator tables.
pub struct Hub {
    coordinator: SessionCoordinator,
    registry: Arc<PeerRegistry>,
    rx: mpsc::Receiver<HubEvent>,
}

impl Hub {
    /// Create the task state and its handle. `capacity` bounds the event queue.
    pub fn new(registry: Arc<PeerRegistry>, capacity: usize) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(capacity);
        let hub = Self {
            coordinator: SessionCoordinator::new(),
            registry,
            rx,
        };
        (hub, HubHandle::new(tx))
    }

    /// Run on the current runtime until `cancel` fires or all handles drop.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    async fn run(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                event = self.rx.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
            }
        }
        info!(rooms = self.coordinator.room_count(), "coordinator task stopped");
    }

    async fn handle(&mut self, event: HubEvent) {
        match event {
            HubEvent::Connected(peer) => self.coordinator.connect(&peer),
            HubEvent::Disconnected(peer) => {
                let delivery = self.coordinator.disconnect(&peer);
                self.dispatch(delivery).await;
                self.record_rooms();
            }
            HubEvent::JoinRoom {
                peer,
                room_id,
                ack_id,
            } => self.join_room(&peer, &room_id, ack_id).await,
            HubEvent::Signal { from, request } => {
                match self.coordinator.relay(&from, request) {
                    Some(delivery) => {
                        counter!(SIGNALS_RELAYED_TOTAL).increment(1);
                        self.dispatch(Some(delivery)).await;
                    }
                    None => counter!(SIGNALS_DROPPED_TOTAL).increment(1),
                }
            }
            HubEvent::Stats(reply) => {
                let _ = reply.send(self.coordinator.stats());
            }
        }
    }

    async fn join_room(&mut self, peer: &PeerId, room_id: &str, ack_id: Option<u64>) {
        let ack = match self.coordinator.join(peer, room_id) {
            Ok(joined) => {
                counter!(ROOM_JOINS_TOTAL, "outcome" => "joined").increment(1);
                let ack = joined.ack();
                self.dispatch(joined.deliveries).await;
                self.record_rooms();
                ack
            }
            Err(err) => {
                counter!(ROOM_JOINS_TOTAL, "outcome" => err.kind()).increment(1);
                JoinAck::Rejected(err)
            }
        };

        match ack_id {
            Some(ack_id) => {
                let _ = self
                    .registry
                    .send_to(peer, &OutboundFrame::ack(ack_id, &ack))
                    .await;
            }
            None => debug!(peer_id = %peer, "joinRoom without ackId, not acknowledging"),
        }
    }

    async fn dispatch(&self, deliveries: impl IntoIterator<Item = Delivery>) {
        for delivery in deliveries {
            let frame = OutboundFrame::from(&delivery.notification);
            let _ = self.registry.send_to(&delivery.to, &frame).await;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_rooms(&self) {
        gauge!(ROOMS_ACTIVE).set(self.coordinator.room_count() as f64);
    }
}
