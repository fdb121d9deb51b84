//! Live connections indexed by peer identity, for targeted sends.

use std::collections::HashMap;
use std::sync::Arc;

use rendezvous_core::PeerId;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::connection::PeerConnection;
use super::frames::OutboundFrame;

/// Routes outbound frames to connected peers.
pub struct PeerRegistry {
    connections: RwLock<HashMap<PeerId, Arc<PeerConnection>>>,
}

impl PeerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection. Replaces any entry with the same identity.
    pub async fn add(&self, connection: Arc<PeerConnection>) {
        let mut conns = self.connections.write().await;
        let _ = conns.insert(connection.id.clone(), connection);
    }

    /// Remove a connection by identity.
    pub async fn remove(&self, peer: &PeerId) {
        let mut conns = self.connections.write().await;
        let _ = conns.remove(peer);
    }

    /// Queue a frame for one peer.
    ///
    /// Returns `false` if the peer is unknown or its queue rejected the frame.
    pub async fn send_to(&self, peer: &PeerId, frame: &OutboundFrame) -> bool {
        let conns = self.connections.read().await;
        let Some(conn) = conns.get(peer) else {
            debug!(peer_id = %peer, event = frame.event, "no such peer, dropping frame");
            return false;
        };
        let sent = conn.send_frame(frame);
        if !sent {
            warn!(peer_id = %peer, event = frame.event, "failed to queue frame for peer");
        }
        sent
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_connection(id: &str) -> (Arc<PeerConnection>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(8);
        (Arc::new(PeerConnection::new(PeerId::from_raw(id), tx)), rx)
    }

    fn frame() -> OutboundFrame {
        OutboundFrame::connected(&PeerId::from_raw("x"))
    }

    #[tokio::test]
    async fn add_and_remove() {
        let registry = PeerRegistry::new();
        let (conn, _rx) = make_connection("a");
        registry.add(conn).await;
        assert_eq!(registry.connection_count().await, 1);
        assert!(registry.send_to(&PeerId::from_raw("a"), &frame()).await);

        registry.remove(&PeerId::from_raw("a")).await;
        assert_eq!(registry.connection_count().await, 0);
        assert!(!registry.send_to(&PeerId::from_raw("a"), &frame()).await);
    }

    #[tokio::test]
    async fn remove_unknown_is_noop() {
        let registry = PeerRegistry::default();
        registry.remove(&PeerId::from_raw("ghost")).await;
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn send_to_reaches_only_target() {
        let registry = PeerRegistry::new();
        let (a, mut rx_a) = make_connection("a");
        let (b, mut rx_b) = make_connection("b");
        registry.add(a).await;
        registry.add(b).await;

        assert!(registry.send_to(&PeerId::from_raw("b"), &frame()).await);
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_to_unknown_peer_returns_false() {
        let registry = PeerRegistry::new();
        assert!(!registry.send_to(&PeerId::from_raw("ghost"), &frame()).await);
    }

    #[tokio::test]
    async fn send_to_closed_peer_returns_false() {
        let registry = PeerRegistry::new();
        let (a, rx) = make_connection("a");
        registry.add(a).await;
        drop(rx);
        assert!(!registry.send_to(&PeerId::from_raw("a"), &frame()).await);
    }

    #[tokio::test]
    async fn add_overwrites_same_id() {
        let registry = PeerRegistry::new();
        let (first, _rx1) = make_connection("a");
        let (second, mut rx2) = make_connection("a");
        registry.add(first).await;
        registry.add(second).await;
        assert_eq!(registry.connection_count().await, 1);
        assert!(registry.send_to(&PeerId::from_raw("a"), &frame()).await);
        assert!(rx2.try_recv().is_ok());
    }
}
