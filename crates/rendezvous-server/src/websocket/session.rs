//! Peer session lifecycle, from upgrade through disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use rendezvous_core::PeerId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::PeerConnection;
use super::frames::OutboundFrame;
use super::handler::{FrameAction, FrameError, handle_frame};
use super::registry::PeerRegistry;
use crate::hub::HubHandle;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL, WS_INVALID_FRAMES_TOTAL,
};

/// How long the writer may take to flush queued frames and the close frame.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Shared handles and limits every session needs.
#[derive(Clone)]
pub struct SessionContext {
    /// Coordinator task.
    pub hub: HubHandle,
    /// Outbound routing table.
    pub registry: Arc<PeerRegistry>,
    /// Server-wide shutdown signal.
    pub cancel: CancellationToken,
    /// Per-peer outbound queue bound.
    pub send_queue_capacity: usize,
    /// Interval between server pings.
    pub heartbeat_interval: Duration,
    /// Silence after which the peer is dropped.
    pub heartbeat_timeout: Duration,
}

/// Run a session for a freshly upgraded socket.
///
/// 1. Registers the connection and greets the peer with its identity
/// 2. Forwards inbound frames to the coordinator task
/// 3. Writes queued frames and periodic pings, dropping silent peers
/// 4. On close, unregisters, flushes queued frames with a close frame, and
///    reports the disconnect
#[instrument(skip_all, fields(peer_id = %peer))]
pub async fn run_peer_session(ws: WebSocket, peer: PeerId, ctx: SessionContext) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<String>(ctx.send_queue_capacity);
    let connection = Arc::new(PeerConnection::new(peer.clone(), send_tx));

    info!("peer connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    ctx.registry.add(connection.clone()).await;
    let _ = connection.send_frame(&OutboundFrame::connected(&peer));
    if ctx.hub.connected(peer.clone()).await.is_err() {
        warn!("coordinator unavailable");
    }

    let outbound_conn = connection.clone();
    let heartbeat_interval = ctx.heartbeat_interval;
    let heartbeat_timeout = ctx.heartbeat_timeout;
    let closing = CancellationToken::new();
    let writer_closing = closing.clone();
    let mut outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat_interval);
        // First tick fires immediately
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                () = writer_closing.cancelled() => {
                    while let Ok(text) = send_rx.try_recv() {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    break;
                }
                _ = ping_interval.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_seen_elapsed() > heartbeat_timeout
                    {
                        warn!(timeout = ?heartbeat_timeout, "peer unresponsive, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = ws_tx.close().await;
    });

    let mut writer_done = false;
    loop {
        let msg = tokio::select! {
            () = ctx.cancel.cancelled() => {
                debug!("server shutting down");
                break;
            }
            _ = &mut outbound => {
                writer_done = true;
                break;
            }
            msg = ws_rx.next() => msg,
        };
        let Some(Ok(msg)) = msg else { break };
        connection.mark_alive();

        let text = match msg {
            Message::Text(t) => t.as_str().to_owned(),
            Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s,
                Err(_) => {
                    debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                    continue;
                }
            },
            Message::Close(_) => {
                info!("peer sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        match handle_frame(&text, &peer, &ctx.hub).await {
            Ok(FrameAction::Continue) => {}
            Ok(FrameAction::Close) => {
                info!("peer requested disconnect");
                break;
            }
            Err(FrameError::HubClosed(_)) => {
                warn!("coordinator unavailable, closing");
                break;
            }
            Err(e) => {
                counter!(WS_INVALID_FRAMES_TOTAL).increment(1);
                warn!(error = %e, "ignoring frame");
            }
        }
    }

    info!(dropped = connection.drop_count(), "peer disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());

    // Nothing new can be routed to this peer once it is unregistered
    ctx.registry.remove(&peer).await;
    closing.cancel();
    if !writer_done
        && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut outbound)
            .await
            .is_err()
    {
        debug!("writer did not drain in time, aborting");
        outbound.abort();
    }
    if ctx.hub.disconnected(peer).await.is_err() {
        debug!("coordinator already stopped");
    }
}
