//! Inbound frame dispatch: parses a text frame and forwards it to the
//! coordinator task.

use rendezvous_core::protocol::{JOIN_ROOM, SIGNAL};
use rendezvous_core::{PeerId, SignalRequest};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use super::frames::{DISCONNECT, InboundFrame};
use crate::hub::{HubClosed, HubHandle};

/// Why an inbound frame was not applied.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Not a JSON `{event, data, ackId?}` envelope.
    #[error("invalid frame: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Envelope named an event this server does not handle.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// The coordinator task is gone.
    #[error(transparent)]
    HubClosed(#[from] HubClosed),
}

/// What the session loop should do after a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameAction {
    /// Keep reading.
    Continue,
    /// The peer asked to end the connection.
    Close,
}

/// Handle one inbound text frame from `peer`.
#[instrument(skip_all, fields(peer_id = %peer, event))]
pub async fn handle_frame(
    text: &str,
    peer: &PeerId,
    hub: &HubHandle,
) -> Result<FrameAction, FrameError> {
    let frame: InboundFrame = serde_json::from_str(text)?;
    let _ = tracing::Span::current().record("event", frame.event.as_str());
    debug!(ack_id = ?frame.ack_id, "dispatching frame");

    match frame.event.as_str() {
        JOIN_ROOM => {
            let room_id = room_id_from(&frame.data);
            hub.join_room(peer.clone(), room_id, frame.ack_id).await?;
        }
        SIGNAL => {
            hub.signal(peer.clone(), signal_request_from(frame.data))
                .await?;
        }
        DISCONNECT => return Ok(FrameAction::Close),
        _ => return Err(FrameError::UnknownEvent(frame.event)),
    }
    Ok(FrameAction::Continue)
}

/// Room id from a `joinRoom` payload: either `{"roomId": ..}` or a bare
/// value. Strings are taken as-is and numbers by their decimal text.
/// Anything else yields an empty id, which the coordinator rejects.
fn room_id_from(data: &Value) -> String {
    match data {
        Value::Object(map) => map.get("roomId").map(scalar_id).unwrap_or_default(),
        other => scalar_id(other),
    }
}

fn scalar_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

// Malformed payloads become an empty request, which the coordinator drops.
fn signal_request_from(data: Value) -> SignalRequest {
    serde_json::from_value(data).unwrap_or_default()
}
