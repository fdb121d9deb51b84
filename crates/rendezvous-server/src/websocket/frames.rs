//! JSON envelope carried by every WebSocket text frame.
//!
//! Both directions use `{"event": <name>, "data": <payload>, "ackId"?: <u64>}`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

use rendezvous_core::{JoinAck, Notification, PeerId};

/// Outbound: acknowledgment of a request that carried an `ackId`.
pub const ACK: &str = "ack";
/// Outbound: first frame on every connection, tells the peer its identity.
pub const CONNECTED: &str = "connected";
/// Inbound: client asks the server to end its connection.
pub const DISCONNECT: &str = "disconnect";

/// Frame received from a peer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundFrame {
    /// Event name (e.g. `joinRoom`).
    pub event: String,
    /// Event payload; `null` when omitted.
    #[serde(default)]
    pub data: Value,
    /// Present when the peer expects an `ack` frame back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_id: Option<u64>,
}

/// Frame sent to a peer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundFrame {
    /// Event name.
    pub event: String,
    /// Event payload.
    pub data: Value,
    /// Echoed `ackId` for acknowledgments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_id: Option<u64>,
}

impl OutboundFrame {
    /// The `connected` greeting for `peer`.
    pub fn connected(peer: &PeerId) -> Self {
        Self {
            event: CONNECTED.into(),
            data: json!({ "id": peer }),
            ack_id: None,
        }
    }

    /// Acknowledgment of a `joinRoom` request.
    pub fn ack(ack_id: u64, ack: &JoinAck) -> Self {
        let data = serde_json::to_value(ack).unwrap_or_else(|e| {
            error!(error = %e, "failed to serialize join ack");
            Value::Null
        });
        Self {
            event: ACK.into(),
            data,
            ack_id: Some(ack_id),
        }
    }

    /// Serialize for the socket.
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self)
            .inspect_err(|e| error!(event = self.event, error = %e, "failed to serialize frame"))
            .ok()
    }
}

impl From<&Notification> for OutboundFrame {
    fn from(notification: &Notification) -> Self {
        Self {
            event: notification.event().into(),
            data: notification.data(),
            ack_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rendezvous_core::{JoinError, RelayedSignal};

    #[test]
    fn inbound_with_ack_id() {
        let frame: InboundFrame =
            serde_json::from_str(r#"{"event":"joinRoom","data":{"roomId":"x"},"ackId":7}"#).unwrap();
        assert_eq!(frame.event, "joinRoom");
        assert_eq!(frame.data["roomId"], "x");
        assert_eq!(frame.ack_id, Some(7));
    }

    #[test]
    fn inbound_without_data_is_null() {
        let frame: InboundFrame = serde_json::from_str(r#"{"event":"disconnect"}"#).unwrap();
        assert!(frame.data.is_null());
        assert!(frame.ack_id.is_none());
    }

    #[test]
    fn inbound_requires_event() {
        assert!(serde_json::from_str::<InboundFrame>(r#"{"data":1}"#).is_err());
    }

    #[test]
    fn connected_frame() {
        let frame = OutboundFrame::connected(&PeerId::from_raw("peer_1"));
        insta::assert_json_snapshot!(frame, @r#"
        {
          "event": "connected",
          "data": {
            "id": "peer_1"
          }
        }
        "#);
    }

    #[test]
    fn ack_frame() {
        let ack = JoinAck::Joined {
            other_peer: Some(PeerId::from_raw("peer_a")),
        };
        let frame = OutboundFrame::ack(3, &ack);
        assert_eq!(frame.event, "ack");
        assert_eq!(frame.ack_id, Some(3));
        assert_eq!(frame.data, json!({"success": true, "otherPeerId": "peer_a"}));
    }

    #[test]
    fn rejected_ack_frame() {
        let frame = OutboundFrame::ack(1, &JoinAck::Rejected(JoinError::InvalidRoomId));
        assert_eq!(frame.data, json!({"success": false, "message": "Invalid room ID"}));
    }

    #[test]
    fn notification_frame_has_no_ack_id() {
        let frame = OutboundFrame::from(&Notification::UserJoined(PeerId::from_raw("b")));
        let json = frame.to_json().unwrap();
        assert_eq!(json, r#"{"event":"userJoined","data":"b"}"#);
    }

    #[test]
    fn signal_frame() {
        let n = Notification::Signal(RelayedSignal {
            from: PeerId::from_raw("a"),
            signal: json!({"candidate": "udp 1"}),
        });
        let frame = OutboundFrame::from(&n);
        assert_eq!(frame.event, "signal");
        assert_eq!(frame.data, json!({"from": "a", "signal": {"candidate": "udp 1"}}));
    }
}
