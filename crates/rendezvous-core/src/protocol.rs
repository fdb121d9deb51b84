//! Signaling wire contract: event names, acknowledgments and deliveries.
//!
//! Event names are shared with existing browser clients and must not change.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Value, json};

use crate::errors::JoinError;
use crate::ids::PeerId;

/// Inbound: request to join a room (acknowledged).
pub const JOIN_ROOM: &str = "joinRoom";
/// Inbound and outbound: opaque offer/answer/ICE payload.
pub const SIGNAL: &str = "signal";
/// Outbound: a second peer joined the recipient's room.
pub const USER_JOINED: &str = "userJoined";
/// Outbound: the recipient's room-mate left or disconnected.
pub const USER_LEFT: &str = "userLeft";

/// Result of a `joinRoom` request, as sent back to the joiner.
///
/// Serializes to `{"success": true, "otherPeerId": <id|null>}` or
/// `{"success": false, "message": <reason>}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinAck {
    /// Joined; carries the room-mate, if one was already present.
    Joined {
        /// The other member of the room.
        other_peer: Option<PeerId>,
    },
    /// Refused; no state changed.
    Rejected(JoinError),
}

impl Serialize for JoinAck {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut ack = serializer.serialize_struct("JoinAck", 2)?;
        match self {
            Self::Joined { other_peer } => {
                ack.serialize_field("success", &true)?;
                ack.serialize_field("otherPeerId", other_peer)?;
            }
            Self::Rejected(err) => {
                ack.serialize_field("success", &false)?;
                ack.serialize_field("message", &err.to_string())?;
            }
        }
        ack.end()
    }
}

/// Payload of an inbound `signal` event.
///
/// Both fields are optional on the wire; a request missing either is dropped.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SignalRequest {
    /// Target identity.
    #[serde(default)]
    pub to: Option<PeerId>,
    /// Opaque payload; JSON `null` counts as absent.
    #[serde(default)]
    pub signal: Option<Value>,
}

impl SignalRequest {
    /// Build a request addressed to `to`.
    pub fn new(to: PeerId, signal: Value) -> Self {
        Self {
            to: Some(to),
            signal: Some(signal),
        }
    }
}

/// Payload of an outbound `signal` event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RelayedSignal {
    /// Sender identity.
    pub from: PeerId,
    /// Payload, forwarded verbatim.
    pub signal: Value,
}

/// Server-initiated notification to a single peer.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// `userJoined` carrying the joiner.
    UserJoined(PeerId),
    /// `userLeft` carrying the departed peer.
    UserLeft(PeerId),
    /// `signal` carrying a relayed payload.
    Signal(RelayedSignal),
}

impl Notification {
    /// Wire event name.
    pub fn event(&self) -> &'static str {
        match self {
            Self::UserJoined(_) => USER_JOINED,
            Self::UserLeft(_) => USER_LEFT,
            Self::Signal(_) => SIGNAL,
        }
    }

    /// Wire payload.
    pub fn data(&self) -> Value {
        match self {
            Self::UserJoined(peer) | Self::UserLeft(peer) => Value::String(peer.to_string()),
            Self::Signal(relayed) => json!({
                "from": relayed.from,
                "signal": relayed.signal,
            }),
        }
    }
}

/// A notification addressed to one peer, ready for the transport to send.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    /// Recipient.
    pub to: PeerId,
    /// What to send.
    pub notification: Notification,
}

impl Delivery {
    /// Address `notification` to `to`.
    pub fn new(to: PeerId, notification: Notification) -> Self {
        Self { to, notification }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_ack_with_peer() {
        let ack = JoinAck::Joined {
            other_peer: Some(PeerId::from_raw("peer_a")),
        };
        insta::assert_json_snapshot!(ack, @r#"
        {
          "success": true,
          "otherPeerId": "peer_a"
        }
        "#);
    }

    #[test]
    fn joined_ack_alone_has_null_peer() {
        let ack = JoinAck::Joined { other_peer: None };
        insta::assert_json_snapshot!(ack, @r#"
        {
          "success": true,
          "otherPeerId": null
        }
        "#);
    }

    #[test]
    fn rejected_ack_carries_message() {
        let full = serde_json::to_value(JoinAck::Rejected(JoinError::RoomFull)).unwrap();
        assert_eq!(full, json!({"success": false, "message": "Room is full"}));
        let invalid = serde_json::to_value(JoinAck::Rejected(JoinError::InvalidRoomId)).unwrap();
        assert_eq!(invalid, json!({"success": false, "message": "Invalid room ID"}));
        assert!(invalid.get("otherPeerId").is_none());
    }

    #[test]
    fn signal_request_null_signal_is_absent() {
        let req: SignalRequest = serde_json::from_value(json!({"to": "b", "signal": null})).unwrap();
        assert_eq!(req.to, Some(PeerId::from_raw("b")));
        assert!(req.signal.is_none());
    }

    #[test]
    fn signal_request_missing_fields_default() {
        let req: SignalRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(req, SignalRequest::default());
    }

    #[test]
    fn notification_event_names() {
        let p = PeerId::from_raw("p");
        assert_eq!(Notification::UserJoined(p.clone()).event(), "userJoined");
        assert_eq!(Notification::UserLeft(p.clone()).event(), "userLeft");
        let relayed = RelayedSignal {
            from: p,
            signal: Value::Null,
        };
        assert_eq!(Notification::Signal(relayed).event(), "signal");
    }

    #[test]
    fn membership_notifications_carry_bare_identity() {
        let n = Notification::UserLeft(PeerId::from_raw("peer_x"));
        assert_eq!(n.data(), json!("peer_x"));
    }

    #[test]
    fn signal_notification_payload() {
        let n = Notification::Signal(RelayedSignal {
            from: PeerId::from_raw("a"),
            signal: json!({"sdp": "v=0", "type": "offer"}),
        });
        insta::assert_json_snapshot!(n.data(), @r#"
        {
          "from": "a",
          "signal": {
            "sdp": "v=0",
            "type": "offer"
          }
        }
        "#);
    }
}
