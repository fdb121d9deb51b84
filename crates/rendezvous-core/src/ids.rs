//! Peer and room identifiers.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::JoinError;

/// Opaque identity of one connected endpoint.
///
/// Minted by the transport for the lifetime of a connection. The coordinator
/// only relies on equality and hashing.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Generate a fresh, time-ordered identity (`peer_<uuid v7>`).
    pub fn new() -> Self {
        Self(format!("peer_{}", Uuid::now_v7()))
    }

    /// Wrap an identity issued elsewhere.
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token is empty (never routable).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PeerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Caller-chosen room identifier. Always non-empty.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Validate a raw room identifier.
    pub fn parse(raw: &str) -> Result<Self, JoinError> {
        if raw.is_empty() {
            return Err(JoinError::InvalidRoomId);
        }
        Ok(Self(raw.to_owned()))
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RoomId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_id_has_prefix() {
        let id = PeerId::new();
        assert!(id.as_str().starts_with("peer_"), "got: {id}");
    }

    #[test]
    fn peer_ids_are_unique() {
        let a = PeerId::new();
        let b = PeerId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn peer_id_serializes_as_plain_string() {
        let id = PeerId::from_raw("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""abc""#);
        let back: PeerId = serde_json::from_str(r#""abc""#).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn empty_peer_id_is_detected() {
        assert!(PeerId::from_raw("").is_empty());
        assert!(!PeerId::new().is_empty());
    }

    #[test]
    fn room_id_rejects_empty() {
        assert_eq!(RoomId::parse(""), Err(JoinError::InvalidRoomId));
    }

    #[test]
    fn room_id_accepts_any_non_empty_string() {
        let id = RoomId::parse("x").unwrap();
        assert_eq!(id.as_str(), "x");
        let spaced = RoomId::parse(" ").unwrap();
        assert_eq!(spaced.to_string(), " ");
    }

    #[test]
    fn room_id_borrows_as_str_for_lookups() {
        let mut map = std::collections::HashMap::new();
        let _ = map.insert(RoomId::parse("lobby").unwrap(), 1);
        assert_eq!(map.get("lobby"), Some(&1));
    }
}
