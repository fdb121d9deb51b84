//! `/` liveness and `/health` endpoints.

use serde::Serialize;
use std::time::Instant;

use rendezvous_core::CoordinatorStats;

/// Static body of `GET /`.
pub const LIVENESS_MESSAGE: &str = "Signaling server is running";

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Current WebSocket connection count.
    pub connections: usize,
    /// Rooms with at least one member.
    pub active_rooms: usize,
    /// Peers currently in a room.
    pub joined_peers: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, connections: usize, stats: CoordinatorStats) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        active_rooms: stats.rooms,
        joined_peers: stats.joined_peers,
    }
}
