//! # rendezvous-server
//!
//! Axum HTTP + `WebSocket` transport for two-party signaling rooms.
//!
//! - HTTP endpoints: liveness, health check, optional Prometheus metrics
//! - `WebSocket` gateway: peer identity, heartbeat, frame dispatch
//! - A single coordinator task ([`hub`]) owns the room tables and routes
//!   notifications through the [`websocket::registry::PeerRegistry`]
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod hub;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;
