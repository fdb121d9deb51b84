//! WebSocket peer sessions, frame dispatch, and outbound routing.

pub mod connection;
pub mod frames;
pub mod handler;
pub mod registry;
pub mod session;
