//! # Globe Presence
//!
//! `globe_presence` is a small, in-memory visitor-presence server built with
//! Rust. Visitors connect over WebSockets to a named room; every member of
//! the room learns who else is connected and roughly where they are, and is
//! told as visitors arrive and leave.
//!
//! ## Core Modules
//!
//! - `presence`: rooms, the per-room actor that serializes joins and leaves, and the room registry.
//! - `geo`: resolves a coarse position from the edge network's location headers.
//! - `client`: the server-side `Connection` and the consumer-side `GlobeMirror`.
//! - `config`: layered configuration loading.
//! - `transport`: the wire messages and the WebSocket server.
//! - `utils`: error types and logging setup.

pub mod client;
pub mod config;
pub mod geo;
pub mod presence;
pub mod transport;
pub mod utils;
