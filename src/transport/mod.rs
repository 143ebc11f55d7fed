//! The `transport` module is responsible for handling network communication
//! with visitors via WebSockets.
//!
//! It defines the wire messages pushed to clients and implements the
//! WebSocket server: the upgrade handshake picks the room and captures the
//! location headers, each connection gets a send loop fed by its room, and a
//! closed or failed socket is turned into a leave.

pub mod message;
pub mod websocket;

pub use message::{Marker, ServerMessage};
pub use websocket::{room_name_from_path, serve, start_websocket_server};

#[cfg(test)]
mod websocket_tests;
