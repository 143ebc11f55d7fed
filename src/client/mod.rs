//! The `client` module defines both ends of a presence session.
//!
//! - [`Connection`] is the server-side record of one live visitor inside a
//!   room: its id, resolved position and the channel used to push events to it.
//! - [`GlobeMirror`] is the consumer side: the local id → marker map a
//!   visitor rebuilds from the event stream.

pub mod connection;
pub mod mirror;

pub use connection::{Connection, ConnectionId};
pub use mirror::GlobeMirror;
