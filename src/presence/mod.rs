//! Presence rooms
//!
//! A [`Room`] owns the membership of one named presence group and fans
//! arrivals and departures out to its members. Each room is driven by a
//! single actor task ([`RoomHandle`]) so joins and leaves for that room are
//! applied strictly one at a time, while connection I/O runs in parallel in
//! the transport's per-connection tasks.
//!
//! [`RoomRegistry`] maps room names to running actors, creating them on
//! first use and evicting empty ones when the room limit is reached.

pub mod actor;
pub mod registry;
pub mod room;

pub use actor::{Reservation, RoomHandle};
pub use registry::RoomRegistry;
pub use room::{Room, Snapshot};
