//! The `geo` module resolves a coarse position for a connecting visitor.
//!
//! Resolution is a pure function of the metadata the edge network attaches
//! to the upgrade request. It never fails: missing or malformed hints fall
//! back to a fixed coordinate.

pub mod resolver;

pub use resolver::{OriginMetadata, Position, PositionResolver};
