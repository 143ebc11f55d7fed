//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `globe_presence` application.
//!
//! It holds the crate's error types and the logging bootstrap shared by the
//! server and the `watch` client.

pub mod error;
pub mod logging;

#[cfg(test)]
mod tests;
