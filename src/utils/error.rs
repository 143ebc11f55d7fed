//! The `error` module defines the error types used within `globe_presence`.
//!
//! Presence operations report through [`PresenceError`]; the server
//! bootstrap wraps those together with I/O and configuration failures in
//! [`ServerError`].

use config::ConfigError;
use thiserror::Error;

/// Failures of room membership operations.
///
/// Geolocation problems never show up here: the position resolver always
/// falls back to a default coordinate instead of failing a connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PresenceError {
    #[error("connection '{0}' is already a member of the room")]
    DuplicateMember(String),

    #[error("room '{0}' is no longer accepting commands")]
    RoomClosed(String),

    #[error("room limit of {0} reached")]
    RoomLimitReached(usize),
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Presence(#[from] PresenceError),
}
