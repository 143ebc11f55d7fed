use super::error::{PresenceError, ServerError};
use super::logging;

#[test]
fn logging_init_accepts_levels() {
    // try_init makes repeated initialization a no-op
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn parse_level_maps_names_and_defaults_to_info() {
    assert_eq!(logging::parse_level("ERROR"), tracing::Level::ERROR);
    assert_eq!(logging::parse_level("warning"), tracing::Level::WARN);
    assert_eq!(logging::parse_level(" debug "), tracing::Level::DEBUG);
    assert_eq!(logging::parse_level("trace"), tracing::Level::TRACE);
    assert_eq!(logging::parse_level("loud"), tracing::Level::INFO);
}

#[test]
fn presence_error_converts_into_server_error() {
    let err: ServerError = PresenceError::RoomLimitReached(4).into();
    assert!(matches!(
        err,
        ServerError::Presence(PresenceError::RoomLimitReached(4))
    ));
    assert_eq!(err.to_string(), "room limit of 4 reached");
}
