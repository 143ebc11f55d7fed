use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the server, the room registry and the position resolver.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerSettings,
    pub rooms: RoomSettings,
    pub geo: GeoSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the server will bind to and the log level.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

/// Configuration settings for the room registry.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RoomSettings {
    /// Room used when a client connects to `/`.
    pub default_room: String,
    /// Upper bound on distinct rooms kept by the registry.
    pub max_rooms: usize,
}

/// Configuration settings for the position resolver.
///
/// The header names are the edge-provided visitor location hints read from
/// the WebSocket upgrade request.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GeoSettings {
    pub latitude_header: String,
    pub longitude_header: String,
    pub fallback_lat: f64,
    pub fallback_lng: f64,
    /// Decimal places kept after resolving.
    pub precision: u32,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub rooms: Option<PartialRoomSettings>,
    pub geo: Option<PartialGeoSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialRoomSettings {
    pub default_room: Option<String>,
    pub max_rooms: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialGeoSettings {
    pub latitude_header: Option<String>,
    pub longitude_header: Option<String>,
    pub fallback_lat: Option<f64>,
    pub fallback_lng: Option<f64>,
    pub precision: Option<u32>,
}

impl PartialSettings {
    /// Fills every missing value from `Settings::default()`.
    pub fn merge_with_defaults(self) -> Settings {
        let default = Settings::default();
        let server = self.server.unwrap_or_default();
        let rooms = self.rooms.unwrap_or_default();
        let geo = self.geo.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(default.server.host),
                port: server.port.unwrap_or(default.server.port),
                log_level: server.log_level.unwrap_or(default.server.log_level),
            },
            rooms: RoomSettings {
                default_room: rooms.default_room.unwrap_or(default.rooms.default_room),
                max_rooms: rooms.max_rooms.unwrap_or(default.rooms.max_rooms),
            },
            geo: GeoSettings {
                latitude_header: geo.latitude_header.unwrap_or(default.geo.latitude_header),
                longitude_header: geo.longitude_header.unwrap_or(default.geo.longitude_header),
                fallback_lat: geo.fallback_lat.unwrap_or(default.geo.fallback_lat),
                fallback_lng: geo.fallback_lng.unwrap_or(default.geo.fallback_lng),
                precision: geo.precision.unwrap_or(default.geo.precision),
            },
        }
    }
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                log_level: "info".to_string(),
            },
            rooms: RoomSettings {
                default_room: "default".to_string(),
                max_rooms: 1024,
            },
            geo: GeoSettings {
                latitude_header: "cf-iplatitude".to_string(),
                longitude_header: "cf-iplongitude".to_string(),
                fallback_lat: 0.0,
                fallback_lng: 0.0,
                precision: 2,
            },
        }
    }
}
