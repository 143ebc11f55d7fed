//! Wire messages pushed from a room to its members.
//!
//! Frames are JSON text with a `type` tag:
//!
//! ```json
//! { "type": "add-marker", "position": { "id": "…", "lat": 10.0, "lng": 20.0 } }
//! { "type": "remove-marker", "id": "…" }
//! ```

use serde::{Deserialize, Serialize};

use crate::geo::Position;

/// Arrival record of one connection: its id and resolved position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
}

impl Marker {
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            lat: position.lat,
            lng: position.lng,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "add-marker")]
    AddMarker { position: Marker },

    #[serde(rename = "remove-marker")]
    RemoveMarker { id: String },
}

impl ServerMessage {
    /// Id of the connection this event is about.
    pub fn subject(&self) -> &str {
        match self {
            ServerMessage::AddMarker { position } => &position.id,
            ServerMessage::RemoveMarker { id } => id,
        }
    }
}
