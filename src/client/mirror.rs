//! Local mirror of a room's presence, rebuilt from the event stream.

use indexmap::IndexMap;

use crate::transport::message::{Marker, ServerMessage};

/// Keeps the id → marker map a renderer would draw from.
///
/// Markers are kept in the order they were first seen.
#[derive(Debug, Default, Clone)]
pub struct GlobeMirror {
    markers: IndexMap<String, Marker>,
}

impl GlobeMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event. Returns `true` when the mirror changed.
    pub fn apply(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::AddMarker { position } => {
                let previous = self.markers.insert(position.id.clone(), position.clone());
                previous.as_ref() != Some(&position)
            }
            ServerMessage::RemoveMarker { id } => self.markers.shift_remove(&id).is_some(),
        }
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    pub fn get(&self, id: &str) -> Option<&Marker> {
        self.markers.get(id)
    }

    /// Number of other visitors currently shown.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
