//! Room state
//!
//! `Room` is plain synchronous state. It is owned by exactly one actor task
//! (see `actor.rs`), which is what serializes joins and leaves; nothing here
//! awaits. Fanout goes through each member's unbounded channel, so delivery
//! never blocks the room.

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::client::{Connection, ConnectionId};
use crate::transport::message::{Marker, ServerMessage};
use crate::utils::error::PresenceError;

/// Arrival records of every member present when a connection joined, in
/// join order.
pub type Snapshot = Vec<Marker>;

#[derive(Debug)]
pub struct Room {
    name: String,
    members: IndexMap<ConnectionId, Connection>,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a connection to the room.
    ///
    /// The joiner is sent the snapshot first, then every existing member is
    /// told about the arrival, then the joiner is inserted. The joiner
    /// therefore never sees itself and receives the snapshot ahead of any
    /// later event.
    pub fn join(&mut self, connection: Connection) -> Result<Snapshot, PresenceError> {
        if self.members.contains_key(&connection.id) {
            warn!(room = %self.name, id = %connection.id, "rejecting duplicate join");
            return Err(PresenceError::DuplicateMember(connection.id));
        }

        let snapshot = self.snapshot();
        for marker in &snapshot {
            let message = ServerMessage::AddMarker {
                position: marker.clone(),
            };
            if connection.send(message).is_err() {
                debug!(room = %self.name, id = %connection.id, "joiner closed before snapshot was delivered");
                break;
            }
        }

        self.broadcast(&ServerMessage::AddMarker {
            position: connection.marker(),
        });

        info!(
            room = %self.name,
            id = %connection.id,
            lat = connection.position.lat,
            lng = connection.position.lng,
            members = self.members.len() + 1,
            "visitor joined"
        );
        self.members.insert(connection.id.clone(), connection);

        Ok(snapshot)
    }

    /// Removes a connection and tells the remaining members.
    ///
    /// Returns `false` when the id is not a member; leaving twice is a no-op.
    pub fn leave(&mut self, id: &str) -> bool {
        let Some(connection) = self.members.shift_remove(id) else {
            debug!(room = %self.name, id = %id, "leave for unknown connection ignored");
            return false;
        };

        self.broadcast(&ServerMessage::RemoveMarker {
            id: connection.id.clone(),
        });

        let stayed = chrono::Utc::now() - connection.joined_at;
        info!(
            room = %self.name,
            id = %connection.id,
            stayed_secs = stayed.num_seconds(),
            members = self.members.len(),
            "visitor left"
        );
        true
    }

    /// Point-in-time copy of every member's arrival record.
    pub fn snapshot(&self) -> Snapshot {
        self.members.values().map(Connection::marker).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Best effort: a member whose channel is closed is skipped and logged.
    /// Its own connection task is responsible for the matching leave.
    fn broadcast(&self, message: &ServerMessage) {
        for (id, member) in &self.members {
            if let Err(e) = member.send(message.clone()) {
                warn!(
                    room = %self.name,
                    id = %id,
                    about = message.subject(),
                    "failed to deliver presence event: {e}"
                );
            }
        }
    }
}
