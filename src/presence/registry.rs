use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use crate::client::Connection;
use crate::presence::actor::{Reservation, RoomHandle};
use crate::presence::room::Snapshot;
use crate::utils::error::PresenceError;

/// Keyed store of running rooms.
///
/// Rooms are created on first use and kept while empty. Once `max_rooms`
/// is reached, creating another room first evicts every room with no
/// members and no pending joins; only if none can go is the new room
/// refused. Handles in the map are never closed: closing only happens while
/// the map lock is held, together with removal.
///
/// The map lock is only held for lookups, inserts and eviction, never
/// across an await.
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    rooms: Arc<Mutex<HashMap<String, RoomHandle>>>,
    max_rooms: usize,
}

impl RoomRegistry {
    pub fn new(max_rooms: usize) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            max_rooms,
        }
    }

    /// Returns the handle for `name`, starting its actor if needed.
    pub fn room(&self, name: &str) -> Result<RoomHandle, PresenceError> {
        let mut rooms = self.lock();
        self.get_or_create(&mut rooms, name)
    }

    /// Claims a place in `name` so the room cannot be evicted before the
    /// connection joins.
    pub fn reserve(&self, name: &str) -> Result<Reservation, PresenceError> {
        let mut rooms = self.lock();
        let handle = self.get_or_create(&mut rooms, name)?;
        Reservation::new(handle).ok_or_else(|| PresenceError::RoomClosed(name.to_string()))
    }

    /// Existing handle for `name`, without creating one.
    pub fn get(&self, name: &str) -> Option<RoomHandle> {
        self.lock().get(name).cloned()
    }

    pub async fn join(&self, name: &str, connection: Connection) -> Result<Snapshot, PresenceError> {
        self.reserve(name)?.join(connection).await
    }

    /// Leaves `name`. A room that does not exist has no members, so this
    /// is a no-op returning `Ok(false)`.
    pub async fn leave(&self, name: &str, id: &str) -> Result<bool, PresenceError> {
        match self.get(name) {
            Some(handle) => handle.leave(id).await,
            None => Ok(false),
        }
    }

    pub fn room_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn get_or_create(
        &self,
        rooms: &mut HashMap<String, RoomHandle>,
        name: &str,
    ) -> Result<RoomHandle, PresenceError> {
        if let Some(handle) = rooms.get(name) {
            return Ok(handle.clone());
        }
        if rooms.len() >= self.max_rooms {
            evict_idle(rooms);
        }
        if rooms.len() >= self.max_rooms {
            return Err(PresenceError::RoomLimitReached(self.max_rooms));
        }

        let handle = RoomHandle::spawn(name);
        rooms.insert(name.to_string(), handle.clone());
        info!(room = %name, rooms = rooms.len(), "room created");
        Ok(handle)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RoomHandle>> {
        self.rooms.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Drops every room nobody is in. Their actors stop once the last handle
/// clone goes away.
fn evict_idle(rooms: &mut HashMap<String, RoomHandle>) {
    rooms.retain(|name, handle| {
        let closed = handle.try_close();
        if closed {
            info!(room = %name, "idle room evicted");
        }
        !closed
    });
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}
