//! Room actor
//!
//! Every room runs in its own task that owns the `Room` exclusively and
//! processes membership commands from an unbounded queue, one at a time.
//! Callers talk to it through a cloneable [`RoomHandle`] and get results
//! back over oneshot channels.
//!
//! Each handle also shares an occupancy counter: members plus joins that
//! have been reserved but not applied yet. A room whose occupancy is zero
//! can be closed, after which it refuses new reservations.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::client::{Connection, ConnectionId};
use crate::presence::room::{Room, Snapshot};
use crate::utils::error::PresenceError;

const CLOSED: usize = usize::MAX;

#[derive(Debug)]
enum Command {
    Join {
        connection: Connection,
        reply: oneshot::Sender<Result<Snapshot, PresenceError>>,
    },
    Leave {
        id: ConnectionId,
        reply: oneshot::Sender<bool>,
    },
    Members {
        reply: oneshot::Sender<Snapshot>,
    },
}

#[derive(Debug, Clone)]
pub struct RoomHandle {
    name: Arc<str>,
    commands: mpsc::UnboundedSender<Command>,
    occupancy: Arc<AtomicUsize>,
}

impl RoomHandle {
    /// Starts the actor for a new, empty room. Must be called from within a
    /// tokio runtime.
    pub fn spawn(name: impl Into<String>) -> Self {
        let name: String = name.into();
        let (commands, queue) = mpsc::unbounded_channel();
        let occupancy = Arc::new(AtomicUsize::new(0));
        tokio::spawn(run(Room::new(name.clone()), queue, occupancy.clone()));
        Self {
            name: name.into(),
            commands,
            occupancy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members plus joins in flight. A closed room reports zero.
    pub fn occupancy(&self) -> usize {
        match self.occupancy.load(Ordering::SeqCst) {
            CLOSED => 0,
            n => n,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.occupancy.load(Ordering::SeqCst) == CLOSED
    }

    /// Joins `connection` to the room and returns the snapshot of members
    /// that were already present. Fails with `RoomClosed` once the room has
    /// been evicted.
    pub async fn join(&self, connection: Connection) -> Result<Snapshot, PresenceError> {
        match Reservation::new(self.clone()) {
            Some(reservation) => reservation.join(connection).await,
            None => Err(self.closed()),
        }
    }

    /// Removes a member. `Ok(false)` means it was not a member.
    pub async fn leave(&self, id: &str) -> Result<bool, PresenceError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Leave {
            id: id.to_string(),
            reply,
        })?;
        response.await.map_err(|_| self.closed())
    }

    /// Current members in join order.
    pub async fn members(&self) -> Result<Snapshot, PresenceError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Members { reply })?;
        response.await.map_err(|_| self.closed())
    }

    /// Closes the room if nobody is in it or about to join it.
    pub(crate) fn try_close(&self) -> bool {
        self.occupancy
            .compare_exchange(0, CLOSED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn try_reserve(&self) -> bool {
        self.occupancy
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n != CLOSED).then_some(n + 1)
            })
            .is_ok()
    }

    fn release(&self) {
        self.occupancy.fetch_sub(1, Ordering::SeqCst);
    }

    async fn join_reserved(&self, connection: Connection) -> Result<Snapshot, PresenceError> {
        let (reply, response) = oneshot::channel();
        if let Err(e) = self.send(Command::Join { connection, reply }) {
            self.release();
            return Err(e);
        }
        response.await.map_err(|_| self.closed())?
    }

    fn send(&self, command: Command) -> Result<(), PresenceError> {
        self.commands.send(command).map_err(|_| self.closed())
    }

    fn closed(&self) -> PresenceError {
        PresenceError::RoomClosed(self.name.to_string())
    }
}

/// A claimed place in a room that keeps it from being evicted until the
/// join is applied. Dropping an unused reservation gives the place back.
#[derive(Debug)]
pub struct Reservation {
    handle: RoomHandle,
    used: bool,
}

impl Reservation {
    pub(crate) fn new(handle: RoomHandle) -> Option<Self> {
        handle.try_reserve().then_some(Self {
            handle,
            used: false,
        })
    }

    pub fn room(&self) -> &RoomHandle {
        &self.handle
    }

    pub async fn join(mut self, connection: Connection) -> Result<Snapshot, PresenceError> {
        self.used = true;
        self.handle.join_reserved(connection).await
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.used {
            self.handle.release();
        }
    }
}

async fn run(mut room: Room, mut queue: mpsc::UnboundedReceiver<Command>, occupancy: Arc<AtomicUsize>) {
    while let Some(command) = queue.recv().await {
        // A dropped reply receiver means the caller went away; the state
        // change itself still stands.
        match command {
            Command::Join { connection, reply } => {
                let result = room.join(connection);
                if result.is_err() {
                    occupancy.fetch_sub(1, Ordering::SeqCst);
                }
                let _ = reply.send(result);
            }
            Command::Leave { id, reply } => {
                let left = room.leave(&id);
                if left {
                    occupancy.fetch_sub(1, Ordering::SeqCst);
                }
                let _ = reply.send(left);
            }
            Command::Members { reply } => {
                let _ = reply.send(room.snapshot());
            }
        }
    }

    debug!(room = %room.name(), "room actor stopped");
}
