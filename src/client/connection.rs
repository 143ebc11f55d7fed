use chrono::{DateTime, Utc};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::error::SendError;
use uuid::Uuid;

use crate::geo::Position;
use crate::transport::message::{Marker, ServerMessage};

pub type ConnectionId = String;

/// Represents one live visitor inside a room.
///
/// The position is resolved once when the connection is accepted and never
/// changes afterwards.
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for the connection (UUID v4).
    pub id: ConnectionId,

    pub position: Position,

    /// Channel feeding the connection's send loop.
    pub sender: UnboundedSender<ServerMessage>,

    pub joined_at: DateTime<Utc>,
}

impl Connection {
    /// Create a new connection with a freshly generated id.
    pub fn new(position: Position, sender: UnboundedSender<ServerMessage>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), position, sender)
    }

    pub fn with_id(
        id: impl Into<ConnectionId>,
        position: Position,
        sender: UnboundedSender<ServerMessage>,
    ) -> Self {
        Self {
            id: id.into(),
            position,
            sender,
            joined_at: Utc::now(),
        }
    }

    pub fn marker(&self) -> Marker {
        Marker::new(self.id.clone(), self.position)
    }

    /// Queues a message for this connection. Fails only once the send loop
    /// has gone away.
    pub fn send(&self, message: ServerMessage) -> Result<(), SendError<ServerMessage>> {
        self.sender.send(message)
    }
}
