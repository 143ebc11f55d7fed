//! WebSocket transport
//!
//! Responsibilities:
//! - Accept TCP/WebSocket connections and pick the room from the request path
//! - Resolve the visitor's position from the upgrade request headers
//! - Create a `Connection` per socket and join it to its room
//! - Forward room events to the socket as JSON text frames
//! - Leave the room once the socket closes or fails, whichever way it ends

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_tungstenite::accept_hdr_async;
use tracing::{debug, error, info, warn};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::protocol::Message as WsMessage;

use crate::client::{Connection, ConnectionId};
use crate::config::Settings;
use crate::geo::{OriginMetadata, PositionResolver};
use crate::presence::{Reservation, RoomRegistry};
use crate::transport::message::ServerMessage;
use crate::utils::error::ServerError;

const MAX_ROOM_NAME_LEN: usize = 64;

/// Binds to the configured address and serves until the task is dropped.
pub async fn start_websocket_server(
    settings: Settings,
    registry: RoomRegistry,
) -> Result<(), ServerError> {
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Presence server listening on ws://{addr}");

    serve(listener, registry, settings).await;
    Ok(())
}

/// Accept loop over an already bound listener.
pub async fn serve(listener: TcpListener, registry: RoomRegistry, settings: Settings) {
    let settings = Arc::new(settings);

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                spawn(handle_connection(
                    stream,
                    peer,
                    registry.clone(),
                    settings.clone(),
                ));
            }
            Err(e) => {
                warn!("Failed to accept connection: {e}");
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
}

/// Room addressed by a request path.
///
/// `/` selects `default_room`; otherwise the last non-empty segment is the
/// room, so `/parties/globe/default` and `/default` are the same room.
/// Returns `None` for names outside `[A-Za-z0-9_-]{1,64}`.
pub fn room_name_from_path(path: &str, default_room: &str) -> Option<String> {
    let name = path
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(default_room);

    let valid = !name.is_empty()
        && name.len() <= MAX_ROOM_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    valid.then(|| name.to_string())
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: RoomRegistry,
    settings: Arc<Settings>,
) {
    let mut admitted: Option<(Reservation, OriginMetadata)> = None;

    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let path = request.uri().path();
        let Some(name) = room_name_from_path(path, &settings.rooms.default_room) else {
            warn!(%peer, path, "rejecting connection to invalid room");
            return Err(reject(StatusCode::BAD_REQUEST, "invalid room name"));
        };
        let reservation = registry.reserve(&name).map_err(|e| {
            warn!(%peer, room = %name, "rejecting connection: {e}");
            reject(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        })?;

        admitted = Some((
            reservation,
            OriginMetadata::from_headers(request.headers(), &settings.geo),
        ));
        Ok(response)
    };

    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, "WebSocket handshake error: {e}");
            return;
        }
    };
    let Some((reservation, origin)) = admitted else {
        return;
    };
    let room = reservation.room().clone();

    let position = PositionResolver::from_settings(&settings.geo).resolve(&origin);
    let (ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, rx) = mpsc::unbounded_channel::<ServerMessage>();
    let connection = Connection::new(position, tx);
    let client_id = connection.id.clone();

    let mut send_task = spawn(send_loop(rx, ws_sender, client_id.clone()));

    match reservation.join(connection).await {
        Ok(snapshot) => {
            debug!(%peer, room = %room.name(), id = %client_id, existing = snapshot.len(), "snapshot queued");
        }
        Err(e) => {
            error!(%peer, room = %room.name(), id = %client_id, "join failed: {e}");
            send_task.abort();
            return;
        }
    }

    loop {
        tokio::select! {
            frame = ws_receiver.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    debug!(
                        id = %client_id,
                        "Ignoring client message: {}",
                        text.as_str().chars().take(100).collect::<String>()
                    );
                }
                // Keep reading so the close reply gets flushed; the stream
                // ends right after.
                Some(Ok(WsMessage::Close(frame))) => {
                    debug!(id = %client_id, ?frame, "close frame received");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(id = %client_id, "transport error: {e}");
                    break;
                }
                None => break,
            },
            _ = &mut send_task => {
                debug!(id = %client_id, "send loop ended before the socket closed");
                break;
            }
        }
    }

    if let Err(e) = room.leave(&client_id).await {
        error!(room = %room.name(), id = %client_id, "leave failed: {e}");
    }
    send_task.abort();
    debug!(%peer, id = %client_id, "disconnected");
}

/// Forwards room events to the socket until the room drops the sender or
/// the socket stops accepting writes.
async fn send_loop<S>(mut events: UnboundedReceiver<ServerMessage>, mut sink: S, client_id: ConnectionId)
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    while let Some(event) = events.recv().await {
        let text = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize presence event: {e}");
                continue;
            }
        };
        if let Err(e) = sink.send(WsMessage::text(text)).await {
            debug!("Failed to send message to {client_id}: {e}");
            break;
        }
    }

    let _ = sink.close().await;
    debug!("Send loop closed for {client_id}");
}

fn reject(status: StatusCode, reason: impl Into<String>) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.into()));
    *response.status_mut() = status;
    response
}
