use crate::config::Settings;
use crate::presence::RoomRegistry;
use crate::transport::message::{Marker, ServerMessage};
use crate::transport::websocket::serve;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server(settings: Settings) -> (String, RoomRegistry) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    let registry = RoomRegistry::new(settings.rooms.max_rooms);
    tokio::spawn(serve(listener, registry.clone(), settings));
    (format!("ws://{addr}"), registry)
}

async fn connect(url: &str, location: Option<(&str, &str)>) -> Client {
    let mut request = url.into_client_request().expect("Invalid request");
    if let Some((lat, lng)) = location {
        let headers = request.headers_mut();
        headers.insert("cf-iplatitude", HeaderValue::from_str(lat).unwrap());
        headers.insert("cf-iplongitude", HeaderValue::from_str(lng).unwrap());
    }
    let (ws_stream, _) = connect_async(request)
        .await
        .expect("WebSocket handshake failed");
    ws_stream
}

async fn next_event(ws: &mut Client) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timed out waiting for an event")
            .expect("Stream ended")
            .expect("WebSocket error");
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap_or_else(|e| {
                panic!(
                    "Failed to deserialize ServerMessage from '{}': {e}",
                    text.as_str()
                )
            });
        }
    }
}

async fn assert_silent(ws: &mut Client) {
    let res = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(res.is_err(), "Expected no event, got {:?}", res);
}

/// Joins are applied after the handshake; wait until the room has caught up.
async fn wait_for_members(registry: &RoomRegistry, room: &str, count: usize) {
    for _ in 0..100 {
        if let Some(handle) = registry.get(room) {
            if handle.members().await.unwrap().len() == count {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("room '{room}' never reached {count} members");
}

#[tokio::test]
async fn test_join_snapshot_and_abnormal_disconnect() {
    let (url, registry) = start_server(Settings::default()).await;

    let mut x = connect(&url, Some(("10", "20"))).await;
    wait_for_members(&registry, "default", 1).await;

    let mut y = connect(&url, Some(("30", "40"))).await;

    let x_id = match next_event(&mut y).await {
        ServerMessage::AddMarker { position } => {
            assert_eq!((position.lat, position.lng), (10.0, 20.0));
            position.id
        }
        other => panic!("Expected add-marker, got {:?}", other),
    };

    let y_id = match next_event(&mut x).await {
        ServerMessage::AddMarker { position } => {
            assert_eq!((position.lat, position.lng), (30.0, 40.0));
            position.id
        }
        other => panic!("Expected add-marker, got {:?}", other),
    };
    assert_ne!(x_id, y_id);

    // no close handshake, the socket just goes away
    drop(x);

    assert_eq!(
        next_event(&mut y).await,
        ServerMessage::RemoveMarker { id: x_id }
    );
    wait_for_members(&registry, "default", 1).await;
    assert_silent(&mut y).await;
}

#[tokio::test]
async fn test_clean_close_removes_marker() {
    let (url, registry) = start_server(Settings::default()).await;

    let mut a = connect(&url, None).await;
    wait_for_members(&registry, "default", 1).await;
    let mut b = connect(&url, None).await;

    let a_marker = match next_event(&mut b).await {
        ServerMessage::AddMarker { position } => position,
        other => panic!("Expected add-marker, got {:?}", other),
    };
    // no location headers: fallback coordinate
    assert_eq!((a_marker.lat, a_marker.lng), (0.0, 0.0));
    let _ = next_event(&mut a).await;

    a.close(None).await.expect("Failed to close WebSocket");

    assert_eq!(
        next_event(&mut b).await,
        ServerMessage::RemoveMarker { id: a_marker.id }
    );
    wait_for_members(&registry, "default", 1).await;
}

#[tokio::test]
async fn test_client_never_sees_itself() {
    let (url, registry) = start_server(Settings::default()).await;

    let mut solo = connect(&url, Some(("1", "2"))).await;
    wait_for_members(&registry, "default", 1).await;
    assert_silent(&mut solo).await;

    let members = registry.get("default").unwrap().members().await.unwrap();
    assert_eq!(members.len(), 1);
    let own_id = members[0].id.clone();

    let mut other = connect(&url, Some(("3", "4"))).await;
    let event = next_event(&mut solo).await;
    assert_ne!(event.subject(), own_id);
    let snapshot_event = next_event(&mut other).await;
    assert_eq!(
        snapshot_event,
        ServerMessage::AddMarker {
            position: Marker {
                id: own_id,
                lat: 1.0,
                lng: 2.0
            }
        }
    );
}

#[tokio::test]
async fn test_rooms_are_selected_by_path() {
    let (url, registry) = start_server(Settings::default()).await;

    let mut north = connect(&format!("{url}/north"), None).await;
    wait_for_members(&registry, "north", 1).await;
    let _south = connect(&format!("{url}/south"), None).await;
    wait_for_members(&registry, "south", 1).await;
    assert_silent(&mut north).await;

    // the PartyKit-style path addresses the default room
    let mut first = connect(&format!("{url}/parties/globe/default"), None).await;
    wait_for_members(&registry, "default", 1).await;
    let _second = connect(&url, None).await;
    assert!(matches!(
        next_event(&mut first).await,
        ServerMessage::AddMarker { .. }
    ));

    assert_eq!(
        registry.room_names(),
        vec!["default".to_string(), "north".to_string(), "south".to_string()]
    );
}

#[tokio::test]
async fn test_invalid_room_name_is_rejected() {
    let (url, registry) = start_server(Settings::default()).await;

    match connect_async(format!("{url}/bad%20room")).await {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        other => panic!("Expected HTTP 400, got {:?}", other.map(|_| ())),
    }
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_room_limit_rejects_new_rooms() {
    let mut settings = Settings::default();
    settings.rooms.max_rooms = 1;
    let (url, registry) = start_server(settings).await;

    let _a = connect(&format!("{url}/a"), None).await;
    match connect_async(format!("{url}/b")).await {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        }
        other => panic!("Expected HTTP 503, got {:?}", other.map(|_| ())),
    }
    // the existing room still admits visitors
    let _again = connect(&format!("{url}/a"), None).await;
    wait_for_members(&registry, "a", 2).await;
}

#[tokio::test]
async fn test_room_limit_frees_up_once_rooms_empty() {
    let mut settings = Settings::default();
    settings.rooms.max_rooms = 1;
    let (url, registry) = start_server(settings).await;

    let mut a = connect(&format!("{url}/a"), None).await;
    wait_for_members(&registry, "a", 1).await;
    a.close(None).await.expect("Failed to close WebSocket");
    wait_for_members(&registry, "a", 0).await;

    let _b = connect(&format!("{url}/b"), None).await;
    wait_for_members(&registry, "b", 1).await;
    assert_eq!(registry.room_names(), vec!["b".to_string()]);
}

#[tokio::test]
async fn test_client_text_frames_are_ignored() {
    let (url, registry) = start_server(Settings::default()).await;

    let mut a = connect(&url, None).await;
    wait_for_members(&registry, "default", 1).await;
    a.send(WsMessage::Text("hello".to_string().into()))
        .await
        .expect("Failed to send text");

    let _b = connect(&url, Some(("5", "6"))).await;
    match next_event(&mut a).await {
        ServerMessage::AddMarker { position } => {
            assert_eq!((position.lat, position.lng), (5.0, 6.0));
        }
        other => panic!("Expected add-marker, got {:?}", other),
    }
    wait_for_members(&registry, "default", 2).await;
}
