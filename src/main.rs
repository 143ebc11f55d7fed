//! CLI for Globe Presence
//!
//! Subcommands:
//! - `server`: run the presence WebSocket server
//! - `watch`: connect as a visitor and log the room as it changes

use clap::Parser;
use futures_util::StreamExt;
use globe_presence::client::GlobeMirror;
use globe_presence::config::{geo_settings_or_default, load_config};
use globe_presence::geo::Position;
use globe_presence::presence::RoomRegistry;
use globe_presence::transport::{ServerMessage, start_websocket_server};
use globe_presence::utils::error::ServerError;
use globe_presence::utils::logging;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tracing::{error, info};
use url::Url;

#[derive(Parser)]
#[command(name = "globe-presence")]
enum Command {
    /// Start the presence server
    Server {
        /// Configuration file (default: config/default.*, if present)
        #[arg(long)]
        config: Option<String>,
    },
    /// Connect as a visitor and log arrivals and departures
    Watch {
        /// WebSocket URL of the room to join
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        /// Latitude to present through the location headers
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Longitude to present through the location headers
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cmd = Command::parse();

    match cmd {
        Command::Server { config } => {
            if let Err(e) = run_server(config.as_deref()).await {
                logging::init("error");
                error!("Server failed: {}", e);
            }
        }
        Command::Watch { url, lat, lng } => {
            logging::init("info");
            let location = lat.zip(lng).map(|(lat, lng)| Position::new(lat, lng));
            if let Err(e) = run_watch(&url, location).await {
                error!("Watch failed: {}", e);
            }
        }
    }
}

async fn run_server(config_path: Option<&str>) -> Result<(), ServerError> {
    let settings = load_config(config_path)?;
    logging::init(&settings.server.log_level);

    let registry = RoomRegistry::new(settings.rooms.max_rooms);

    tokio::select! {
        res = start_websocket_server(settings, registry) => {
            res?;
            error!("Presence server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_watch(url: &str, location: Option<Position>) -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(url)?;
    let mut request = url.as_str().into_client_request()?;

    if let Some(position) = location {
        let geo = geo_settings_or_default(None);
        let headers = request.headers_mut();
        headers.insert(
            HeaderName::from_bytes(geo.latitude_header.as_bytes())?,
            HeaderValue::from_str(&position.lat.to_string())?,
        );
        headers.insert(
            HeaderName::from_bytes(geo.longitude_header.as_bytes())?,
            HeaderValue::from_str(&position.lng.to_string())?,
        );
    }

    let (mut ws_stream, _response) = connect_async(request).await?;
    info!("Connected to {url}");

    let mut mirror = GlobeMirror::new();

    loop {
        tokio::select! {
            frame = ws_stream.next() => {
                let Some(frame) = frame else { break };
                match frame? {
                    WsMessage::Text(text) => {
                        let message: ServerMessage = serde_json::from_str(text.as_str())?;
                        let subject = message.subject().to_string();
                        if mirror.apply(message) {
                            match mirror.get(&subject) {
                                Some(marker) => info!(id = %subject, lat = marker.lat, lng = marker.lng, "visitor here"),
                                None => info!(id = %subject, "visitor gone"),
                            }
                            info!("{} visitor(s) online", mirror.len() + 1);
                        }
                    }
                    WsMessage::Close(_) => break,
                    _ => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                ws_stream.close(None).await?;
                break;
            }
        }
    }

    info!("Disconnected from {url}");
    Ok(())
}
