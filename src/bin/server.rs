use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use pacman_germs::audio::{AudioBridge, TracingSink};
use pacman_germs::constants::MAX_LEVEL;
use pacman_germs::engine::{GameSession, SessionConfig};
use pacman_germs::profile_store::ProfileStore;
use pacman_germs::runner::SessionRunner;
use pacman_germs::server_protocol::{parse_client_message, ParsedClientMessage};
use pacman_germs::server_utils::{
    normalize_level, normalize_lives, normalize_maze_kind, normalize_seed, sanitize_name,
    sanitize_player_id,
};
use pacman_germs::types::{Direction, Snapshot};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedProfiles = Arc<Mutex<ProfileStore>>;

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

/// Everything one websocket owns. Sessions are never shared between sockets.
struct Connection {
    client_id: String,
    tx: mpsc::Sender<OutboundMessage>,
    profiles: SharedProfiles,
    player_id: Option<String>,
    runner: Option<SessionRunner>,
    forwarder: Option<JoinHandle<()>>,
}

impl Connection {
    /// Control replies must arrive; a full queue closes the socket.
    fn send(&self, payload: &Value) {
        let text = payload.to_string();
        if self.tx.try_send(OutboundMessage::Text(text)).is_ok() {
            return;
        }
        warn!(client_id = %self.client_id, "outbound_queue_full");
        let _ = self.tx.try_send(OutboundMessage::Close {
            code: 1013,
            reason: "outbound queue full".to_string(),
        });
    }

    fn send_error(&self, message: &str) {
        self.send(&json!({ "type": "error", "message": message }));
    }

    fn stop_session(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
        if let Some(mut runner) = self.runner.take() {
            runner.teardown();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let profile_path = std::env::var("PROFILE_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".data/profiles.json"));
    info!(path = %profile_path.display(), "profile_store_opened");
    let profiles: SharedProfiles = Arc::new(Mutex::new(ProfileStore::new(profile_path)));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(profiles);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.display(), "static_root_resolved");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        warn!("static_root_missing");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(port, "server_listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [
        PathBuf::from("dist/client"),
        PathBuf::from("../../dist/client"),
    ];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(profiles): State<SharedProfiles>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(profiles, socket))
}

async fn handle_socket(profiles: SharedProfiles, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);
    info!(client_id = %client_id, "client_connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    let mut connection = Connection {
        client_id: client_id.clone(),
        tx,
        profiles,
        player_id: None,
        runner: None,
        forwarder: None,
    };

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(&mut connection, raw.as_str()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = std::str::from_utf8(&raw) {
                    handle_client_message(&mut connection, text).await;
                } else {
                    connection.send_error("invalid utf8 message");
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    connection.stop_session();
    info!(client_id = %client_id, "client_disconnected");
    drop(connection);
    let _ = writer.await;
}

async fn handle_client_message(connection: &mut Connection, raw: &str) {
    let Some(message) = parse_client_message(raw) else {
        connection.send_error("invalid message");
        return;
    };

    match message {
        ParsedClientMessage::Hello {
            name,
            player_id,
            character,
        } => handle_hello(connection, name, player_id, character).await,
        ParsedClientMessage::Start {
            level,
            seed,
            maze,
            lives,
        } => handle_start(connection, level, seed, maze, lives).await,
        ParsedClientMessage::Input { dir } => handle_input(connection, dir).await,
        ParsedClientMessage::Pause => {
            let Some(runner) = connection.runner.as_mut() else {
                connection.send_error("no session");
                return;
            };
            if let Err(error) = runner.pause().await {
                connection.send_error(&error.to_string());
            }
        }
        ParsedClientMessage::Resume => {
            let Some(runner) = connection.runner.as_mut() else {
                connection.send_error("no session");
                return;
            };
            if let Err(error) = runner.resume().await {
                connection.send_error(&error.to_string());
            }
        }
    }
}

async fn handle_hello(
    connection: &mut Connection,
    name: String,
    requested_id: Option<String>,
    character: Option<String>,
) {
    let player_id = requested_id
        .as_deref()
        .and_then(sanitize_player_id)
        .unwrap_or_else(|| format!("player_{}", make_token(12)));
    let name = sanitize_name(&name);

    let profile = {
        let mut store = connection.profiles.lock().await;
        let profile = match store.create_or_fetch(&player_id, &name) {
            Ok(profile) => profile,
            Err(error) => {
                drop(store);
                connection.send_error(&error.to_string());
                return;
            }
        };
        match character {
            Some(character) => match store.add_character(&player_id, &character) {
                Ok(_) => store.get(&player_id).cloned().unwrap_or(profile),
                Err(error) => {
                    drop(store);
                    connection.send_error(&error.to_string());
                    return;
                }
            },
            None => profile,
        }
    };

    info!(client_id = %connection.client_id, player_id = %player_id, "player_hello");
    connection.player_id = Some(player_id.clone());
    connection.send(&json!({
        "type": "welcome",
        "playerId": player_id,
        "profile": profile,
    }));
}

async fn handle_start(
    connection: &mut Connection,
    level: Option<i64>,
    seed: Option<i64>,
    maze: Option<String>,
    lives: Option<i64>,
) {
    let Some(player_id) = connection.player_id.clone() else {
        connection.send_error("send hello first");
        return;
    };
    let Some(maze_kind) = normalize_maze_kind(maze.as_deref()) else {
        connection.send_error("unknown maze kind");
        return;
    };

    let config = SessionConfig {
        start_level: normalize_level(level, MAX_LEVEL),
        seed: normalize_seed(seed).unwrap_or_else(rand::random::<u32>),
        maze_kind,
        starting_lives: normalize_lives(lives),
        ..SessionConfig::default()
    };
    let seed = config.seed;
    let mut session = match GameSession::new(config) {
        Ok(session) => session,
        Err(error) => {
            warn!(%error, seed, "session_create_failed");
            connection.send_error(&error.to_string());
            return;
        }
    };
    session.subscribe(Box::new(AudioBridge::new(TracingSink)));
    let world = session.get_world_init();

    connection.stop_session();
    let mut runner = SessionRunner::new(session);
    let snapshots = runner.subscribe();
    connection.forwarder = Some(spawn_forwarder(
        snapshots,
        runner.session(),
        connection.tx.clone(),
        connection.profiles.clone(),
        player_id.clone(),
    ));

    connection.send(&json!({ "type": "world_init", "world": world }));
    if let Err(error) = runner.start().await {
        connection.send_error(&error.to_string());
        return;
    }
    info!(player_id = %player_id, seed, ?maze_kind, "session_started");
    connection.runner = Some(runner);
}

async fn handle_input(connection: &mut Connection, dir: Direction) {
    let Some(runner) = connection.runner.as_ref() else {
        connection.send_error("no session");
        return;
    };
    if !runner.set_direction(dir).await {
        debug!(client_id = %connection.client_id, ?dir, "input_ignored");
    }
}

/// Streams snapshots to the socket and persists the summary once the
/// session reaches a terminal state.
fn spawn_forwarder(
    mut snapshots: watch::Receiver<Option<Snapshot>>,
    session: Arc<Mutex<GameSession>>,
    tx: mpsc::Sender<OutboundMessage>,
    profiles: SharedProfiles,
    player_id: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let Some(snapshot) = snapshots.borrow_and_update().clone() else {
                continue;
            };
            let ended = snapshot.state.is_terminal();
            let snapshot_tick = snapshot.tick;
            let payload = json!({ "type": "state", "snapshot": snapshot }).to_string();
            // Frames are disposable; a full queue just skips one.
            if tx.try_send(OutboundMessage::Text(payload)).is_err() {
                debug!(player_id = %player_id, tick = snapshot_tick, "state_frame_dropped");
            }
            if !ended {
                continue;
            }

            let summary = session.lock().await.build_summary();
            let profile = match profiles.lock().await.record_session(&player_id, &summary) {
                Ok(profile) => Some(profile),
                Err(error) => {
                    warn!(%error, player_id = %player_id, "record_session_failed");
                    None
                }
            };
            info!(
                player_id = %player_id,
                state = ?summary.state,
                score = summary.score,
                level = summary.level_reached,
                "session_recorded"
            );
            let payload = json!({
                "type": "game_over",
                "summary": summary,
                "profile": profile,
            })
            .to_string();
            let _ = tx.send(OutboundMessage::Text(payload)).await;
            break;
        }
    })
}

fn make_id(prefix: &str) -> String {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{id}")
}

fn make_token(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
