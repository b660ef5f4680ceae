use anyhow::Result;
use axum::{
    Router,
    extract::State,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

/// Socket path the page's reload client connects to.
pub const LIVERELOAD_PATH: &str = "/__livereload";

const RELOAD: &str = "reload";

/// Minimum gap between two reload signals.
const RELOAD_COOLDOWN: Duration = Duration::from_millis(1000);

/// Configuration for the preview server
#[derive(Debug, Clone)]
pub struct LiveServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory to serve and watch
    pub root: PathBuf,
    /// Open the page in a browser once listening
    pub open: bool,
    /// Path fragments whose changes never trigger a reload
    pub ignore: Vec<String>,
}

impl Default for LiveServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            root: PathBuf::from("./out"),
            open: false,
            ignore: vec![],
        }
    }
}

/// Static file server that tells connected pages to reload when the served
/// directory changes.
pub struct LiveServer {
    config: LiveServerConfig,
}

impl LiveServer {
    pub fn new(config: LiveServerConfig) -> Self {
        Self { config }
    }

    fn router(&self, reload_tx: broadcast::Sender<String>) -> Router {
        Router::new()
            .route(LIVERELOAD_PATH, get(websocket_handler))
            .fallback_service(ServeDir::new(&self.config.root))
            .with_state(AppState { reload_tx })
    }

    pub async fn run(self) -> Result<()> {
        if !self.config.root.exists() {
            anyhow::bail!(
                "Root directory does not exist: {}",
                self.config.root.display()
            );
        }

        let (reload_tx, _) = broadcast::channel::<String>(100);

        let watcher_reload_tx = reload_tx.clone();
        let watch_path = self.config.root.clone();
        let ignore_patterns = self.config.ignore.clone();
        tokio::spawn(async move {
            if let Err(e) = start_file_watcher(watch_path, watcher_reload_tx, ignore_patterns).await
            {
                tracing::error!("File watcher error: {e}");
            }
        });

        let app = self.router(reload_tx);
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        tracing::info!("Serving {} at http://{addr}", self.config.root.display());

        if self.config.open
            && let Err(e) = open::that(format!("http://{addr}"))
        {
            tracing::warn!("Failed to open browser: {e}");
        }

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    reload_tx: broadcast::Sender<String>,
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| websocket_connection(socket, state.reload_tx))
}

async fn websocket_connection(mut socket: WebSocket, reload_tx: broadcast::Sender<String>) {
    let mut rx = reload_tx.subscribe();

    if socket
        .send(Message::Text("connected".to_string().into()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Ok(reload_msg) => {
                        if socket.send(Message::Text(reload_msg.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            msg = socket.recv() => {
                if msg.is_none() {
                    break;
                }
            }
        }
    }
}

fn is_ignored(path: &Path, ignore_patterns: &[String]) -> bool {
    let path = path.to_string_lossy();
    ignore_patterns
        .iter()
        .any(|pattern| path.contains(pattern.as_str()))
}

/// Drops reload signals that arrive within the cooldown of the last one.
#[derive(Debug)]
struct Throttle {
    last: Option<Instant>,
}

impl Throttle {
    fn new() -> Self {
        Self { last: None }
    }

    fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) <= RELOAD_COOLDOWN => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

async fn start_file_watcher(
    watch_path: PathBuf,
    reload_tx: broadcast::Sender<String>,
    ignore_patterns: Vec<String>,
) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut debouncer = new_debouncer(
        Duration::from_millis(500),
        move |res: DebounceEventResult| {
            if let Ok(events) = res {
                for event in events {
                    if !is_ignored(&event.path, &ignore_patterns) {
                        let _ = tx.blocking_send(event.path);
                    }
                }
            }
        },
    )?;

    debouncer
        .watcher()
        .watch(&watch_path, notify::RecursiveMode::Recursive)?;

    tracing::info!("Watching {} for changes", watch_path.display());

    let mut throttle = Throttle::new();
    while let Some(path) = rx.recv().await {
        tracing::debug!("Output changed: {}", path.display());

        if throttle.ready(Instant::now()) {
            // No receivers just means no page is open
            let _ = reload_tx.send(RELOAD.to_string());
            tracing::info!("Sent reload signal");
        } else {
            tracing::debug!("Skipping reload (too soon)");
        }
    }

    Ok(())
}
