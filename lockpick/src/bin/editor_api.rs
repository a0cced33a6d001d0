use std::{
    env,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use engine::editor::{
    EditorManifest, EditorSnapshot, EditorTimeline, FramesRequest, SeekRequest, StepRequest,
};
use lockpick::demo::{builtin_level, demo_level};
use lockpick::editor_api::{PlaySession, PlaySessionError};
use lockpick::level_file;
use lockpick::settings::SettingsStore;

const DEFAULT_ADDR: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), 4000);

#[derive(Clone)]
struct AppState {
    session: Arc<Mutex<PlaySession>>,
}

impl AppState {
    fn new(session: PlaySession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }

    // A panicked handler can't leave the session half-stepped, so keep serving.
    fn session(&self) -> MutexGuard<'_, PlaySession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/manifest", get(manifest))
        .route("/api/agent/state", get(agent_state))
        .route("/api/agent/timeline", get(agent_timeline))
        .route("/api/agent/step", post(agent_step))
        .route("/api/agent/rewind", post(agent_rewind))
        .route("/api/agent/forward", post(agent_forward))
        .route("/api/agent/seek", post(agent_seek))
        .route("/api/agent/reset", post(agent_reset))
        .with_state(state)
        .layer(cors)
}

fn resolve_editor_api_addr<F>(mut get_env: F) -> SocketAddr
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(addr) = get_env("LOCKPICK_EDITOR_API_ADDR").and_then(|v| v.parse().ok()) {
        return addr;
    }

    if let Some(port) = get_env("LOCKPICK_EDITOR_API_PORT").and_then(|v| v.parse::<u16>().ok()) {
        return SocketAddr::from(([127, 0, 0, 1], port));
    }

    DEFAULT_ADDR
}

async fn health() -> &'static str {
    "ok"
}

async fn manifest(State(state): State<AppState>) -> Json<EditorManifest> {
    Json(state.session().manifest())
}

async fn agent_state(State(state): State<AppState>) -> Json<EditorSnapshot> {
    Json(state.session().state())
}

async fn agent_timeline(State(state): State<AppState>) -> Json<EditorTimeline> {
    Json(state.session().timeline())
}

async fn agent_step(
    State(state): State<AppState>,
    Json(payload): Json<StepRequest>,
) -> Result<Json<EditorSnapshot>, (StatusCode, String)> {
    let snapshot = state.session().step(&payload.action_id);
    match snapshot {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(err @ PlaySessionError::UnknownActionId(_)) => {
            Err((StatusCode::BAD_REQUEST, err.to_string()))
        }
    }
}

async fn agent_rewind(
    State(state): State<AppState>,
    Json(payload): Json<FramesRequest>,
) -> Json<EditorSnapshot> {
    Json(state.session().rewind(payload.frames))
}

async fn agent_forward(
    State(state): State<AppState>,
    Json(payload): Json<FramesRequest>,
) -> Json<EditorSnapshot> {
    Json(state.session().forward(payload.frames))
}

async fn agent_seek(
    State(state): State<AppState>,
    Json(payload): Json<SeekRequest>,
) -> Json<EditorSnapshot> {
    Json(state.session().seek(payload.frame))
}

async fn agent_reset(State(state): State<AppState>) -> Json<EditorSnapshot> {
    Json(state.session().reset())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = SettingsStore::from_env().load();
    let level = match env::args_os().nth(1) {
        Some(arg) => {
            let name = arg.to_string_lossy().into_owned();
            match builtin_level(&name) {
                Some(level) => level.context("building built-in level")?,
                None => {
                    let path = PathBuf::from(arg);
                    level_file::load(&path)
                        .with_context(|| format!("loading level {}", path.display()))?
                }
            }
        }
        None => demo_level().context("building demo level")?,
    };
    let session = PlaySession::new(level, settings.lock_options()).context("starting play session")?;
    let app = router(AppState::new(session));

    let addr = resolve_editor_api_addr(|k| env::var(k).ok());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding editor api to {addr}"))?;
    tracing::info!(%addr, "editor api listening");

    axum::serve(listener, app).await.context("serving editor api")?;
    Ok(())
}
