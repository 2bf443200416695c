// Framework bootstrap for the round relay runtime.

use crate::domain::SystemClock;
use crate::domain::ports::{Clock, KeywordSource};
use crate::frameworks::config;
use crate::interface_adapters::net::{
    create_room_handler, random_keyword_handler, record_outcome_handler, room_info_handler,
    room_score_handler, ws_handler,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::stores::{KeywordBank, OutcomeLog};
use crate::use_cases::{RoomRegistry, RoomSettings};

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

pub(crate) fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    // try_init: a host process may already own the global subscriber.
    let installed = if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init()
    };
    if installed.is_err() {
        return;
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/rooms", post(create_room_handler))
        .route("/rooms/{room_code}", get(room_info_handler))
        .route("/api/random-keyword", get(random_keyword_handler))
        .route("/api/gameplay-score", get(room_score_handler))
        .route("/api/gameplay-mistake", post(record_outcome_handler))
        .with_state(state)
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    // build state
    let state = build_state()?;
    state
        .rooms
        .clone()
        .spawn_sweeper(state.clock.clone(), config::ROOM_SWEEP_INTERVAL);
    let app = app(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Result<Arc<AppState>> {
    let bank = match config::keywords_file() {
        Some(path) => KeywordBank::load(&path)
            .inspect_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "failed to load keyword bank");
            })
            .map_err(|e| std::io::Error::other(format!("failed to load keyword bank: {e}")))?,
        None => KeywordBank::builtin(),
    };
    tracing::debug!(keywords = bank.len(), "keyword bank ready");
    let keywords: Arc<dyn KeywordSource> = Arc::new(bank);

    // Setup Room Registry
    // This owns the relay state of every active room.
    let round_duration = config::round_duration();
    let rooms = Arc::new(RoomRegistry::new(RoomSettings {
        broadcast_capacity: config::ROOM_BROADCAST_CAPACITY,
        round_duration,
    }));
    tracing::debug!(
        round_duration_secs = round_duration.as_secs(),
        "room registry configured"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    Ok(Arc::new(AppState {
        rooms,
        keywords,
        outcomes: Arc::new(OutcomeLog::new()),
        clock,
    }))
}
