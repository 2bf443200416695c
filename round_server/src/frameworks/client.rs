// Participant bootstrap: wires a session runner to a round server over HTTP and WebSocket.

use crate::domain::ports::{ChannelAdapter, Clock};
use crate::domain::{Role, RoundClock, Session, SystemClock};
use crate::frameworks::config;
use crate::interface_adapters::clients::{BackendClient, BackendClientError, WsChannel};
use crate::interface_adapters::protocol::CreateRoomResponse;
use crate::use_cases::{SessionHandle, SessionPorts, SessionSettings, spawn_session};
use reqwest::StatusCode;
use std::io::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Which room a participant plays in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomChoice {
    // Single-player game; nothing is shared or persisted.
    Local,
    // Create a fresh room with a generated code.
    Create,
    // Join the named room, creating it if nobody has yet.
    Join(String),
}

/// Resolves the room on the server, if any.
pub async fn resolve_room(
    backend: &BackendClient,
    choice: &RoomChoice,
) -> Result<Option<CreateRoomResponse>> {
    let room = match choice {
        RoomChoice::Local => return Ok(None),
        RoomChoice::Create => backend.create_room(None).await,
        RoomChoice::Join(code) => match backend.fetch_room(code).await {
            Err(BackendClientError::Upstream {
                status: StatusCode::NOT_FOUND,
                ..
            }) => backend.create_room(Some(code)).await,
            other => other,
        },
    };
    room.map(Some)
        .map_err(|e| Error::other(format!("failed to resolve room: {e}")))
}

/// Starts a participant session against the round server at `backend_url`.
pub async fn start_session(
    backend_url: &str,
    role: Role,
    choice: &RoomChoice,
) -> Result<SessionHandle> {
    let backend = Arc::new(
        BackendClient::new(backend_url, config::backend_timeout())
            .map_err(|e| Error::other(format!("failed to initialize backend client: {e}")))?,
    );
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let Some(room) = resolve_room(&backend, choice).await? else {
        let round_clock = RoundClock::new(clock.now_epoch_millis(), config::round_duration());
        let session = Session::new(role, None, round_clock);
        let ports = SessionPorts {
            channel: None,
            keywords: backend.clone(),
            outcomes: backend,
            scores: None,
            clock,
        };
        return Ok(spawn_session(session, ports, session_settings()));
    };

    let channel: Arc<dyn ChannelAdapter> = Arc::new(
        WsChannel::connect(backend_url, &room.room_code, config::CHANNEL_INBOUND_CAPACITY)
            .await
            .map_err(|e| Error::other(format!("failed to join relay: {e}")))?,
    );
    tracing::info!(
        room_code = %room.room_code,
        start_time = room.start_time,
        ?role,
        "joined room"
    );

    let round_clock = RoundClock::new(room.start_time, Duration::from_secs(room.duration_secs));
    let session = Session::new(role, Some(room.room_code), round_clock);
    let ports = SessionPorts {
        channel: Some(channel),
        keywords: backend.clone(),
        outcomes: backend.clone(),
        scores: Some(backend),
        clock,
    };
    Ok(spawn_session(session, ports, session_settings()))
}

/// Same as [`start_session`], against `BACKEND_URL`.
pub async fn start_session_with_config(role: Role, choice: &RoomChoice) -> Result<SessionHandle> {
    super::server::init_runtime();
    start_session(&config::backend_url(), role, choice).await
}

fn session_settings() -> SessionSettings {
    SessionSettings {
        tick_interval: config::CLOCK_TICK_INTERVAL,
        action_capacity: config::SESSION_ACTION_CAPACITY,
    }
}
