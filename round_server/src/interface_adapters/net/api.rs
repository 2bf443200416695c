use crate::domain::{PersistError, SourceError};
use crate::interface_adapters::http::error_response;
use crate::interface_adapters::protocol::{
    CreateRoomRequest, CreateRoomResponse, KeywordDto, MistakeRequest, ScoreQueryParams,
    ScoreResponse,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::room_code;
use crate::use_cases::RoomError;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{info, warn};

pub async fn create_room_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRoomRequest>,
) -> impl IntoResponse {
    let requested = payload
        .room_code
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty());
    let code = requested.unwrap_or_else(room_code);
    let start_time = state.clock.now_epoch_millis();

    match state.rooms.create_room(code, start_time).await {
        Ok(room) => (
            StatusCode::CREATED,
            Json(CreateRoomResponse {
                room_code: room.room_code.to_string(),
                start_time: room.start_time,
                duration_secs: state.rooms.round_duration().as_secs(),
            }),
        )
            .into_response(),
        Err(RoomError::AlreadyExists) => {
            error_response(StatusCode::CONFLICT, "room already exists").into_response()
        }
        Err(RoomError::InvalidCode) => {
            error_response(StatusCode::BAD_REQUEST, "invalid room code").into_response()
        }
    }
}

pub async fn room_info_handler(
    State(state): State<Arc<AppState>>,
    Path(room_code): Path<String>,
) -> impl IntoResponse {
    match state.rooms.get_room(&room_code).await {
        Some(room) => Json(CreateRoomResponse {
            room_code: room.room_code.to_string(),
            start_time: room.start_time,
            duration_secs: state.rooms.round_duration().as_secs(),
        })
        .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "room not found").into_response(),
    }
}

pub async fn random_keyword_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.keywords.next_keyword().await {
        Ok(pair) => Json(KeywordDto {
            keyword: pair.keyword,
            hint: pair.hint,
        })
        .into_response(),
        Err(SourceError::Exhausted) => {
            error_response(StatusCode::NOT_FOUND, "no keyword available").into_response()
        }
        Err(e) => {
            warn!(error = %e, "keyword source failed");
            error_response(StatusCode::SERVICE_UNAVAILABLE, "keyword source unavailable")
                .into_response()
        }
    }
}

pub async fn room_score_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScoreQueryParams>,
) -> impl IntoResponse {
    // Unknown rooms report zero so late joiners still render a score.
    let score = state
        .rooms
        .room_points(query.room_code.trim())
        .await
        .unwrap_or(0);
    Json(ScoreResponse { score })
}

pub async fn record_outcome_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MistakeRequest>,
) -> impl IntoResponse {
    let room_code = payload.room_code.trim();
    let keyword = payload.keyword.trim();
    if room_code.is_empty() || keyword.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "roomCode and keyword are required")
            .into_response();
    }

    match state
        .outcomes
        .record(room_code, keyword, payload.result.into())
        .await
    {
        Ok(()) => {
            info!(room_code, keyword, result = ?payload.result, "outcome recorded");
            StatusCode::CREATED.into_response()
        }
        Err(PersistError::Rejected(reason)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, reason).into_response()
        }
        Err(e) => {
            warn!(error = %e, "outcome store failed");
            error_response(StatusCode::SERVICE_UNAVAILABLE, "outcome store unavailable")
                .into_response()
        }
    }
}
