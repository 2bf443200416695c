use crate::domain::ports::{KeywordSource, OutcomeSink, ScoreQuery};
use crate::domain::{KeywordPair, Outcome, PersistError, SourceError};
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{
    CreateRoomRequest, CreateRoomResponse, KeywordDto, MistakeRequest, ResultCode, ScoreResponse,
};
use crate::use_cases::rooms::is_valid_room_code;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum BackendClientError {
    Transport(reqwest::Error),
    Upstream {
        status: StatusCode,
        message: Option<String>,
    },
    Decode(reqwest::Error),
    InvalidRequest(String),
}

impl fmt::Display for BackendClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendClientError::Transport(err) => write!(f, "backend transport error: {err}"),
            BackendClientError::Upstream { status, message } => {
                if let Some(message) = message {
                    write!(f, "backend upstream error {status}: {message}")
                } else {
                    write!(f, "backend upstream error {status}")
                }
            }
            BackendClientError::Decode(err) => write!(f, "backend response decode error: {err}"),
            BackendClientError::InvalidRequest(err) => write!(f, "invalid backend request: {err}"),
        }
    }
}

impl std::error::Error for BackendClientError {}

// Thin reqwest client for the round server's HTTP API.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    pub base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn create_room(
        &self,
        room_code: Option<&str>,
    ) -> Result<CreateRoomResponse, BackendClientError> {
        let url = format!("{}/rooms", self.base_url);
        let res = self
            .http
            .post(url)
            .json(&CreateRoomRequest {
                room_code: room_code.map(str::to_string),
            })
            .send()
            .await
            .map_err(BackendClientError::Transport)?;
        let res = upstream_ok(res).await?;

        res.json::<CreateRoomResponse>()
            .await
            .map_err(BackendClientError::Decode)
    }

    pub async fn fetch_room(
        &self,
        room_code: &str,
    ) -> Result<CreateRoomResponse, BackendClientError> {
        if !is_valid_room_code(room_code) {
            return Err(BackendClientError::InvalidRequest(format!(
                "room code {room_code:?} is not URL-safe"
            )));
        }
        let url = format!("{}/rooms/{room_code}", self.base_url);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(BackendClientError::Transport)?;
        let res = upstream_ok(res).await?;

        res.json::<CreateRoomResponse>()
            .await
            .map_err(BackendClientError::Decode)
    }

    pub async fn fetch_keyword(&self) -> Result<KeywordPair, BackendClientError> {
        let url = format!("{}/api/random-keyword", self.base_url);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(BackendClientError::Transport)?;
        let res = upstream_ok(res).await?;

        let dto = res
            .json::<KeywordDto>()
            .await
            .map_err(BackendClientError::Decode)?;
        Ok(KeywordPair {
            keyword: dto.keyword,
            hint: dto.hint,
        })
    }

    pub async fn fetch_room_score(&self, room_code: &str) -> Result<u32, BackendClientError> {
        // Room codes are restricted to URL-safe characters, so no query encoding is needed.
        if !is_valid_room_code(room_code) {
            return Err(BackendClientError::InvalidRequest(format!(
                "room code {room_code:?} is not URL-safe"
            )));
        }
        let url = format!(
            "{}/api/gameplay-score?roomCode={room_code}",
            self.base_url
        );
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(BackendClientError::Transport)?;
        let res = upstream_ok(res).await?;

        let dto = res
            .json::<ScoreResponse>()
            .await
            .map_err(BackendClientError::Decode)?;
        Ok(dto.score)
    }

    pub async fn record_outcome(
        &self,
        room_code: &str,
        keyword: &str,
        outcome: Outcome,
    ) -> Result<(), BackendClientError> {
        let result = ResultCode::try_from(outcome)
            .map_err(|e| BackendClientError::InvalidRequest(e.to_string()))?;
        let url = format!("{}/api/gameplay-mistake", self.base_url);
        let res = self
            .http
            .post(url)
            .json(&MistakeRequest {
                room_code: room_code.to_string(),
                keyword: keyword.to_string(),
                result,
            })
            .send()
            .await
            .map_err(BackendClientError::Transport)?;
        upstream_ok(res).await?;
        Ok(())
    }
}

// Keep upstream status/message so callers can tell "nothing there" from outages.
async fn upstream_ok(res: reqwest::Response) -> Result<reqwest::Response, BackendClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let message = res
        .json::<ErrorResponse>()
        .await
        .ok()
        .map(|payload| payload.error);
    Err(BackendClientError::Upstream { status, message })
}

#[async_trait]
impl KeywordSource for BackendClient {
    async fn next_keyword(&self) -> Result<KeywordPair, SourceError> {
        match self.fetch_keyword().await {
            Ok(pair) => Ok(pair),
            Err(BackendClientError::Upstream {
                status: StatusCode::NOT_FOUND,
                ..
            }) => Err(SourceError::Exhausted),
            Err(e) => Err(SourceError::Unavailable(e.to_string())),
        }
    }
}

#[async_trait]
impl ScoreQuery for BackendClient {
    async fn room_score(&self, room: &str) -> Result<u32, SourceError> {
        self.fetch_room_score(room)
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl OutcomeSink for BackendClient {
    async fn record(
        &self,
        room: &str,
        keyword: &str,
        outcome: Outcome,
    ) -> Result<(), PersistError> {
        self.record_outcome(room, keyword, outcome)
            .await
            .map_err(|e| match e {
                BackendClientError::Upstream { status, message } if status.is_client_error() => {
                    PersistError::Rejected(message.unwrap_or_else(|| status.to_string()))
                }
                other => PersistError::Unavailable(other.to_string()),
            })
    }
}
