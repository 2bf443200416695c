// Wire protocol DTOs and conversions for relay frames and the HTTP API.

use crate::domain::{Outcome, RoomEvent, TransportError};
use serde::{Deserialize, Serialize};

/// Two-letter result codes used on the wire and in the outcome store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultCode {
    // Correct without the hint.
    #[serde(rename = "TT")]
    CorrectNoHint,
    // Correct after the hint was opened.
    #[serde(rename = "FT")]
    CorrectWithHint,
    #[serde(rename = "FF")]
    Skipped,
}

impl From<ResultCode> for Outcome {
    fn from(code: ResultCode) -> Self {
        match code {
            ResultCode::CorrectNoHint => Outcome::CorrectNoHint,
            ResultCode::CorrectWithHint => Outcome::CorrectWithHint,
            ResultCode::Skipped => Outcome::Skipped,
        }
    }
}

impl TryFrom<Outcome> for ResultCode {
    type Error = TransportError;

    fn try_from(outcome: Outcome) -> Result<Self, Self::Error> {
        match outcome {
            Outcome::CorrectNoHint => Ok(ResultCode::CorrectNoHint),
            Outcome::CorrectWithHint => Ok(ResultCode::CorrectWithHint),
            Outcome::Skipped => Ok(ResultCode::Skipped),
            Outcome::Pending => Err(TransportError::Encode(
                "pending outcome has no result code".to_string(),
            )),
        }
    }
}

/// Frames exchanged over the relay WebSocket, in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum WireEvent {
    Keyword(KeywordDto),
    ShowHint(HintDto),
    HintUsed(HintDto),
    ScoreUpdate(ScoreUpdateDto),
    PlayerQuit(QuitDto),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordDto {
    pub keyword: String,
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintDto {
    pub hint: String,
}

/// `score-update` carries either one resolved keyword or the room total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreUpdateDto {
    Outcome { result: ResultCode, keyword: String },
    Total { score: u32 },
}

// Quit carries no data; clients may still send extra fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuitDto {}

impl From<WireEvent> for RoomEvent {
    fn from(event: WireEvent) -> Self {
        match event {
            WireEvent::Keyword(KeywordDto { keyword, hint }) => RoomEvent::Keyword { keyword, hint },
            WireEvent::ShowHint(HintDto { hint }) => RoomEvent::ShowHint { hint },
            WireEvent::HintUsed(HintDto { hint }) => RoomEvent::HintUsed { hint },
            WireEvent::ScoreUpdate(ScoreUpdateDto::Outcome { result, keyword }) => {
                RoomEvent::Outcome {
                    keyword,
                    outcome: result.into(),
                }
            }
            WireEvent::ScoreUpdate(ScoreUpdateDto::Total { score }) => {
                RoomEvent::Score { points: score }
            }
            WireEvent::PlayerQuit(_) => RoomEvent::PlayerQuit,
        }
    }
}

impl TryFrom<RoomEvent> for WireEvent {
    type Error = TransportError;

    fn try_from(event: RoomEvent) -> Result<Self, Self::Error> {
        Ok(match event {
            RoomEvent::Keyword { keyword, hint } => WireEvent::Keyword(KeywordDto { keyword, hint }),
            RoomEvent::ShowHint { hint } => WireEvent::ShowHint(HintDto { hint }),
            RoomEvent::HintUsed { hint } => WireEvent::HintUsed(HintDto { hint }),
            RoomEvent::Outcome { keyword, outcome } => {
                WireEvent::ScoreUpdate(ScoreUpdateDto::Outcome {
                    result: outcome.try_into()?,
                    keyword,
                })
            }
            RoomEvent::Score { points } => {
                WireEvent::ScoreUpdate(ScoreUpdateDto::Total { score: points })
            }
            RoomEvent::PlayerQuit => WireEvent::PlayerQuit(QuitDto {}),
        })
    }
}

/// Serializes a room event into a text frame.
pub fn encode_frame(event: RoomEvent) -> Result<String, TransportError> {
    let wire = WireEvent::try_from(event)?;
    serde_json::to_string(&wire).map_err(|e| TransportError::Encode(e.to_string()))
}

/// Request body for room creation; a code is generated when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub room_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub room_code: String,
    // Shared countdown start in epoch millis.
    pub start_time: u64,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreQueryParams {
    pub room_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MistakeRequest {
    pub room_code: String,
    pub keyword: String,
    pub result: ResultCode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayQueryParams {
    pub room: String,
}
