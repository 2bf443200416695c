use crate::domain::ports::{Clock, KeywordSource, OutcomeSink};
use crate::use_cases::RoomRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Rooms relaying round traffic between participants.
    pub rooms: Arc<RoomRegistry>,
    // Keyword bank behind `/api/random-keyword`.
    pub keywords: Arc<dyn KeywordSource>,
    // Outcome store behind `/api/gameplay-mistake`.
    pub outcomes: Arc<dyn OutcomeSink>,
    pub clock: Arc<dyn Clock>,
}
