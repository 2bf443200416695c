use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::errors::{PersistError, SourceError, TransportError};
use crate::domain::events::RoomEvent;
use crate::domain::round::{KeywordPair, Outcome};

// Port for the relay channel shared by the two participants of a room.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    fn room(&self) -> &str;
    // Fire-and-forget; no delivery acknowledgement.
    async fn publish(&self, event: RoomEvent) -> Result<(), TransportError>;
    // Hands out the inbound stream once. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> Result<mpsc::Receiver<RoomEvent>, TransportError>;
}

// Port for pulling the next keyword/hint pair.
#[async_trait]
pub trait KeywordSource: Send + Sync {
    async fn next_keyword(&self) -> Result<KeywordPair, SourceError>;
}

// Port for best-effort outcome persistence.
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    async fn record(&self, room: &str, keyword: &str, outcome: Outcome)
    -> Result<(), PersistError>;
}

// Port for reading a room's current total at session start.
#[async_trait]
pub trait ScoreQuery: Send + Sync {
    async fn room_score(&self, room: &str) -> Result<u32, SourceError>;
}

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_epoch_millis(&self) -> u64;
}
