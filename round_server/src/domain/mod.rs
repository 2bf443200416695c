// Domain layer: round rules, scoring, countdown and relay authority.

pub mod clock;
pub mod errors;
pub mod events;
pub mod ports;
pub mod room;
pub mod round;
pub mod score;
pub mod session;

pub use clock::{ClockReading, DEFAULT_ROUND_DURATION, RoundClock, SystemClock, format_remaining};
pub use errors::{PersistError, SourceError, TransportError};
pub use events::RoomEvent;
pub use room::{Audience, Delivery, RoomLedger};
pub use round::{HintReveal, KeywordPair, Outcome, Role, RoundState, Verdict};
pub use score::ScoreLedger;
pub use session::{
    Effect, EndReason, LOCAL_ROOM, Origin, Phase, Session, SessionEvent, SessionPolicy,
    SessionSummary,
};
