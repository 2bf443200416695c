// Domain-level errors raised by the ports around the round state machine.

use std::fmt;

/// Channel adapter failures. Never fatal for a session.
#[derive(Debug)]
pub enum TransportError {
    Connect(String),
    Closed,
    Encode(String),
    AlreadySubscribed,
}

/// Keyword source and score query failures.
#[derive(Debug)]
pub enum SourceError {
    Exhausted,
    Unavailable(String),
}

/// Outcome sink failures. Logged and dropped.
#[derive(Debug)]
pub enum PersistError {
    Unavailable(String),
    Rejected(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connect(err) => write!(f, "channel connect failed: {err}"),
            TransportError::Closed => write!(f, "channel closed"),
            TransportError::Encode(err) => write!(f, "channel encode error: {err}"),
            TransportError::AlreadySubscribed => write!(f, "channel already has a subscriber"),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Exhausted => write!(f, "no keyword available"),
            SourceError::Unavailable(err) => write!(f, "source unavailable: {err}"),
        }
    }
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Unavailable(err) => write!(f, "outcome sink unavailable: {err}"),
            PersistError::Rejected(err) => write!(f, "outcome rejected: {err}"),
        }
    }
}

impl std::error::Error for TransportError {}
impl std::error::Error for SourceError {}
impl std::error::Error for PersistError {}
