use std::{env, path::PathBuf, time::Duration};

// Runtime/server constants (not round rules).

pub fn http_port() -> u16 {
    env::var("ROUND_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub fn round_duration() -> Duration {
    let secs = env::var("ROUND_DURATION_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(300);
    Duration::from_secs(secs)
}

// Optional TOML keyword bank; the built-in bank is used when unset.
pub fn keywords_file() -> Option<PathBuf> {
    env::var("KEYWORDS_FILE")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

// Base URL session clients use for keywords, scores and outcomes.
pub fn backend_url() -> String {
    env::var("BACKEND_URL").unwrap_or_else(|_| format!("http://127.0.0.1:{}", http_port()))
}

pub fn backend_timeout() -> Duration {
    let millis = env::var("BACKEND_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1500);
    Duration::from_millis(millis)
}

pub const ROOM_BROADCAST_CAPACITY: usize = 128;
pub const SESSION_ACTION_CAPACITY: usize = 32;
pub const CHANNEL_INBOUND_CAPACITY: usize = 64;

// Countdown refresh; the clock itself is derived from the room start instant.
pub const CLOCK_TICK_INTERVAL: Duration = Duration::from_secs(1);

// How often rooms that are over and empty are dropped from the registry.
pub const ROOM_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
