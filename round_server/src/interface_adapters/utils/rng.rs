use rand::seq::IndexedRandom;
use std::{
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ROOM_CODE_LEN: usize = 6;

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Returns a process-unique, monotonically increasing identifier.
///
/// Used for connection ids, where uniqueness matters and predictability does not.
pub fn rand_id() -> u64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| AtomicU64::new(now_nanos()));
    counter.fetch_add(1, Ordering::Relaxed)
}

/// Short, human-friendly room code (no 0/O or 1/I look-alikes).
pub fn room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| {
            ROOM_CODE_ALPHABET
                .choose(&mut rng)
                .map_or('A', |&c| c as char)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rand_id_is_unique_per_call() {
        let first = rand_id();
        let second = rand_id();

        assert_ne!(first, second);
    }

    #[test]
    fn room_codes_are_url_safe_and_vary() {
        let first = room_code();
        let second = room_code();

        assert_eq!(first.len(), ROOM_CODE_LEN);
        assert!(first.bytes().all(|c| ROOM_CODE_ALPHABET.contains(&c)));
        assert_ne!(first, second);
    }
}
