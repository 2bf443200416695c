use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::ports::{Clock, KeywordSource, OutcomeSink};
use crate::domain::{KeywordPair, Outcome, PersistError, SourceError};

// Shared fixed time source for deterministic session tests.
pub(crate) struct FixedClock(pub(crate) u64);

impl Clock for FixedClock {
    fn now_epoch_millis(&self) -> u64 {
        self.0
    }
}

// Hands out a fixed script of keywords, then reports exhaustion.
pub(crate) struct ScriptedKeywords {
    queue: Mutex<VecDeque<KeywordPair>>,
    calls: AtomicUsize,
}

impl ScriptedKeywords {
    pub(crate) fn new<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let queue = pairs
            .into_iter()
            .map(|(keyword, hint)| KeywordPair {
                keyword: keyword.to_string(),
                hint: hint.to_string(),
            })
            .collect();
        Self {
            queue: Mutex::new(queue),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn push(&self, keyword: &str, hint: &str) {
        let mut guard = self.queue.lock().expect("keywords mutex poisoned");
        guard.push_back(KeywordPair {
            keyword: keyword.to_string(),
            hint: hint.to_string(),
        });
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeywordSource for ScriptedKeywords {
    async fn next_keyword(&self) -> Result<KeywordPair, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.queue.lock().expect("keywords mutex poisoned");
        guard.pop_front().ok_or(SourceError::Exhausted)
    }
}

// Collects persisted outcomes; optionally rejects every write.
#[derive(Default)]
pub(crate) struct RecordingSink {
    records: Mutex<Vec<(String, String, Outcome)>>,
    reject: bool,
}

impl RecordingSink {
    pub(crate) fn rejecting() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub(crate) fn records(&self) -> Vec<(String, String, Outcome)> {
        self.records.lock().expect("sink mutex poisoned").clone()
    }
}

#[async_trait]
impl OutcomeSink for RecordingSink {
    async fn record(
        &self,
        room: &str,
        keyword: &str,
        outcome: Outcome,
    ) -> Result<(), PersistError> {
        if self.reject {
            return Err(PersistError::Rejected("sink closed".to_string()));
        }
        let mut guard = self.records.lock().expect("sink mutex poisoned");
        guard.push((room.to_string(), keyword.to_string(), outcome));
        Ok(())
    }
}
