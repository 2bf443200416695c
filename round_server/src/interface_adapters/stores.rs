// In-memory keyword bank and outcome log backing the HTTP API.

use crate::domain::ports::{KeywordSource, OutcomeSink};
use crate::domain::{KeywordPair, Outcome, PersistError, SourceError};
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::{fmt, fs, io};

const BUILTIN_KEYWORDS: &[(&str, &str)] = &[
    ("artery", "carries blood away from heart"),
    ("vein", "carries blood back to the heart"),
    ("capillary", "tiny vessel where gases are exchanged"),
    ("platelet", "cell fragment that helps blood clot"),
    ("plasma", "liquid part of the blood"),
    ("ventricle", "lower chamber of the heart"),
    ("atrium", "upper chamber of the heart"),
    ("alveoli", "air sacs in the lungs"),
    ("diaphragm", "muscle that drives breathing"),
    ("hemoglobin", "protein that carries oxygen in red cells"),
];

#[derive(Debug, Deserialize)]
struct KeywordFile {
    #[serde(default)]
    keyword: Vec<KeywordEntry>,
}

#[derive(Debug, Deserialize)]
struct KeywordEntry {
    keyword: String,
    hint: String,
}

#[derive(Debug)]
pub enum KeywordBankError {
    Io(io::Error),
    Parse(toml::de::Error),
    Empty,
}

impl fmt::Display for KeywordBankError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeywordBankError::Io(err) => write!(f, "keyword file read error: {err}"),
            KeywordBankError::Parse(err) => write!(f, "keyword file parse error: {err}"),
            KeywordBankError::Empty => write!(f, "keyword file has no usable entries"),
        }
    }
}

impl std::error::Error for KeywordBankError {}

/// Random keyword/hint pairs, never handing out the same keyword twice in a row.
pub struct KeywordBank {
    pairs: Vec<KeywordPair>,
    last: Mutex<Option<usize>>,
}

impl KeywordBank {
    pub fn new(pairs: Vec<KeywordPair>) -> Self {
        Self {
            pairs,
            last: Mutex::new(None),
        }
    }

    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_KEYWORDS
                .iter()
                .map(|(keyword, hint)| KeywordPair {
                    keyword: keyword.to_string(),
                    hint: hint.to_string(),
                })
                .collect(),
        )
    }

    /// Parses a TOML bank made of `[[keyword]]` tables with `keyword` and `hint` keys.
    /// Entries with a blank keyword are skipped.
    pub fn from_toml_str(raw: &str) -> Result<Self, KeywordBankError> {
        let file: KeywordFile = toml::from_str(raw).map_err(KeywordBankError::Parse)?;
        let pairs: Vec<KeywordPair> = file
            .keyword
            .into_iter()
            .filter(|entry| !entry.keyword.trim().is_empty())
            .map(|entry| KeywordPair {
                keyword: entry.keyword.trim().to_string(),
                hint: entry.hint.trim().to_string(),
            })
            .collect();
        if pairs.is_empty() {
            return Err(KeywordBankError::Empty);
        }
        Ok(Self::new(pairs))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, KeywordBankError> {
        let raw = fs::read_to_string(path).map_err(KeywordBankError::Io)?;
        Self::from_toml_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn pick(&self) -> Option<KeywordPair> {
        if self.pairs.is_empty() {
            return None;
        }
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let mut rng = rand::rng();
        let index = match *last {
            // Draw from the other entries so the previous keyword cannot come back.
            Some(previous) if self.pairs.len() > 1 => {
                let offset = rng.random_range(1..self.pairs.len());
                (previous + offset) % self.pairs.len()
            }
            _ => rng.random_range(0..self.pairs.len()),
        };
        *last = Some(index);
        self.pairs.get(index).cloned()
    }
}

#[async_trait]
impl KeywordSource for KeywordBank {
    async fn next_keyword(&self) -> Result<KeywordPair, SourceError> {
        self.pick().ok_or(SourceError::Exhausted)
    }
}

/// Append-only record of resolved keywords per room.
#[derive(Default)]
pub struct OutcomeLog {
    records: Mutex<Vec<(String, String, Outcome)>>,
}

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records_for(&self, room: &str) -> Vec<(String, Outcome)> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records
            .iter()
            .filter(|(code, _, _)| code == room)
            .map(|(_, keyword, outcome)| (keyword.clone(), *outcome))
            .collect()
    }
}

#[async_trait]
impl OutcomeSink for OutcomeLog {
    async fn record(
        &self,
        room: &str,
        keyword: &str,
        outcome: Outcome,
    ) -> Result<(), PersistError> {
        if outcome == Outcome::Pending {
            return Err(PersistError::Rejected(
                "pending outcomes are not recorded".to_string(),
            ));
        }
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.push((room.to_string(), keyword.to_string(), outcome));
        Ok(())
    }
}
