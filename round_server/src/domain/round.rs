// Round-level types: participant roles, outcomes and the per-keyword hint gate.

/// Which side of the table a participant sits on for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    // Pulls keywords and judges guesses.
    ClueGiver,
    // Sees the keyword and submits verdicts.
    Guesser,
}

impl Role {
    /// Parses the role names used by the lobby screen (`clue-giver`, `guesser`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "clue-giver" | "clue_giver" | "cluegiver" => Some(Role::ClueGiver),
            "guesser" => Some(Role::Guesser),
            _ => None,
        }
    }
}

/// Result of a round once the guesser has acted on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Skipped,
    CorrectNoHint,
    CorrectWithHint,
}

impl Outcome {
    /// Points awarded for this outcome.
    pub fn tariff(self) -> u32 {
        match self {
            Outcome::CorrectNoHint => 2,
            Outcome::CorrectWithHint => 1,
            Outcome::Skipped | Outcome::Pending => 0,
        }
    }

    /// Verdict that reproduces this outcome on the other end of the channel.
    pub fn verdict(self) -> Option<Verdict> {
        match self {
            Outcome::Pending => None,
            Outcome::Skipped => Some(Verdict::Skip),
            Outcome::CorrectNoHint => Some(Verdict::Correct),
            Outcome::CorrectWithHint => Some(Verdict::CorrectWithHint),
        }
    }
}

/// Guesser judgement on the live keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Skip,
    Correct,
    CorrectWithHint,
}

/// Keyword and hint pair handed out by a keyword source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordPair {
    pub keyword: String,
    pub hint: String,
}

/// Answer from the hint gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintReveal {
    pub revealed: bool,
    // Only set for the call that actually flipped the gate.
    pub hint: Option<String>,
}

/// State of the single live round in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    pub keyword: String,
    pub hint: String,
    hint_revealed: bool,
    outcome: Outcome,
}

impl RoundState {
    pub fn new(keyword: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            hint: hint.into(),
            hint_revealed: false,
            outcome: Outcome::Pending,
        }
    }

    pub fn hint_revealed(&self) -> bool {
        self.hint_revealed
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// True while the round still accepts hints and verdicts.
    pub fn is_live(&self) -> bool {
        self.outcome == Outcome::Pending
    }

    /// Hint gate. The first caller flips the flag and receives the hint text; every
    /// later caller, local or remote, sees `hint: None` and must not repeat side effects.
    pub fn request_hint(&mut self) -> HintReveal {
        if self.hint_revealed {
            return HintReveal {
                revealed: true,
                hint: None,
            };
        }

        self.hint_revealed = true;
        HintReveal {
            revealed: true,
            hint: Some(self.hint.clone()),
        }
    }

    /// Records the verdict and returns the resulting outcome, or `None` when the round
    /// was already resolved. A revealed hint caps any correct verdict at `CorrectWithHint`.
    pub fn resolve(&mut self, verdict: Verdict) -> Option<Outcome> {
        if !self.is_live() {
            return None;
        }

        self.outcome = match verdict {
            Verdict::Skip => Outcome::Skipped,
            Verdict::Correct if self.hint_revealed => Outcome::CorrectWithHint,
            Verdict::Correct => Outcome::CorrectNoHint,
            Verdict::CorrectWithHint => Outcome::CorrectWithHint,
        };
        Some(self.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_hint_requested_twice_then_only_first_call_returns_text() {
        let mut round = RoundState::new("vein", "carries blood to the heart");

        let first = round.request_hint();
        let second = round.request_hint();

        assert_eq!(first.hint.as_deref(), Some("carries blood to the heart"));
        assert!(second.revealed);
        assert_eq!(second.hint, None);
        assert!(round.hint_revealed());
    }

    #[test]
    fn when_hint_revealed_then_correct_is_capped() {
        let mut round = RoundState::new("artery", "carries blood away from heart");
        round.request_hint();

        let outcome = round.resolve(Verdict::Correct);

        assert_eq!(outcome, Some(Outcome::CorrectWithHint));
        assert_eq!(round.outcome().tariff(), 1);
    }

    #[test]
    fn when_skip_after_hint_then_round_is_skipped() {
        let mut round = RoundState::new("artery", "carries blood away from heart");
        round.request_hint();

        assert_eq!(round.resolve(Verdict::Skip), Some(Outcome::Skipped));
    }

    #[test]
    fn when_round_resolved_then_second_verdict_is_ignored() {
        let mut round = RoundState::new("cell", "basic unit of life");

        assert_eq!(round.resolve(Verdict::Correct), Some(Outcome::CorrectNoHint));
        assert_eq!(round.resolve(Verdict::Skip), None);
        assert_eq!(round.outcome(), Outcome::CorrectNoHint);
        assert!(!round.is_live());
    }

    #[test]
    fn role_names_parse_case_insensitively() {
        assert_eq!(Role::parse("Clue-Giver"), Some(Role::ClueGiver));
        assert_eq!(Role::parse(" guesser "), Some(Role::Guesser));
        assert_eq!(Role::parse("spectator"), None);
    }
}
