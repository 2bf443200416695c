// Round state machine for one participant. Events go in, effects for the runner come out;
// the reducer never performs I/O itself.

use super::clock::{ClockReading, RoundClock};
use super::events::RoomEvent;
use super::round::{Outcome, Role, RoundState, Verdict};
use super::score::ScoreLedger;
use tracing::debug;

/// Room code the lobby uses for a non-networked game.
pub const LOCAL_ROOM: &str = "simple-local";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    KeywordReceived {
        origin: Origin,
        keyword: String,
        hint: String,
    },
    // Keyword source failed or returned nothing.
    KeywordUnavailable,
    HintRequested {
        origin: Origin,
        // Remote requests carry the hint text so stale ones can be told apart.
        hint: Option<String>,
    },
    OutcomeRecorded {
        origin: Origin,
        keyword: Option<String>,
        verdict: Verdict,
    },
    ScoreBroadcast {
        points: u32,
    },
    Quit {
        origin: Origin,
    },
    ClockTick {
        now_ms: u64,
    },
}

impl SessionEvent {
    /// Maps inbound channel traffic onto reducer events.
    pub fn from_remote(event: RoomEvent) -> Option<Self> {
        match event {
            RoomEvent::Keyword { keyword, hint } => Some(SessionEvent::KeywordReceived {
                origin: Origin::Remote,
                keyword,
                hint,
            }),
            RoomEvent::ShowHint { hint } | RoomEvent::HintUsed { hint } => {
                Some(SessionEvent::HintRequested {
                    origin: Origin::Remote,
                    hint: Some(hint),
                })
            }
            RoomEvent::Outcome { keyword, outcome } => {
                outcome
                    .verdict()
                    .map(|verdict| SessionEvent::OutcomeRecorded {
                        origin: Origin::Remote,
                        keyword: Some(keyword),
                        verdict,
                    })
            }
            RoomEvent::Score { points } => Some(SessionEvent::ScoreBroadcast { points }),
            RoomEvent::PlayerQuit => Some(SessionEvent::Quit {
                origin: Origin::Remote,
            }),
        }
    }
}

/// Work the runner must carry out after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchKeyword,
    Publish(RoomEvent),
    KeywordShown { keyword: String },
    RevealHint(String),
    Persist { keyword: String, outcome: Outcome },
    ScoreChanged(u32),
    TimeRemaining(u64),
    Ended(SessionSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    ClockExpired,
    LocalQuit,
    RemoteQuit,
    LimitReached,
}

/// Final score and played keywords handed to the game-over screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub points: u32,
    pub history: Vec<(String, Outcome)>,
    pub reason: EndReason,
}

/// Optional session-level end conditions on top of the clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionPolicy {
    pub max_rounds: Option<u32>,
    pub score_ceiling: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Active(RoundState),
    // Outcome recorded; the next keyword is on its way.
    Resolved(RoundState),
    Ended,
}

#[derive(Debug)]
pub struct Session {
    role: Role,
    room: Option<String>,
    clock: RoundClock,
    policy: SessionPolicy,
    phase: Phase,
    ledger: ScoreLedger,
    rounds_played: u32,
}

impl Session {
    /// Builds a session. A missing, blank or `simple-local` room makes it non-networked,
    /// in which case the single participant both fetches keywords and judges them.
    pub fn new(role: Role, room: Option<String>, clock: RoundClock) -> Self {
        let room = room.filter(|code| !code.trim().is_empty() && code != LOCAL_ROOM);
        Self {
            role,
            room,
            clock,
            policy: SessionPolicy::default(),
            phase: Phase::Waiting,
            ledger: ScoreLedger::new(),
            rounds_played: 0,
        }
    }

    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn is_networked(&self) -> bool {
        self.room.is_some()
    }

    pub fn clock(&self) -> &RoundClock {
        &self.clock
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    /// The live round, if any.
    pub fn current_round(&self) -> Option<&RoundState> {
        match &self.phase {
            Phase::Active(round) => Some(round),
            _ => None,
        }
    }

    fn may_fetch(&self) -> bool {
        self.role == Role::ClueGiver || !self.is_networked()
    }

    fn may_judge(&self) -> bool {
        self.role == Role::Guesser || !self.is_networked()
    }

    /// True when this side is responsible for pulling a keyword right now.
    pub fn needs_keyword(&self) -> bool {
        self.may_fetch() && matches!(self.phase, Phase::Waiting | Phase::Resolved(_))
    }

    pub fn start(&self) -> Vec<Effect> {
        if self.needs_keyword() {
            vec![Effect::FetchKeyword]
        } else {
            Vec::new()
        }
    }

    /// Applies the room total read at session start.
    pub fn seed_score(&mut self, points: u32) -> Vec<Effect> {
        if self.is_ended() || !self.ledger.seed(points) {
            return Vec::new();
        }
        vec![Effect::ScoreChanged(points)]
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        if self.is_ended() {
            debug!(?event, "event after session end ignored");
            return Vec::new();
        }

        match event {
            SessionEvent::KeywordReceived {
                origin,
                keyword,
                hint,
            } => self.on_keyword(origin, keyword, hint),
            SessionEvent::KeywordUnavailable => {
                debug!("no keyword available; staying put");
                Vec::new()
            }
            SessionEvent::HintRequested { origin, hint } => self.on_hint(origin, hint),
            SessionEvent::OutcomeRecorded {
                origin,
                keyword,
                verdict,
            } => self.on_outcome(origin, keyword, verdict),
            SessionEvent::ScoreBroadcast { points } => self.on_score(points),
            SessionEvent::Quit { origin } => self.on_quit(origin),
            SessionEvent::ClockTick { now_ms } => match self.clock.read(now_ms) {
                ClockReading::Running { remaining_secs } => {
                    vec![Effect::TimeRemaining(remaining_secs)]
                }
                ClockReading::Expired => {
                    vec![Effect::TimeRemaining(0), self.end(EndReason::ClockExpired)]
                }
            },
        }
    }

    fn on_keyword(&mut self, origin: Origin, keyword: String, hint: String) -> Vec<Effect> {
        let allowed = match origin {
            Origin::Local => self.may_fetch(),
            // The clue-giver is the only keyword origin; anything it receives is an echo.
            Origin::Remote => self.is_networked() && self.role == Role::Guesser,
        };
        if !allowed || keyword.trim().is_empty() {
            debug!(?origin, %keyword, "keyword ignored");
            return Vec::new();
        }

        match &self.phase {
            Phase::Active(round) if origin == Origin::Local || round.keyword == keyword => {
                debug!(?origin, %keyword, "round already live; keyword ignored");
                return Vec::new();
            }
            Phase::Resolved(round) if round.keyword == keyword => {
                debug!(?origin, %keyword, "keyword matches the round just played; ignored");
                return Vec::new();
            }
            _ => {}
        }

        self.phase = Phase::Active(RoundState::new(keyword.clone(), hint.clone()));

        let mut effects = Vec::new();
        if origin == Origin::Local && self.is_networked() {
            effects.push(Effect::Publish(RoomEvent::Keyword {
                keyword: keyword.clone(),
                hint,
            }));
        }
        effects.push(Effect::KeywordShown { keyword });
        effects
    }

    fn on_hint(&mut self, origin: Origin, hint: Option<String>) -> Vec<Effect> {
        let allowed = match origin {
            Origin::Local => self.may_judge(),
            Origin::Remote => self.is_networked(),
        };
        if !allowed {
            debug!(?origin, "hint request ignored for role");
            return Vec::new();
        }

        let Phase::Active(round) = &mut self.phase else {
            debug!(?origin, "hint request outside a live round ignored");
            return Vec::new();
        };
        if round.hint.is_empty() {
            return Vec::new();
        }
        if hint.as_deref().is_some_and(|text| text != round.hint) {
            debug!(?origin, "stale hint for another keyword ignored");
            return Vec::new();
        }

        let Some(text) = round.request_hint().hint else {
            debug!(?origin, "hint already revealed");
            return Vec::new();
        };

        let mut effects = vec![Effect::RevealHint(text.clone())];
        if origin == Origin::Local && self.is_networked() {
            effects.push(Effect::Publish(RoomEvent::HintUsed { hint: text }));
        }
        effects
    }

    fn on_outcome(
        &mut self,
        origin: Origin,
        keyword: Option<String>,
        verdict: Verdict,
    ) -> Vec<Effect> {
        let allowed = match origin {
            Origin::Local => self.may_judge(),
            // Remote outcomes are the guesser's verdicts mirrored to the clue-giver.
            Origin::Remote => self.is_networked() && self.role == Role::ClueGiver,
        };
        if !allowed {
            debug!(?origin, ?verdict, "verdict ignored for role");
            return Vec::new();
        }

        let mut round = match std::mem::replace(&mut self.phase, Phase::Waiting) {
            Phase::Active(round)
                if keyword.as_deref().is_none_or(|keyword| keyword == round.keyword) =>
            {
                round
            }
            other => {
                self.phase = other;
                debug!(?origin, ?keyword, "verdict without a matching live round ignored");
                return Vec::new();
            }
        };

        let Some(outcome) = round.resolve(verdict) else {
            self.phase = Phase::Resolved(round);
            return Vec::new();
        };

        let points = self.ledger.apply_local_outcome(round.keyword.clone(), outcome);
        self.rounds_played += 1;

        let mut effects = vec![Effect::ScoreChanged(points)];
        if origin == Origin::Local && self.is_networked() {
            effects.push(Effect::Publish(RoomEvent::Outcome {
                keyword: round.keyword.clone(),
                outcome,
            }));
            effects.push(Effect::Persist {
                keyword: round.keyword.clone(),
                outcome,
            });
        }
        self.phase = Phase::Resolved(round);

        if self.limit_reached() {
            effects.push(self.end(EndReason::LimitReached));
        } else if self.may_fetch() {
            effects.push(Effect::FetchKeyword);
        }
        effects
    }

    fn on_score(&mut self, points: u32) -> Vec<Effect> {
        if !self.is_networked() {
            return Vec::new();
        }
        if points < self.ledger.points() {
            debug!(
                local = self.ledger.points(),
                remote = points,
                "remote total behind local total; remote wins"
            );
        }

        let mut effects = vec![Effect::ScoreChanged(self.ledger.reconcile(points))];
        if self.limit_reached() {
            effects.push(self.end(EndReason::LimitReached));
        }
        effects
    }

    fn on_quit(&mut self, origin: Origin) -> Vec<Effect> {
        match origin {
            Origin::Local => {
                let mut effects = Vec::new();
                if self.is_networked() {
                    effects.push(Effect::Publish(RoomEvent::PlayerQuit));
                }
                effects.push(self.end(EndReason::LocalQuit));
                effects
            }
            Origin::Remote if self.is_networked() => vec![self.end(EndReason::RemoteQuit)],
            Origin::Remote => Vec::new(),
        }
    }

    fn limit_reached(&self) -> bool {
        let rounds = self
            .policy
            .max_rounds
            .is_some_and(|max| self.rounds_played >= max);
        let score = self
            .policy
            .score_ceiling
            .is_some_and(|ceiling| self.ledger.points() >= ceiling);
        rounds || score
    }

    fn end(&mut self, reason: EndReason) -> Effect {
        self.phase = Phase::Ended;
        Effect::Ended(SessionSummary {
            points: self.ledger.points(),
            history: self.ledger.history().to_vec(),
            reason,
        })
    }
}
