// Relay-side authority for a room: keeps the authoritative total and decides who
// receives each inbound event.

use super::events::RoomEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    // Everyone except the sender.
    Others,
    Everyone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub audience: Audience,
    pub event: RoomEvent,
}

impl Delivery {
    fn others(event: RoomEvent) -> Self {
        Self {
            audience: Audience::Others,
            event,
        }
    }

    fn everyone(event: RoomEvent) -> Self {
        Self {
            audience: Audience::Everyone,
            event,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomLedger {
    // Keyword and hint most recently announced by the clue-giver.
    current: Option<(String, String)>,
    scored: bool,
    points: u32,
    ended: bool,
}

impl RoomLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Events a newly joined member needs to catch up: the unscored keyword, if any,
    /// followed by the current total.
    pub fn snapshot(&self) -> Vec<RoomEvent> {
        let mut events = Vec::new();
        if let Some((keyword, hint)) = self.current.as_ref().filter(|_| !self.scored) {
            events.push(RoomEvent::Keyword {
                keyword: keyword.clone(),
                hint: hint.clone(),
            });
        }
        events.push(RoomEvent::Score {
            points: self.points,
        });
        events
    }

    /// Applies an event sent by a member and returns the deliveries to fan out.
    pub fn apply(&mut self, event: RoomEvent) -> Vec<Delivery> {
        if self.ended {
            return Vec::new();
        }

        match event {
            RoomEvent::Keyword { keyword, hint } => {
                let duplicate = self
                    .current
                    .as_ref()
                    .is_some_and(|(current, _)| *current == keyword);
                if duplicate && !self.scored {
                    return Vec::new();
                }
                self.current = Some((keyword.clone(), hint.clone()));
                self.scored = false;
                vec![Delivery::others(RoomEvent::Keyword { keyword, hint })]
            }
            RoomEvent::HintUsed { hint } | RoomEvent::ShowHint { hint } => {
                vec![Delivery::others(RoomEvent::ShowHint { hint })]
            }
            RoomEvent::Outcome { keyword, outcome } => {
                let targets_current = self
                    .current
                    .as_ref()
                    .is_some_and(|(current, _)| *current == keyword);
                if !targets_current || self.scored {
                    // Replays and stale verdicts only refresh the total.
                    return vec![Delivery::everyone(RoomEvent::Score {
                        points: self.points,
                    })];
                }

                self.scored = true;
                self.points = self.points.saturating_add(outcome.tariff());
                vec![
                    Delivery::others(RoomEvent::Outcome { keyword, outcome }),
                    Delivery::everyone(RoomEvent::Score {
                        points: self.points,
                    }),
                ]
            }
            // Members never dictate the total.
            RoomEvent::Score { .. } => Vec::new(),
            RoomEvent::PlayerQuit => {
                self.ended = true;
                vec![Delivery::others(RoomEvent::PlayerQuit)]
            }
        }
    }
}
