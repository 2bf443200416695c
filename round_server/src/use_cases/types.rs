// Use-case level inputs/outputs for the session runner.

use crate::domain::{Origin, SessionEvent, SessionSummary, Verdict};

/// Actions the local participant can take from the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalAction {
    RequestHint,
    Judge(Verdict),
    Quit,
}

impl From<LocalAction> for SessionEvent {
    fn from(action: LocalAction) -> Self {
        match action {
            LocalAction::RequestHint => SessionEvent::HintRequested {
                origin: Origin::Local,
                hint: None,
            },
            LocalAction::Judge(verdict) => SessionEvent::OutcomeRecorded {
                origin: Origin::Local,
                keyword: None,
                verdict,
            },
            LocalAction::Quit => SessionEvent::Quit {
                origin: Origin::Local,
            },
        }
    }
}

/// Everything the renderer needs for one participant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub keyword: Option<String>,
    // Only set once the hint has been revealed for the current keyword.
    pub hint: Option<String>,
    pub points: u32,
    pub remaining_secs: u64,
    pub summary: Option<SessionSummary>,
}
