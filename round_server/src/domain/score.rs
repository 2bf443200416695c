// Score ledger: optimistic local tariffs reconciled against the relay's total.

use super::round::Outcome;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreLedger {
    points: u32,
    history: Vec<(String, Outcome)>,
    // Set once anything other than the initial seed touched the points.
    touched: bool,
}

impl ScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn history(&self) -> &[(String, Outcome)] {
        &self.history
    }

    /// Seeds the starting total from the room score query. Ignored once the ledger has
    /// been mutated, so a slow query cannot clobber newer points.
    pub fn seed(&mut self, points: u32) -> bool {
        if self.touched {
            return false;
        }
        self.points = points;
        true
    }

    /// Appends the outcome to the history and adds its tariff right away.
    pub fn apply_local_outcome(&mut self, keyword: impl Into<String>, outcome: Outcome) -> u32 {
        self.touched = true;
        self.history.push((keyword.into(), outcome));
        self.points = self.points.saturating_add(outcome.tariff());
        self.points
    }

    /// Overwrites the provisional total with the relay's value. History is kept as is.
    pub fn reconcile(&mut self, remote_points: u32) -> u32 {
        self.touched = true;
        self.points = remote_points;
        self.points
    }
}
