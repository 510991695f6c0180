//! Progress reporting traits
//!
//! The reconciler never prints. Callers implement [`ProgressCallback`] to
//! show one line per operation, collect outcomes, or stay silent.

use crate::types::{Outcome, Stage};
use kongkit::EntityKind;

/// Progress callback for reconciliation runs
pub trait ProgressCallback: Send {
    /// Called when a stage begins
    fn on_stage_start(&mut self, stage: Stage);

    /// Called after a collection was listed
    ///
    /// `truncated` is true when the gateway reported further pages that
    /// will not be read.
    fn on_listed(&mut self, kind: EntityKind, count: usize, truncated: bool);

    /// Called after each successful create, update or delete
    fn on_operation_complete(&mut self, outcome: &Outcome);

    /// Called once, for the failure that aborts the run
    fn on_operation_failed(&mut self, stage: Stage, error: &kongkit::Error);

    /// Called when a stage finishes without failure
    fn on_stage_complete(&mut self, stage: Stage);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_stage_start(&mut self, _stage: Stage) {}
    fn on_listed(&mut self, _kind: EntityKind, _count: usize, _truncated: bool) {}
    fn on_operation_complete(&mut self, _outcome: &Outcome) {}
    fn on_operation_failed(&mut self, _stage: Stage, _error: &kongkit::Error) {}
    fn on_stage_complete(&mut self, _stage: Stage) {}
}

/// Progress callback that keeps every event, for inspection after a run
#[derive(Debug, Default)]
pub struct RecordedProgress {
    pub stages_started: Vec<Stage>,
    pub stages_completed: Vec<Stage>,
    pub listed: Vec<(EntityKind, usize)>,
    pub outcomes: Vec<Outcome>,
    pub failures: Vec<(Stage, String)>,
}

impl RecordedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress lines of successful operations, in order
    pub fn messages(&self) -> Vec<String> {
        self.outcomes.iter().map(Outcome::message).collect()
    }
}

impl ProgressCallback for RecordedProgress {
    fn on_stage_start(&mut self, stage: Stage) {
        self.stages_started.push(stage);
    }

    fn on_listed(&mut self, kind: EntityKind, count: usize, _truncated: bool) {
        self.listed.push((kind, count));
    }

    fn on_operation_complete(&mut self, outcome: &Outcome) {
        self.outcomes.push(outcome.clone());
    }

    fn on_operation_failed(&mut self, stage: Stage, error: &kongkit::Error) {
        self.failures.push((stage, error.to_string()));
    }

    fn on_stage_complete(&mut self, stage: Stage) {
        self.stages_completed.push(stage);
    }
}
