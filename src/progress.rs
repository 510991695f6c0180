//! Console progress for reconciliation runs.
//!
//! One line per completed operation, in the order the gateway saw them.

use colored::Colorize;
use kongkit::EntityKind;
use reconciler::{Outcome, ProgressCallback, Stage};

use crate::Context;
use crate::ui;

/// Prints reconciliation progress to the terminal
pub struct ConsoleProgress {
    verbose: u8,
    quiet: bool,
}

impl ConsoleProgress {
    pub fn new(ctx: &Context) -> Self {
        Self {
            verbose: ctx.verbose,
            quiet: ctx.quiet,
        }
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_stage_start(&mut self, stage: Stage) {
        log::info!("Starting {stage}");
        if !self.quiet {
            ui::section(match stage {
                Stage::Teardown => "Tearing down remote entities",
                Stage::Rebuild => "Rebuilding services and routes",
                Stage::Plugins => "Creating plugins",
            });
        }
    }

    fn on_listed(&mut self, kind: EntityKind, count: usize, truncated: bool) {
        if truncated {
            ui::warn(&truncated_line(kind));
        }
        if self.verbose > 0 && !self.quiet {
            ui::dim(&format!("{} found", ui::plural(count, kind.label())));
        }
    }

    fn on_operation_complete(&mut self, outcome: &Outcome) {
        if !self.quiet {
            ui::success(&outcome.message());
        }
    }

    fn on_operation_failed(&mut self, stage: Stage, error: &kongkit::Error) {
        ui::error(&failure_line(stage, error));
        eprintln!("  {}", error.category().advice().dimmed());
    }

    fn on_stage_complete(&mut self, stage: Stage) {
        log::info!("Finished {stage}");
    }
}

/// Warning for a collection whose later pages are never read
fn truncated_line(kind: EntityKind) -> String {
    format!(
        "Only the first page of {} was read; rerun apply to clear the rest",
        kind.collection()
    )
}

/// Failure line for the operation that aborted `stage`
///
/// Carries the status code (or transport cause) and the entity from the
/// error itself.
fn failure_line(stage: Stage, error: &kongkit::Error) -> String {
    format!("{error} ({} during {stage})", error.category().description())
}
