//! The archive transform engine.
//!
//! [`transform`] rewrites one archive file into another; [`transform_stream`]
//! runs the same per-entry loop over arbitrary readers and writers; [`plan`]
//! reports what a run would do without writing anything.
//!
//! # Example
//!
//! ```rust,no_run
//! use tarpatch::{Rule, TransformConfig, transform};
//!
//! let config = TransformConfig::new("pkg-1.0.0.tgz", "pkg-1.0.0.tgz")
//!     .rule(Rule::suppress(["**/*.log"])?)
//!     .rule(Rule::json_patch(["package/package.json"], ["scripts", "devDependencies"])?);
//!
//! let report = transform(&config)?;
//! println!(
//!     "{} copied, {} rewritten, {} dropped",
//!     report.entries_copied, report.entries_rewritten, report.entries_suppressed
//! );
//! # Ok::<(), tarpatch::Error>(())
//! ```

mod engine;
mod finalize;
mod plan;

pub use engine::transform_stream;
pub use finalize::transform;
pub use plan::{PlannedEntry, plan, plan_stream};

use crate::config::SharedProgress;
use crate::entry::EntryOutcome;
use crate::progress::Phase;
use crate::rule::ActionKind;

/// Totals for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformReport {
    /// Entries written unchanged.
    pub entries_copied: usize,
    /// Entries left out of the output.
    pub entries_suppressed: usize,
    /// Entries whose JSON content was rewritten.
    pub entries_rewritten: usize,
    /// Entries handed to a custom handler.
    pub entries_custom: usize,
    /// Bytes read from the input, before decompression.
    pub bytes_read: u64,
    /// Bytes written to the output, after compression.
    pub bytes_written: u64,
}

impl TransformReport {
    /// Returns the number of entries seen in the input.
    pub fn total_entries(&self) -> usize {
        self.entries_copied + self.entries_suppressed + self.entries_rewritten + self.entries_custom
    }

    fn record(&mut self, outcome: &EntryOutcome) {
        match outcome {
            EntryOutcome::Copied { .. } => self.entries_copied += 1,
            EntryOutcome::Suppressed { .. } => self.entries_suppressed += 1,
            EntryOutcome::Rewritten { .. } => self.entries_rewritten += 1,
            EntryOutcome::Custom { .. } => self.entries_custom += 1,
        }
    }
}

/// Phase tracking and progress notification for one run.
struct RunState<'p> {
    phase: Phase,
    progress: Option<&'p SharedProgress>,
}

impl<'p> RunState<'p> {
    fn new(progress: Option<&'p SharedProgress>) -> Self {
        Self {
            phase: Phase::Idle,
            progress,
        }
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal transition {} -> {}",
            self.phase,
            next
        );
        log::trace!("phase {} -> {}", self.phase, next);
        self.phase = next;
        self.notify(|p| p.on_phase(next));
    }

    fn entry_start(&self, path: &str, size: u64) {
        self.notify(|p| p.on_entry_start(path, size));
    }

    fn entry_complete(&self, path: &str, action: ActionKind) {
        self.notify(|p| p.on_entry_complete(path, action));
    }

    fn notify(&self, f: impl FnOnce(&mut dyn crate::progress::TransformProgress)) {
        if let Some(progress) = self.progress {
            // Poisoned observers are skipped.
            if let Ok(mut guard) = progress.lock() {
                f(&mut *guard);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_totals() {
        let mut report = TransformReport::default();
        report.record(&EntryOutcome::Copied { size: 1 });
        report.record(&EntryOutcome::Copied { size: 2 });
        report.record(&EntryOutcome::Suppressed { size: 3 });
        report.record(&EntryOutcome::Rewritten {
            action: ActionKind::JsonPatch,
            old_size: 10,
            new_size: 5,
        });
        report.record(&EntryOutcome::Custom { written: false });
        assert_eq!(report.entries_copied, 2);
        assert_eq!(report.total_entries(), 5);
    }

    #[test]
    fn test_run_state_notifies_observer() {
        use crate::progress::StatisticsProgress;
        use std::sync::{Arc, Mutex};

        let stats = Arc::new(Mutex::new(StatisticsProgress::new()));
        let shared: SharedProgress = stats.clone();
        let mut run = RunState::new(Some(&shared));
        run.advance(Phase::Extracting);
        run.advance(Phase::Matching);
        run.entry_start("a", 3);
        run.advance(Phase::Processing);
        run.entry_complete("a", ActionKind::Copy);
        run.advance(Phase::Extracting);
        run.advance(Phase::Finalizing);
        run.advance(Phase::Done);

        let stats = stats.lock().unwrap();
        assert_eq!(stats.phases.len(), 6);
        assert_eq!(stats.last_phase(), Some(Phase::Done));
        assert_eq!(stats.completed, [("a".to_string(), ActionKind::Copy)]);
    }
}
