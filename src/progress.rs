//! Progress reporting for transform runs.
//!
//! A [`TransformProgress`] observer is told about every phase change of the
//! engine and about each entry as it is processed. All callbacks have no-op
//! defaults, so an observer only implements what it needs.
//!
//! # Example
//!
//! ```rust
//! use tarpatch::TransformOptions;
//! use tarpatch::progress::progress_fn;
//!
//! let options = TransformOptions::new().progress(progress_fn(|path, action| {
//!     println!("{:>10}  {}", action, path);
//! }));
//! ```

use std::collections::HashMap;

use crate::rule::ActionKind;

/// IEC byte unit: 1 KiB = 1024 bytes.
pub const BYTES_KIB: u64 = 1024;
/// IEC byte unit: 1 MiB = 1024 KiB.
pub const BYTES_MIB: u64 = 1024 * BYTES_KIB;

/// Engine state.
///
/// A run moves `Idle -> Extracting -> (Matching -> Processing)* ->
/// Finalizing -> Done`. `Aborted` can be entered from any state that is not
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing opened yet.
    Idle,
    /// Waiting for the next entry header.
    Extracting,
    /// Selecting the rule for the current entry.
    Matching,
    /// Running the rule's action on the current entry.
    Processing,
    /// Closing the output archive and flushing the compressor.
    Finalizing,
    /// The output is in place.
    Done,
    /// The run failed; partial output has been cleaned up.
    Aborted,
}

impl Phase {
    /// Returns whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Aborted)
    }

    /// Returns whether moving from `self` to `next` is a legal transition.
    pub fn can_advance_to(self, next: Phase) -> bool {
        use Phase::*;
        match (self, next) {
            (from, Aborted) => !from.is_terminal(),
            (Idle, Extracting)
            | (Extracting, Matching)
            | (Extracting, Finalizing)
            | (Matching, Processing)
            | (Processing, Extracting)
            | (Finalizing, Done) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Extracting => "extracting",
            Phase::Matching => "matching",
            Phase::Processing => "processing",
            Phase::Finalizing => "finalizing",
            Phase::Done => "done",
            Phase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Observer for transform runs.
pub trait TransformProgress: Send {
    /// Called on every engine state transition.
    fn on_phase(&mut self, phase: Phase) {
        let _ = phase;
    }

    /// Called when an entry header has been read, before its rule runs.
    fn on_entry_start(&mut self, entry_name: &str, size: u64) {
        let _ = (entry_name, size);
    }

    /// Called after an entry has been fully handled.
    ///
    /// `action` is what actually happened: a header hook that drops an
    /// entry reports [`ActionKind::Suppress`] whatever the rule said.
    fn on_entry_complete(&mut self, entry_name: &str, action: ActionKind) {
        let _ = (entry_name, action);
    }
}

/// A progress observer that does nothing (null object pattern).
#[derive(Debug, Default, Clone)]
pub struct NoProgress;

impl TransformProgress for NoProgress {}

/// A progress observer that collects statistics.
#[derive(Debug, Default, Clone)]
pub struct StatisticsProgress {
    /// Every phase entered, in order.
    pub phases: Vec<Phase>,
    /// Entry currently being processed.
    pub current_entry: Option<String>,
    /// Completed entries, in order, with the action applied.
    pub completed: Vec<(String, ActionKind)>,
    /// Sum of header sizes of all entries seen.
    pub bytes_seen: u64,
}

impl StatisticsProgress {
    /// Creates a new statistics observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many completed entries used each action.
    pub fn counts(&self) -> HashMap<ActionKind, usize> {
        let mut counts = HashMap::new();
        for (_, action) in &self.completed {
            *counts.entry(*action).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the last phase entered.
    pub fn last_phase(&self) -> Option<Phase> {
        self.phases.last().copied()
    }
}

impl TransformProgress for StatisticsProgress {
    fn on_phase(&mut self, phase: Phase) {
        self.phases.push(phase);
    }

    fn on_entry_start(&mut self, entry_name: &str, size: u64) {
        self.current_entry = Some(entry_name.to_string());
        self.bytes_seen += size;
    }

    fn on_entry_complete(&mut self, entry_name: &str, action: ActionKind) {
        self.completed.push((entry_name.to_string(), action));
        self.current_entry = None;
    }
}

/// A progress observer that calls a closure for each completed entry.
pub struct ClosureProgress<F> {
    callback: F,
}

impl<F> ClosureProgress<F>
where
    F: FnMut(&str, ActionKind) + Send,
{
    /// Creates an observer from a closure.
    ///
    /// The closure receives the entry path and the action applied.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> TransformProgress for ClosureProgress<F>
where
    F: FnMut(&str, ActionKind) + Send,
{
    fn on_entry_complete(&mut self, entry_name: &str, action: ActionKind) {
        (self.callback)(entry_name, action)
    }
}

/// Creates a closure-based progress observer.
pub fn progress_fn<F>(f: F) -> ClosureProgress<F>
where
    F: FnMut(&str, ActionKind) + Send,
{
    ClosureProgress::new(f)
}

/// Formats bytes as a human-readable string using IEC units.
pub fn format_bytes_iec(bytes: u64) -> String {
    if bytes < BYTES_KIB {
        format!("{} B", bytes)
    } else if bytes < BYTES_MIB {
        format!("{:.1} KiB", bytes as f64 / BYTES_KIB as f64)
    } else {
        format!("{:.1} MiB", bytes as f64 / BYTES_MIB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        assert!(Phase::Idle.can_advance_to(Phase::Extracting));
        assert!(Phase::Extracting.can_advance_to(Phase::Matching));
        assert!(Phase::Matching.can_advance_to(Phase::Processing));
        assert!(Phase::Processing.can_advance_to(Phase::Extracting));
        assert!(Phase::Extracting.can_advance_to(Phase::Finalizing));
        assert!(Phase::Finalizing.can_advance_to(Phase::Done));

        assert!(!Phase::Idle.can_advance_to(Phase::Processing));
        assert!(!Phase::Processing.can_advance_to(Phase::Finalizing));
        assert!(!Phase::Done.can_advance_to(Phase::Extracting));
    }

    #[test]
    fn test_abort_from_non_terminal_only() {
        for phase in [
            Phase::Idle,
            Phase::Extracting,
            Phase::Matching,
            Phase::Processing,
            Phase::Finalizing,
        ] {
            assert!(phase.can_advance_to(Phase::Aborted), "{}", phase);
        }
        assert!(!Phase::Done.can_advance_to(Phase::Aborted));
        assert!(!Phase::Aborted.can_advance_to(Phase::Aborted));
    }

    #[test]
    fn test_statistics_progress() {
        let mut progress = StatisticsProgress::new();
        progress.on_phase(Phase::Extracting);
        progress.on_entry_start("a.log", 10);
        progress.on_entry_complete("a.log", ActionKind::Suppress);
        progress.on_entry_start("b.txt", 5);
        progress.on_entry_complete("b.txt", ActionKind::Copy);

        assert_eq!(progress.bytes_seen, 15);
        assert_eq!(progress.completed.len(), 2);
        assert_eq!(progress.counts()[&ActionKind::Suppress], 1);
        assert_eq!(progress.last_phase(), Some(Phase::Extracting));
        assert!(progress.current_entry.is_none());
    }

    #[test]
    fn test_closure_progress() {
        let mut seen = Vec::new();
        {
            let mut progress = progress_fn(|name: &str, action| seen.push((name.to_string(), action)));
            progress.on_entry_complete("x", ActionKind::JsonPatch);
        }
        assert_eq!(seen, [("x".to_string(), ActionKind::JsonPatch)]);
    }

    #[test]
    fn test_format_bytes_iec() {
        assert_eq!(format_bytes_iec(512), "512 B");
        assert_eq!(format_bytes_iec(2048), "2.0 KiB");
        assert_eq!(format_bytes_iec(3 * BYTES_MIB), "3.0 MiB");
    }
}
