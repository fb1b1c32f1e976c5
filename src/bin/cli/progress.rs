//! Progress spinner for CLI rewrites.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tarpatch::progress::format_bytes_iec;
use tarpatch::{ActionKind, Phase, TransformProgress};

/// Spinner showing the entry being processed.
///
/// The entry count is unknown until the archive has been read, so this is a
/// spinner with a running position rather than a bar. Clones share the same
/// spinner, which lets the command keep a handle after moving one clone into
/// the transform options.
#[derive(Clone)]
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    /// Creates a spinner, hidden when `quiet` is set
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {pos} entries {wide_msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        };

        Self { bar }
    }

    /// Clears the spinner from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl TransformProgress for CliProgress {
    fn on_phase(&mut self, phase: Phase) {
        if phase == Phase::Finalizing {
            self.bar.set_message("finishing archive");
        }
    }

    fn on_entry_start(&mut self, entry_name: &str, size: u64) {
        // Keep the tail of long names; it carries the file name
        let display_name = match entry_name.char_indices().rev().nth(39) {
            Some((cut, _)) => format!("...{}", &entry_name[cut..]),
            None => entry_name.to_string(),
        };
        self.bar
            .set_message(format!("{} ({})", display_name, format_bytes_iec(size)));
    }

    fn on_entry_complete(&mut self, _entry_name: &str, _action: ActionKind) {
        self.bar.inc(1);
    }
}
