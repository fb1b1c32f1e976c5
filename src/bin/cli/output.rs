//! Output formatting for CLI operations.

use console::style;
use serde_json::json;
use std::path::Path;
use tar::EntryType;
use tarpatch::progress::format_bytes_iec;
use tarpatch::{ActionKind, PlannedEntry, TransformReport};

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats a dry-run listing
    fn format_plan(&self, entries: &[PlannedEntry]) -> String;

    /// Formats the result of a rewrite
    fn format_report(&self, report: &TransformReport, output: &Path) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_plan(&self, entries: &[PlannedEntry]) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{:>10} {:>5} {:>12} {}\n",
            "Action", "Rule", "Size", "Name"
        ));
        output.push_str(&"-".repeat(70));
        output.push('\n');

        let mut changed = 0;
        for entry in entries {
            if entry.action != ActionKind::Copy {
                changed += 1;
            }
            let rule = entry
                .rule_index
                .map(|i| format!("#{}", i))
                .unwrap_or_else(|| "-".to_string());
            let action = format!("{:>10}", entry.action);
            let action = match entry.action {
                ActionKind::Copy => style(action).dim(),
                ActionKind::Suppress => style(action).red(),
                ActionKind::JsonPatch | ActionKind::JsonEdit => style(action).yellow(),
                ActionKind::Custom => style(action).cyan(),
            };

            output.push_str(&format!(
                "{} {:>5} {:>12} {}{}\n",
                action,
                rule,
                format_bytes_iec(entry.size),
                entry.path,
                type_suffix(entry.entry_type)
            ));
        }

        output.push_str(&"-".repeat(70));
        output.push('\n');
        output.push_str(&format!(
            "{} entries, {} changed\n",
            entries.len(),
            changed
        ));

        output
    }

    fn format_report(&self, report: &TransformReport, output: &Path) -> String {
        let mut text = format!(
            "{} {}\n",
            style("Wrote").green().bold(),
            output.display()
        );
        text.push_str(&format!("  Entries:   {}\n", report.total_entries()));
        text.push_str(&format!("  Copied:    {}\n", report.entries_copied));
        text.push_str(&format!("  Rewritten: {}\n", report.entries_rewritten));
        text.push_str(&format!("  Dropped:   {}\n", report.entries_suppressed));
        if report.entries_custom > 0 {
            text.push_str(&format!("  Custom:    {}\n", report.entries_custom));
        }
        text.push_str(&format!(
            "  Size:      {} -> {}\n",
            format_bytes_iec(report.bytes_read),
            format_bytes_iec(report.bytes_written)
        ));
        text
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_plan(&self, entries: &[PlannedEntry]) -> String {
        let json_entries: Vec<_> = entries
            .iter()
            .map(|e| {
                json!({
                    "path": e.path,
                    "size": e.size,
                    "type": type_name(e.entry_type),
                    "rule": e.rule_index,
                    "action": e.action.to_string(),
                })
            })
            .collect();

        serde_json::to_string_pretty(&json!({ "entries": json_entries }))
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }

    fn format_report(&self, report: &TransformReport, output: &Path) -> String {
        let value = json!({
            "output": output.display().to_string(),
            "entries": report.total_entries(),
            "copied": report.entries_copied,
            "rewritten": report.entries_rewritten,
            "suppressed": report.entries_suppressed,
            "custom": report.entries_custom,
            "bytes_read": report.bytes_read,
            "bytes_written": report.bytes_written,
        });

        serde_json::to_string_pretty(&value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

/// Creates a formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}

fn type_name(entry_type: EntryType) -> &'static str {
    match entry_type {
        EntryType::Regular | EntryType::Continuous => "file",
        EntryType::Directory => "directory",
        EntryType::Symlink => "symlink",
        EntryType::Link => "hardlink",
        _ => "other",
    }
}

fn type_suffix(entry_type: EntryType) -> &'static str {
    match entry_type {
        EntryType::Directory => "/",
        EntryType::Symlink => "@",
        EntryType::Link => "=",
        _ => "",
    }
}
