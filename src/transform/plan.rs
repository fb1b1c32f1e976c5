//! Dry runs.

use std::fs::File;
use std::io::Read;

use tar::EntryType;

use crate::codec::InputDecoder;
use crate::config::TransformConfig;
use crate::entry::{EntryMeta, effective_kind};
use crate::rule::{ActionKind, Rule, match_rule};
use crate::{Error, Result};

/// What a transform would do with one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    /// Entry path inside the archive.
    pub path: String,
    /// Content size in bytes.
    pub size: u64,
    /// Entry type from the header.
    pub entry_type: EntryType,
    /// Index of the matching rule, or `None` for the implicit copy.
    pub rule_index: Option<usize>,
    /// The action that would be applied.
    pub action: ActionKind,
}

/// Lists the entries of `config.input` with the action each would get.
///
/// Nothing is written. Header hooks are run against copies of the entry
/// metadata so that hooks which drop entries are reported as
/// [`ActionKind::Suppress`]. Content is never decoded, so malformed JSON is
/// not detected here.
pub fn plan(config: &TransformConfig) -> Result<Vec<PlannedEntry>> {
    let input = File::open(&config.input).map_err(|e| Error::source_read(Some(&config.input), e))?;
    plan_stream(input, &config.rules).map_err(|e| e.with_paths(Some(&config.input), None))
}

/// Stream form of [`plan`].
pub fn plan_stream<R: Read>(reader: R, rules: &[Rule]) -> Result<Vec<PlannedEntry>> {
    let decoder = InputDecoder::sniff(reader).map_err(|e| Error::source_read(None, e))?;
    let mut archive = tar::Archive::new(decoder);
    let mut planned = Vec::new();

    for entry in archive.entries().map_err(|e| Error::source_read(None, e))? {
        let entry = entry.map_err(|e| Error::source_read(None, e))?;
        let meta = EntryMeta::from_entry(&entry).map_err(|e| Error::source_read(None, e))?;
        let matched = match_rule(meta.path(), rules);
        planned.push(PlannedEntry {
            path: meta.path().to_string(),
            size: meta.size(),
            entry_type: meta.entry_type(),
            rule_index: matched.index(),
            action: effective_kind(&meta, matched),
        });
    }

    Ok(planned)
}
