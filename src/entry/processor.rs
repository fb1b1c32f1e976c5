//! The per-entry processor.

use std::io::Read;

use serde_json::Value;

use super::EntryMeta;
use super::context::{ArchiveSink, EntryContext, copy_entry, drain, emit_bytes};
use crate::config::Indent;
use crate::rule::{Action, ActionKind, HeaderDecision, Rule, RuleMatch};
use crate::{Error, Result};

/// What happened to one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Written unchanged.
    Copied {
        /// Content size in bytes.
        size: u64,
    },
    /// Drained and left out of the output.
    Suppressed {
        /// Content size in bytes.
        size: u64,
    },
    /// Re-encoded JSON written with a new size.
    Rewritten {
        /// The JSON action that produced the content.
        action: ActionKind,
        /// Size of the original content.
        old_size: u64,
        /// Size of the written content.
        new_size: u64,
    },
    /// Handled by a custom handler.
    Custom {
        /// Whether the handler produced output.
        written: bool,
    },
}

impl EntryOutcome {
    /// Returns the action that was actually applied.
    pub fn action_kind(&self) -> ActionKind {
        match self {
            EntryOutcome::Copied { .. } => ActionKind::Copy,
            EntryOutcome::Suppressed { .. } => ActionKind::Suppress,
            EntryOutcome::Rewritten { action, .. } => *action,
            EntryOutcome::Custom { .. } => ActionKind::Custom,
        }
    }
}

/// Returns the action `process` would apply, without touching content.
///
/// The header hook, if any, runs against a copy of `meta`.
pub(crate) fn effective_kind(meta: &EntryMeta, matched: RuleMatch<'_>) -> ActionKind {
    let Some(rule) = matched.rule() else {
        return ActionKind::Copy;
    };
    if let Some(hook) = rule.header_hook() {
        if hook(&mut meta.clone()) == HeaderDecision::Suppress {
            return ActionKind::Suppress;
        }
    }
    resolve(rule, meta).kind()
}

static COPY: Action = Action::Copy;

/// JSON actions only apply to regular files; other entry types pass through.
fn resolve<'r>(rule: &'r Rule, meta: &EntryMeta) -> &'r Action {
    match rule.action() {
        Action::JsonPatch(_) | Action::JsonEdit(_) if !meta.is_file() => {
            log::debug!(
                "'{}' is not a regular file, copying instead of {}",
                meta.path(),
                rule.action().kind()
            );
            &COPY
        }
        action => action,
    }
}

/// Runs the matched rule on one entry.
///
/// `content` is consumed completely before this returns, whatever the
/// action, so the archive reader can move on to the next header.
pub(crate) fn process(
    mut meta: EntryMeta,
    content: &mut dyn Read,
    matched: RuleMatch<'_>,
    output: &mut dyn ArchiveSink,
    indent: &Indent,
) -> Result<EntryOutcome> {
    let Some(rule) = matched.rule() else {
        copy_entry(&meta, content, output)?;
        return Ok(EntryOutcome::Copied { size: meta.size() });
    };

    if let Some(hook) = rule.header_hook() {
        if hook(&mut meta) == HeaderDecision::Suppress {
            log::debug!("header hook dropped '{}'", meta.path());
            let size = drain(content)?;
            return Ok(EntryOutcome::Suppressed { size });
        }
    }

    match resolve(rule, &meta) {
        Action::Copy => {
            copy_entry(&meta, content, output)?;
            Ok(EntryOutcome::Copied { size: meta.size() })
        }
        Action::Suppress => {
            let size = drain(content)?;
            Ok(EntryOutcome::Suppressed { size })
        }
        Action::JsonPatch(patch) => {
            rewrite_json(&meta, content, output, indent, ActionKind::JsonPatch, |doc| {
                patch.apply(doc)
            })
        }
        Action::JsonEdit(edit) => {
            rewrite_json(&meta, content, output, indent, ActionKind::JsonEdit, |doc| {
                edit(doc)
            })
        }
        Action::Custom(handler) => {
            let mut ctx = EntryContext::new(&mut meta, content, output, indent);
            handler.handle(&mut ctx)?;
            let written = ctx.finish()?;
            Ok(EntryOutcome::Custom { written })
        }
    }
}

fn rewrite_json(
    meta: &EntryMeta,
    content: &mut dyn Read,
    output: &mut dyn ArchiveSink,
    indent: &Indent,
    action: ActionKind,
    edit: impl FnOnce(&mut Value),
) -> Result<EntryOutcome> {
    let mut raw = Vec::new();
    content
        .read_to_end(&mut raw)
        .map_err(|e| Error::source_read(None, e))?;

    let mut document: Value =
        serde_json::from_slice(&raw).map_err(|source| Error::MalformedJson {
            entry: meta.path().to_string(),
            source,
        })?;
    edit(&mut document);

    let encoded = indent
        .encode(&document)
        .map_err(|e| Error::output_write(None, e.into()))?;
    emit_bytes(meta, &encoded, output)?;

    log::debug!(
        "rewrote '{}' ({} -> {} bytes)",
        meta.path(),
        raw.len(),
        encoded.len()
    );
    Ok(EntryOutcome::Rewritten {
        action,
        old_size: raw.len() as u64,
        new_size: encoded.len() as u64,
    })
}
