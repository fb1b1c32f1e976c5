//! Entry processing rules.
//!
//! A [`Rule`] pairs an optional [`PatternSet`] with the [`Action`] to take
//! for entries it selects. Rules are checked in declaration order and the
//! first match wins (see [`match_rule`]); entries no rule selects are copied
//! unchanged.
//!
//! # Example
//!
//! ```rust
//! use tarpatch::{Action, Rule};
//! use tarpatch::patch::JsonPatch;
//!
//! let rules = vec![
//!     Rule::suppress(["**/*.log", "**/.DS_Store"])?,
//!     Rule::matching(
//!         ["package/package.json"],
//!         Action::JsonPatch(JsonPatch::new().remove("scripts").remove("devDependencies")),
//!     )?,
//! ];
//! # Ok::<(), tarpatch::Error>(())
//! ```

mod matcher;
mod pattern;
mod spec;

pub use matcher::{RuleMatch, match_rule};
pub use pattern::PatternSet;
pub use spec::{ActionSpec, RuleSpec};

use std::sync::Arc;

use serde_json::Value;

use crate::Result;
use crate::entry::{EntryHandler, EntryMeta};
use crate::patch::JsonPatch;

/// Callback that edits a decoded JSON document in place.
pub type JsonEditFn = Arc<dyn Fn(&mut Value) + Send + Sync>;

/// Callback run on an entry's header before its action.
pub type HeaderHook = Arc<dyn Fn(&mut EntryMeta) -> HeaderDecision + Send + Sync>;

/// What a [`HeaderHook`] decided for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderDecision {
    /// Continue with the rule's action using the (possibly edited) header.
    Keep,
    /// Drop the entry from the output.
    Suppress,
}

/// What to do with a matched entry.
#[derive(Clone)]
pub enum Action {
    /// Stream the entry through unchanged.
    Copy,
    /// Drain the entry and leave it out of the output.
    Suppress,
    /// Decode as JSON, apply the patch, re-encode.
    JsonPatch(JsonPatch),
    /// Decode as JSON, hand the document to a callback, re-encode.
    JsonEdit(JsonEditFn),
    /// Delegate the whole entry to a handler.
    Custom(Arc<dyn EntryHandler>),
}

impl Action {
    /// Returns the kind of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Copy => ActionKind::Copy,
            Action::Suppress => ActionKind::Suppress,
            Action::JsonPatch(_) => ActionKind::JsonPatch,
            Action::JsonEdit(_) => ActionKind::JsonEdit,
            Action::Custom(_) => ActionKind::Custom,
        }
    }

    /// Creates a [`Action::JsonEdit`] from a closure.
    pub fn json_edit<F>(edit: F) -> Self
    where
        F: Fn(&mut Value) + Send + Sync + 'static,
    {
        Action::JsonEdit(Arc::new(edit))
    }

    /// Creates a [`Action::Custom`] from a handler.
    pub fn custom<H>(handler: H) -> Self
    where
        H: EntryHandler + 'static,
    {
        Action::Custom(Arc::new(handler))
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::JsonPatch(patch) => f.debug_tuple("JsonPatch").field(patch).finish(),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Field-less view of [`Action`], used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// See [`Action::Copy`].
    Copy,
    /// See [`Action::Suppress`].
    Suppress,
    /// See [`Action::JsonPatch`].
    JsonPatch,
    /// See [`Action::JsonEdit`].
    JsonEdit,
    /// See [`Action::Custom`].
    Custom,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::Copy => "copy",
            Self::Suppress => "suppress",
            Self::JsonPatch => "json-patch",
            Self::JsonEdit => "json-edit",
            Self::Custom => "custom",
        })
    }
}

/// A pattern-selected processing rule.
#[derive(Clone)]
pub struct Rule {
    patterns: Option<PatternSet>,
    action: Action,
    header_hook: Option<HeaderHook>,
}

impl Rule {
    /// Creates a rule that applies to every entry.
    pub fn new(action: Action) -> Self {
        Self {
            patterns: None,
            action,
            header_hook: None,
        }
    }

    /// Creates a rule that applies to entries selected by `patterns`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`](crate::Error::InvalidPattern) if a
    /// pattern does not compile.
    pub fn matching<I, S>(patterns: I, action: Action) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            patterns: Some(PatternSet::new(patterns)?),
            action,
            header_hook: None,
        })
    }

    /// Creates a rule that drops entries selected by `patterns`.
    pub fn suppress<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::matching(patterns, Action::Suppress)
    }

    /// Creates a rule that deletes `remove` paths from matching JSON entries.
    pub fn json_patch<I, S, R, P>(patterns: I, remove: R) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        R: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let patch = remove
            .into_iter()
            .fold(JsonPatch::new(), |patch, path| patch.remove(path));
        Self::matching(patterns, Action::JsonPatch(patch))
    }

    /// Attaches a header hook, run before the action.
    ///
    /// The hook may rename the entry or change its mode, or return
    /// [`HeaderDecision::Suppress`] to drop it.
    pub fn with_header_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut EntryMeta) -> HeaderDecision + Send + Sync + 'static,
    {
        self.header_hook = Some(Arc::new(hook));
        self
    }

    /// Returns whether this rule selects `entry_name`.
    pub fn matches(&self, entry_name: &str) -> bool {
        self.patterns
            .as_ref()
            .is_none_or(|patterns| patterns.matches(entry_name))
    }

    /// Returns the pattern set, or `None` if the rule matches everything.
    pub fn patterns(&self) -> Option<&PatternSet> {
        self.patterns.as_ref()
    }

    /// Returns the action.
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Returns the header hook, if any.
    pub fn header_hook(&self) -> Option<&HeaderHook> {
        self.header_hook.as_ref()
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field(
                "patterns",
                &self.patterns.as_ref().map(|p| p.sources().collect::<Vec<_>>()),
            )
            .field("action", &self.action)
            .field("header_hook", &self.header_hook.is_some())
            .finish()
    }
}
