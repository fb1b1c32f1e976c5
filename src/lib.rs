//! # tarpatch
//!
//! Streaming rewrites of tar and tar.gz archives.
//!
//! This crate reads an archive entry by entry, decides for each entry what
//! to do with it from an ordered list of glob-selected rules, and writes a
//! new archive: entries are copied unchanged, dropped, or have their JSON
//! content patched. Only one entry is in memory at a time, and the output
//! path is replaced atomically once the new archive is complete.
//!
//! A typical use is cleaning up an npm tarball before publishing: stripping
//! `scripts` and `devDependencies` from `package/package.json` and dropping
//! stray log files, without unpacking anything to disk.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tarpatch::{Rule, TransformConfig, transform};
//!
//! fn main() -> tarpatch::Result<()> {
//!     let config = TransformConfig::new("pkg-1.0.0.tgz", "pkg-1.0.0.tgz")
//!         .rule(Rule::suppress(["**/*.log", "**/.DS_Store"])?)
//!         .rule(Rule::json_patch(
//!             ["package/package.json"],
//!             ["scripts", "devDependencies"],
//!         )?);
//!
//!     let report = transform(&config)?;
//!     println!(
//!         "{} entries, {} rewritten, {} dropped",
//!         report.total_entries(),
//!         report.entries_rewritten,
//!         report.entries_suppressed
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Rules
//!
//! Rules are checked in order and the first one whose patterns accept an
//! entry path wins. Entries no rule selects are copied unchanged.
//!
//! | Action | Effect |
//! |--------|--------|
//! | [`Action::Copy`] | Stream the entry through unchanged |
//! | [`Action::Suppress`] | Leave the entry out |
//! | [`Action::JsonPatch`] | Delete and set dotted paths in a JSON entry |
//! | [`Action::JsonEdit`] | Edit a JSON entry with a closure |
//! | [`Action::Custom`] | Hand the entry to an [`EntryHandler`](entry::EntryHandler) |
//!
//! Patches address nested values with dotted paths such as
//! `publishConfig.access` or `files.0`:
//!
//! ```rust
//! use tarpatch::{Action, Rule};
//! use tarpatch::patch::JsonPatch;
//!
//! let patch = JsonPatch::new()
//!     .remove("scripts")
//!     .replace("publishConfig.access", "public");
//! let rule = Rule::matching(["package/package.json"], Action::JsonPatch(patch))?;
//! # Ok::<(), tarpatch::Error>(())
//! ```
//!
//! Rules can also be loaded from JSON with [`RuleSpec`].
//!
//! ## Streams
//!
//! [`transform_stream`] runs the same per-entry loop over any reader and
//! writer, without temp files. [`plan`] lists what a run would do.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `async` | No | [`transform_async`] on tokio's blocking pool |
//! | `cli` | No | The `tarpatch` command-line tool |
//!
//! ## Logging
//!
//! The library logs through the [`log`] facade and never installs a logger.
//! Run starts, rule decisions and the final swap are logged at `debug`,
//! phase transitions at `trace`, and cleanup failures at `warn`.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod codec;
pub mod config;
pub mod entry;
pub mod error;
pub mod patch;
pub mod pipeline;
pub mod progress;
pub mod rule;
pub mod transform;

#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub mod async_transform;

pub use error::{Error, Result};

// Re-export configuration
pub use config::{Indent, OutputCompression, PipelineConfig, TransformConfig, TransformOptions};

// Re-export rules
pub use rule::{
    Action, ActionKind, ActionSpec, HeaderDecision, PatternSet, Rule, RuleMatch, RuleSpec,
    match_rule,
};

// Re-export the engine
pub use transform::{PlannedEntry, TransformReport, plan, plan_stream, transform, transform_stream};

// Re-export progress API
pub use progress::{NoProgress, Phase, StatisticsProgress, TransformProgress, progress_fn};

#[cfg(feature = "async")]
pub use async_transform::{plan_async, transform_async};
