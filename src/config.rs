//! Configuration for transform runs.
//!
//! [`TransformConfig`] describes one file-to-file run; [`TransformOptions`]
//! holds the knobs shared with the stream-level API.
//!
//! # Example
//!
//! ```rust
//! use tarpatch::{Indent, OutputCompression, Rule, TransformConfig, TransformOptions};
//!
//! let options = TransformOptions::new()
//!     .indent(Indent::Spaces(4))
//!     .compression(OutputCompression::Gzip(9));
//!
//! let config = TransformConfig::new("pkg-1.0.0.tgz", "pkg-1.0.0.tgz")
//!     .rule(Rule::suppress(["**/*.map"])?)
//!     .options(options);
//! # Ok::<(), tarpatch::Error>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::progress::TransformProgress;
use crate::rule::Rule;
use crate::{Error, Result};

/// Longest indentation JSON re-encoding will use, in spaces or characters.
pub const MAX_INDENT: usize = 10;

/// Indentation used when re-encoding JSON entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Indent {
    /// Indent with this many spaces; `0` produces compact output.
    Spaces(u8),
    /// Indent with this literal string; empty produces compact output.
    Text(String),
}

impl Default for Indent {
    fn default() -> Self {
        Indent::Spaces(2)
    }
}

impl Indent {
    /// Returns the indentation unit, or `None` for compact output.
    ///
    /// Both forms are capped at [`MAX_INDENT`].
    pub fn unit(&self) -> Option<String> {
        let unit: String = match self {
            Indent::Spaces(n) => " ".repeat(usize::from(*n).min(MAX_INDENT)),
            Indent::Text(text) => text.chars().take(MAX_INDENT).collect(),
        };
        (!unit.is_empty()).then_some(unit)
    }

    /// Encodes `value` with this indentation.
    pub fn encode(&self, value: &Value) -> serde_json::Result<Vec<u8>> {
        let Some(unit) = self.unit() else {
            return serde_json::to_vec(value);
        };
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(unit.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        value.serialize(&mut serializer)?;
        Ok(out)
    }
}

/// Default gzip level for output archives.
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

/// How the output tar stream is wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCompression {
    /// Gzip with the given level (0-9).
    Gzip(u32),
    /// Plain, uncompressed tar.
    None,
    /// Gzip at the default level for `.tgz`/`.gz` outputs, plain tar otherwise.
    Auto,
}

impl Default for OutputCompression {
    fn default() -> Self {
        OutputCompression::Gzip(DEFAULT_GZIP_LEVEL)
    }
}

impl OutputCompression {
    /// Resolves [`OutputCompression::Auto`] against an output path.
    ///
    /// Returns the gzip level to use, or `None` for a plain tar.
    pub fn level_for(&self, output: Option<&Path>) -> Option<u32> {
        match self {
            OutputCompression::Gzip(level) => Some((*level).min(9)),
            OutputCompression::None => None,
            OutputCompression::Auto => {
                let ext = output
                    .and_then(Path::extension)
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase);
                match ext.as_deref() {
                    Some("tgz") | Some("gz") => Some(DEFAULT_GZIP_LEVEL),
                    _ => None,
                }
            }
        }
    }
}

/// Settings for the threaded decompression and compression stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Run decompression and compression on their own threads.
    ///
    /// Default: true.
    pub enabled: bool,

    /// Size of the chunks passed between stages (bytes).
    ///
    /// Default: 64 KiB.
    pub chunk_size: usize,

    /// Number of chunks a channel holds before the sender blocks.
    ///
    /// Default: 8.
    pub depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chunk_size: 64 * 1024, // 64 KiB
            depth: 8,
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration that runs every stage on the calling thread.
    pub fn inline() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Sets the chunk size.
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Sets the channel depth.
    pub fn depth(mut self, chunks: usize) -> Self {
        self.depth = chunks;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.enabled && (self.depth == 0 || self.chunk_size == 0) {
            return Err(Error::InvalidConfig(
                "pipeline depth and chunk size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Shared handle to a progress observer.
pub type SharedProgress = Arc<Mutex<dyn TransformProgress>>;

/// Options shared by [`transform`](crate::transform) and
/// [`transform_stream`](crate::transform_stream).
#[derive(Clone, Default)]
pub struct TransformOptions {
    /// Indentation for re-encoded JSON entries.
    pub indent: Indent,
    /// Output wrapping.
    pub compression: OutputCompression,
    /// Stage threading.
    pub pipeline: PipelineConfig,
    /// Optional progress observer.
    pub progress: Option<SharedProgress>,
}

impl TransformOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the JSON indentation.
    pub fn indent(mut self, indent: Indent) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the output compression.
    pub fn compression(mut self, compression: OutputCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the pipeline configuration.
    pub fn pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Installs a progress observer.
    pub fn progress<P>(mut self, progress: P) -> Self
    where
        P: TransformProgress + 'static,
    {
        self.progress = Some(Arc::new(Mutex::new(progress)));
        self
    }

    /// Installs an already shared progress observer.
    pub fn shared_progress(mut self, progress: SharedProgress) -> Self {
        self.progress = Some(progress);
        self
    }
}

impl std::fmt::Debug for TransformOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformOptions")
            .field("indent", &self.indent)
            .field("compression", &self.compression)
            .field("pipeline", &self.pipeline)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// A complete file-to-file transform run.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// Archive to read.
    pub input: PathBuf,
    /// Path the rewritten archive is moved to on success.
    pub output: PathBuf,
    /// Rules, checked in order; unmatched entries are copied.
    pub rules: Vec<Rule>,
    /// Delete the input after a successful run.
    pub remove_input_on_success: bool,
    /// Delete the input after a failed run.
    pub remove_input_on_abort: bool,
    /// Encoding and pipeline options.
    pub options: TransformOptions,
}

impl TransformConfig {
    /// Creates a configuration with no rules.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            rules: Vec::new(),
            remove_input_on_success: false,
            remove_input_on_abort: false,
            options: TransformOptions::default(),
        }
    }

    /// Appends a rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Appends several rules.
    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Sets whether the input is deleted after a successful run.
    pub fn remove_input_on_success(mut self, remove: bool) -> Self {
        self.remove_input_on_success = remove;
        self
    }

    /// Sets whether the input is deleted after a failed run.
    pub fn remove_input_on_abort(mut self, remove: bool) -> Self {
        self.remove_input_on_abort = remove;
        self
    }

    /// Sets the transform options.
    pub fn options(mut self, options: TransformOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the temporary path the archive is written to before the swap.
    ///
    /// The file sits next to the output so the final rename stays on one
    /// filesystem: `pkg.tgz` is staged as `pkg.tgz.tmp.tgz`.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self.output.as_os_str().to_os_string();
        name.push(".tmp");
        if let Some(ext) = self.output.extension() {
            name.push(".");
            name.push(ext);
        }
        PathBuf::from(name)
    }
}
