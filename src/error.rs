//! Error types for archive transform operations.
//!
//! This module provides the [`Error`] enum which represents every fatal
//! failure of a transform run, along with a convenient [`Result<T>`] type
//! alias.
//!
//! # Error Handling
//!
//! A transform run stops at the first fatal error and reports exactly that
//! error. Problems that are absorbed locally, such as a malformed dotted
//! path in a patch, never show up here.
//!
//! ```rust,no_run
//! use tarpatch::{Error, Rule, TransformConfig, transform};
//!
//! fn rewrite(input: &str, output: &str) -> tarpatch::Result<()> {
//!     let config = TransformConfig::new(input, output)
//!         .rule(Rule::json_patch(["package/package.json"], ["scripts"])?);
//!
//!     match transform(&config) {
//!         Ok(report) => {
//!             println!("{} entries processed", report.total_entries());
//!             Ok(())
//!         }
//!         Err(Error::MalformedJson { entry, .. }) => {
//!             eprintln!("{} is not valid JSON", entry);
//!             Ok(())
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// Helper struct for formatting an optional path suffix.
struct PathSuffix<'a>(Option<&'a Path>);

impl std::fmt::Display for PathSuffix<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(path) => write!(f, " '{}'", path.display()),
            None => Ok(()),
        }
    }
}

/// The main error type for archive transform operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | Source | [`SourceRead`][Self::SourceRead] | Missing input, corrupt gzip or tar data |
/// | Content | [`MalformedJson`][Self::MalformedJson], [`Handler`][Self::Handler] | Entry content a rule could not process |
/// | Output | [`OutputWrite`][Self::OutputWrite], [`Finalize`][Self::Finalize] | Disk full, permissions |
/// | Configuration | [`InvalidPattern`][Self::InvalidPattern], [`InvalidConfig`][Self::InvalidConfig] | Bad rules or options |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The input archive could not be read.
    ///
    /// Covers a missing or unreadable input file as well as a corrupt gzip
    /// or tar stream discovered while demultiplexing entries.
    #[error("failed to read source archive{}: {source}", PathSuffix(path.as_deref()))]
    SourceRead {
        /// The input path, when reading from a file.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A JSON-mode entry did not contain valid UTF-8 JSON.
    ///
    /// This is never recovered: the whole transform is aborted.
    #[error("entry '{entry}' is not valid JSON: {source}")]
    MalformedJson {
        /// Path of the offending entry inside the archive.
        entry: String,
        /// The decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// Writing or compressing the output stream failed.
    #[error("failed to write output archive{}: {source}", PathSuffix(path.as_deref()))]
    OutputWrite {
        /// The temporary output path, when writing to a file.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The final atomic replace of the output path failed.
    ///
    /// The fully written temporary file is left in place so the caller can
    /// inspect it or retry the rename. The declared output path is untouched.
    #[error(
        "failed to move '{}' into place at '{}': {source}",
        temp.display(),
        output.display()
    )]
    Finalize {
        /// The completed temporary archive.
        temp: PathBuf,
        /// The declared output path.
        output: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A glob pattern in a rule could not be compiled.
    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as written.
        pattern: String,
        /// Description of why the pattern is invalid.
        reason: String,
    },

    /// The transform configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A custom handler tried to emit a second output for one entry.
    #[error("entry '{entry}' was already written to the output archive")]
    EntryAlreadyWritten {
        /// Path of the entry inside the archive.
        entry: String,
    },

    /// A custom handler reported a failure.
    #[error("handler failed for entry '{entry}': {message}")]
    Handler {
        /// Path of the entry inside the archive.
        entry: String,
        /// Handler-supplied description.
        message: String,
    },

    /// An I/O error outside the archive streams themselves.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Returns `true` if the error originates from the input side.
    pub fn is_source_error(&self) -> bool {
        matches!(self, Error::SourceRead { .. })
    }

    /// Returns `true` if the error was raised before any archive I/O.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidPattern { .. } | Error::InvalidConfig(_)
        )
    }

    /// Returns the archive entry associated with this error, if any.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tarpatch::Error;
    ///
    /// fn log_error(error: &Error) {
    ///     if let Some(name) = error.entry_name() {
    ///         eprintln!("error in '{}': {}", name, error);
    ///     }
    /// }
    /// ```
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Error::MalformedJson { entry, .. } => Some(entry.as_str()),
            Error::EntryAlreadyWritten { entry } => Some(entry.as_str()),
            Error::Handler { entry, .. } => Some(entry.as_str()),
            _ => None,
        }
    }

    /// Creates a Handler error.
    ///
    /// Convenience constructor for custom [`EntryHandler`] implementations.
    ///
    /// [`EntryHandler`]: crate::entry::EntryHandler
    pub fn handler(entry: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Handler {
            entry: entry.into(),
            message: message.into(),
        }
    }

    pub(crate) fn source_read(path: Option<&Path>, source: io::Error) -> Self {
        Error::SourceRead {
            path: path.map(Path::to_path_buf),
            source,
        }
    }

    pub(crate) fn output_write(path: Option<&Path>, source: io::Error) -> Self {
        Error::OutputWrite {
            path: path.map(Path::to_path_buf),
            source,
        }
    }

    /// Fills in stream paths that were not known where the error was raised.
    pub(crate) fn with_paths(self, input: Option<&Path>, output: Option<&Path>) -> Self {
        match self {
            Error::SourceRead { path: None, source } => Error::source_read(input, source),
            Error::OutputWrite { path: None, source } => Error::output_write(output, source),
            other => other,
        }
    }
}

/// A specialized Result type for transform operations.
pub type Result<T> = std::result::Result<T, Error>;
