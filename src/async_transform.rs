//! Async wrappers around the blocking engine.
//!
//! The engine itself is synchronous; these functions move a run onto
//! tokio's blocking pool and resolve once it reaches its terminal state.
//!
//! ```rust,no_run
//! use tarpatch::{Rule, TransformConfig, transform_async};
//!
//! # async fn run() -> tarpatch::Result<()> {
//! let config = TransformConfig::new("pkg.tgz", "pkg.tgz")
//!     .rule(Rule::json_patch(["package/package.json"], ["scripts"])?);
//! let report = transform_async(config).await?;
//! println!("{} entries", report.total_entries());
//! # Ok(())
//! # }
//! ```

use crate::config::TransformConfig;
use crate::transform::{PlannedEntry, TransformReport};
use crate::{Error, Result};

/// Runs [`transform`](crate::transform) on the blocking thread pool.
///
/// A panic inside the run is reported as [`Error::Io`].
pub async fn transform_async(config: TransformConfig) -> Result<TransformReport> {
    tokio::task::spawn_blocking(move || crate::transform(&config))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
}

/// Runs [`plan`](crate::plan) on the blocking thread pool.
pub async fn plan_async(config: TransformConfig) -> Result<Vec<PlannedEntry>> {
    tokio::task::spawn_blocking(move || crate::plan(&config))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
}
