//! File-to-file runs: temp output, atomic swap and cleanup.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::Path;

use super::engine::{StreamPaths, run_entries};
use super::{RunState, TransformReport};
use crate::config::TransformConfig;
use crate::progress::Phase;
use crate::{Error, Result};

/// Rewrites `config.input` into `config.output`.
///
/// The new archive is written to [`TransformConfig::temp_path`] and only
/// moved over the output once it is complete. On any error the temp file
/// is removed and the output path is left as it was, except for
/// [`Error::Finalize`], where the finished temp file is kept.
///
/// Input and output may be the same path. Input removal is skipped in that
/// case, whatever the configuration says.
pub fn transform(config: &TransformConfig) -> Result<TransformReport> {
    let temp = config.temp_path();
    let same_file = is_same_file(&config.input, &config.output);
    let mut run = RunState::new(config.options.progress.as_ref());
    log::debug!(
        "transform '{}' -> '{}' with {} rule(s)",
        config.input.display(),
        config.output.display(),
        config.rules.len()
    );

    let result = write_temp(config, &temp, &mut run).and_then(|report| {
        commit(config, &temp, same_file)?;
        Ok(report)
    });

    match result {
        Ok(report) => {
            run.advance(Phase::Done);
            Ok(report)
        }
        Err(err) => {
            log::debug!("transform aborted: {}", err);
            run.advance(Phase::Aborted);
            cleanup(config, &temp, same_file, &err);
            Err(err)
        }
    }
}

fn write_temp(config: &TransformConfig, temp: &Path, run: &mut RunState<'_>) -> Result<TransformReport> {
    config.options.pipeline.validate()?;

    let input = File::open(&config.input).map_err(|e| Error::source_read(Some(&config.input), e))?;
    let file = File::create(temp).map_err(|e| Error::output_write(Some(temp), e))?;
    let level = config.options.compression.level_for(Some(&config.output));
    let paths = StreamPaths {
        input: Some(&config.input),
        output: Some(temp),
    };

    let (report, writer) = run_entries(
        input,
        BufWriter::new(file),
        &config.rules,
        &config.options,
        level,
        paths,
        run,
    )?;

    let file = writer
        .into_inner()
        .map_err(|e| Error::output_write(Some(temp), e.into_error()))?;
    file.sync_all()
        .map_err(|e| Error::output_write(Some(temp), e))?;
    Ok(report)
}

/// Moves the temp file over the output, then removes the input if asked.
fn commit(config: &TransformConfig, temp: &Path, same_file: bool) -> Result<()> {
    let output = config.output.as_path();
    let finalize_error = |source: io::Error| Error::Finalize {
        temp: temp.to_path_buf(),
        output: output.to_path_buf(),
        source,
    };

    log::debug!("moving '{}' into place at '{}'", temp.display(), output.display());
    if let Err(first) = fs::rename(temp, output) {
        if !output.exists() {
            return Err(finalize_error(first));
        }
        log::debug!("rename failed ({}), replacing '{}'", first, output.display());
        fs::remove_file(output)
            .and_then(|()| fs::rename(temp, output))
            .map_err(finalize_error)?;
    }

    if config.remove_input_on_success {
        if same_file {
            log::debug!("input is the output, not removing it");
        } else {
            remove_quietly(&config.input);
        }
    }
    Ok(())
}

fn cleanup(config: &TransformConfig, temp: &Path, same_file: bool, err: &Error) {
    if let Error::Finalize { temp, .. } = err {
        log::warn!("completed archive left at '{}'", temp.display());
    } else {
        remove_quietly(temp);
    }

    if config.remove_input_on_abort && !err.is_config_error() {
        if same_file {
            log::debug!("input is the output, not removing it");
        } else {
            remove_quietly(&config.input);
        }
    }
}

/// Removes `path`, logging instead of failing. A missing file is fine.
fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::debug!("removed '{}'", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("failed to remove '{}': {}", path.display(), e),
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_same_file_detection() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.tgz");
        fs::write(&file, b"x").unwrap();
        let dotted = dir.path().join(".").join("a.tgz");

        assert!(is_same_file(&file, &dotted));
        assert!(!is_same_file(&file, &dir.path().join("b.tgz")));
    }

    #[test]
    fn test_commit_replaces_existing_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.tgz");
        let output = dir.path().join("out.tgz");
        fs::write(&input, b"in").unwrap();
        fs::write(&output, b"old").unwrap();

        let config = TransformConfig::new(&input, &output).remove_input_on_success(true);
        let temp = config.temp_path();
        fs::write(&temp, b"new").unwrap();

        commit(&config, &temp, false).unwrap();
        assert_eq!(fs::read(&output).unwrap(), b"new");
        assert!(!temp.exists());
        assert!(!input.exists());
    }

    #[test]
    fn test_commit_missing_temp_is_finalize_error() {
        let dir = TempDir::new().unwrap();
        let config = TransformConfig::new(dir.path().join("in"), dir.path().join("out"));
        let err = commit(&config, &config.temp_path(), false).unwrap_err();
        assert!(matches!(err, Error::Finalize { .. }));
    }

    #[test]
    fn test_cleanup_keeps_temp_after_finalize_error() {
        let dir = TempDir::new().unwrap();
        let config = TransformConfig::new(dir.path().join("in"), dir.path().join("out"));
        let temp = config.temp_path();
        fs::write(&temp, b"done").unwrap();

        let err = Error::Finalize {
            temp: temp.clone(),
            output: config.output.clone(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        cleanup(&config, &temp, false, &err);
        assert!(temp.exists());

        cleanup(&config, &temp, false, &Error::Io(io::Error::other("x")));
        assert!(!temp.exists());
    }

    #[test]
    fn test_cleanup_input_removal_rules() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.tgz");
        fs::write(&input, b"in").unwrap();
        let config = TransformConfig::new(&input, dir.path().join("out.tgz"))
            .remove_input_on_abort(true);
        let temp = config.temp_path();

        cleanup(&config, &temp, true, &Error::Io(io::Error::other("x")));
        assert!(input.exists(), "same-file input must survive");

        cleanup(&config, &temp, false, &Error::InvalidConfig("bad".into()));
        assert!(input.exists(), "config errors never touch the input");

        cleanup(&config, &temp, false, &Error::Io(io::Error::other("x")));
        assert!(!input.exists());
    }
}
