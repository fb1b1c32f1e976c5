//! The per-entry loop shared by file and stream transforms.

use std::io::{self, Read, Write};
use std::path::Path;
use std::thread;

use super::{RunState, TransformReport};
use crate::codec::{ByteCounter, CountingReader, CountingWriter};
use crate::config::{Indent, TransformOptions};
use crate::entry::{EntryMeta, process};
use crate::pipeline::{InputStage, OutputStage};
use crate::progress::Phase;
use crate::rule::{Rule, match_rule};
use crate::{Error, Result};

/// Paths reported in errors; `None` when streaming.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StreamPaths<'a> {
    pub(crate) input: Option<&'a Path>,
    pub(crate) output: Option<&'a Path>,
}

/// Rewrites a tar stream from `reader` into `writer`.
///
/// The input may be gzip-wrapped or plain; the output is wrapped according
/// to [`TransformOptions::compression`], with `Auto` meaning plain since
/// there is no file name to go by. Nothing is written to any file system
/// path and no finalize step runs.
///
/// # Errors
///
/// Stops at the first fatal error. What was already written to `writer` is
/// an incomplete archive and should be discarded.
///
/// # Example
///
/// ```rust
/// use tarpatch::{Rule, TransformOptions, transform_stream};
///
/// let mut input = tar::Builder::new(Vec::new());
/// let mut header = tar::Header::new_gnu();
/// header.set_size(3);
/// header.set_mode(0o644);
/// input.append_data(&mut header, "debug.log", &b"abc"[..])?;
/// let input = input.into_inner()?;
///
/// let mut output = Vec::new();
/// let report = transform_stream(
///     &input[..],
///     &mut output,
///     &[Rule::suppress(["*.log"])?],
///     &TransformOptions::new(),
/// )?;
/// assert_eq!(report.entries_suppressed, 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn transform_stream<R, W>(
    reader: R,
    writer: W,
    rules: &[Rule],
    options: &TransformOptions,
) -> Result<TransformReport>
where
    R: Read + Send,
    W: Write + Send,
{
    let mut run = RunState::new(options.progress.as_ref());
    log::debug!("stream transform with {} rule(s)", rules.len());

    let level = options.compression.level_for(None);
    let result = options.pipeline.validate().and_then(|()| {
        run_entries(
            reader,
            writer,
            rules,
            options,
            level,
            StreamPaths::default(),
            &mut run,
        )
    });

    match result {
        Ok((report, _)) => {
            run.advance(Phase::Done);
            Ok(report)
        }
        Err(err) => {
            log::debug!("stream transform aborted: {}", err);
            run.advance(Phase::Aborted);
            Err(err)
        }
    }
}

/// Runs the full decode, process, encode chain and returns the writer.
///
/// On success the run is left in [`Phase::Finalizing`] with the compressor
/// finished and `writer` flushed.
pub(crate) fn run_entries<R, W>(
    reader: R,
    writer: W,
    rules: &[Rule],
    options: &TransformOptions,
    level: Option<u32>,
    paths: StreamPaths<'_>,
    run: &mut RunState<'_>,
) -> Result<(TransformReport, W)>
where
    R: Read + Send,
    W: Write + Send,
{
    let read_count = ByteCounter::new();
    let write_count = ByteCounter::new();
    let pipeline = &options.pipeline;

    let (mut report, writer) = thread::scope(|scope| -> Result<(TransformReport, W)> {
        let source = CountingReader::new(reader, read_count.clone());
        let input = InputStage::open(scope, source, pipeline)
            .map_err(|e| Error::source_read(paths.input, e))?;
        let sink = CountingWriter::new(writer, write_count.clone());
        let output = OutputStage::open(scope, sink, level, pipeline)
            .map_err(|e| Error::output_write(paths.output, e))?;

        let mut archive = tar::Archive::new(input);
        let mut builder = tar::Builder::new(output);
        let report = process_entries(&mut archive, &mut builder, rules, &options.indent, run)
            .map_err(|e| e.with_paths(paths.input, paths.output))?;

        // Read past the end-of-archive blocks so the gzip trailer is checked
        io::copy(&mut archive.into_inner(), &mut io::sink())
            .map_err(|e| Error::source_read(paths.input, e))?;

        run.advance(Phase::Finalizing);
        let sink = builder
            .into_inner()
            .and_then(OutputStage::finish)
            .map_err(|e| Error::output_write(paths.output, e))?;
        Ok((report, sink.into_inner()))
    })?;

    report.bytes_read = read_count.get();
    report.bytes_written = write_count.get();
    log::debug!(
        "{} entries, {} bytes in, {} bytes out",
        report.total_entries(),
        report.bytes_read,
        report.bytes_written
    );
    Ok((report, writer))
}

fn process_entries<R: Read, W: Write>(
    archive: &mut tar::Archive<R>,
    builder: &mut tar::Builder<W>,
    rules: &[Rule],
    indent: &Indent,
    run: &mut RunState<'_>,
) -> Result<TransformReport> {
    let mut report = TransformReport::default();
    run.advance(Phase::Extracting);

    for entry in archive.entries().map_err(|e| Error::source_read(None, e))? {
        let mut entry = entry.map_err(|e| Error::source_read(None, e))?;
        let meta = EntryMeta::from_entry(&entry).map_err(|e| Error::source_read(None, e))?;
        let name = meta.path().to_string();
        run.entry_start(&name, meta.size());

        run.advance(Phase::Matching);
        let matched = match_rule(&name, rules);
        match matched.rule() {
            Some(rule) => log::debug!(
                "'{}' matched rule #{} ({})",
                name,
                matched.index().unwrap_or_default(),
                rule.action().kind()
            ),
            None => log::debug!("'{}' matched no rule, copying", name),
        }

        run.advance(Phase::Processing);
        let outcome = process(meta, &mut entry, matched, builder, indent)?;
        report.record(&outcome);
        run.entry_complete(&name, outcome.action_kind());
        run.advance(Phase::Extracting);
    }

    Ok(report)
}
