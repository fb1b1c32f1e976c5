//! Read/write capability handed to custom entry handlers.

use std::io::{self, Read};
use std::path::Path;

use serde_json::Value;
use tar::Header;

use super::EntryMeta;
use crate::config::Indent;
use crate::{Error, Result};

/// Output side of the entry processor.
///
/// Implemented by [`tar::Builder`]; the processor only ever appends.
pub(crate) trait ArchiveSink {
    fn append_data(&mut self, header: &mut Header, path: &Path, data: &mut dyn Read)
    -> io::Result<()>;

    fn append_link(&mut self, header: &mut Header, path: &Path, target: &Path) -> io::Result<()>;
}

impl<W: io::Write> ArchiveSink for tar::Builder<W> {
    fn append_data(
        &mut self,
        header: &mut Header,
        path: &Path,
        data: &mut dyn Read,
    ) -> io::Result<()> {
        tar::Builder::append_data(self, header, path, data)
    }

    fn append_link(&mut self, header: &mut Header, path: &Path, target: &Path) -> io::Result<()> {
        tar::Builder::append_link(self, header, path, target)
    }
}

/// Reader wrapper that remembers whether the underlying read failed.
///
/// [`tar::Builder`] reports read and write failures through the same
/// `io::Error`; this tells them apart afterwards. Content that ends before
/// `expected` bytes is reported as a read failure, since the header already
/// promised that many.
pub(crate) struct TrackedReader<'a> {
    inner: &'a mut dyn Read,
    remaining: u64,
    failed: bool,
}

impl<'a> TrackedReader<'a> {
    pub(crate) fn new(inner: &'a mut dyn Read, expected: u64) -> Self {
        Self {
            inner,
            remaining: expected,
            failed: false,
        }
    }

    /// Maps a failed append to the side it came from.
    pub(crate) fn attribute(&self, err: io::Error) -> Error {
        if self.failed {
            Error::source_read(None, err)
        } else {
            Error::output_write(None, err)
        }
    }
}

impl Read for TrackedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf).inspect_err(|_| self.failed = true)?;
        if n == 0 && self.remaining > 0 && !buf.is_empty() {
            self.failed = true;
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("entry content ended {} bytes early", self.remaining),
            ));
        }
        self.remaining = self.remaining.saturating_sub(n as u64);
        Ok(n)
    }
}

/// Streams an entry to the output with its header unchanged.
pub(crate) fn copy_entry(
    meta: &EntryMeta,
    input: &mut dyn Read,
    output: &mut dyn ArchiveSink,
) -> Result<()> {
    if meta.is_link() {
        if let Some(target) = meta.output_link_name() {
            let mut header = meta.output_header(0);
            return output
                .append_link(&mut header, &meta.output_path(), &target)
                .map_err(|e| Error::output_write(None, e));
        }
    }
    let mut header = meta.output_header(meta.size());
    let mut tracked = TrackedReader::new(input, meta.size());
    output
        .append_data(&mut header, &meta.output_path(), &mut tracked)
        .map_err(|e| tracked.attribute(e))
}

/// Writes `data` as the entry's new content, with the size updated.
pub(crate) fn emit_bytes(meta: &EntryMeta, data: &[u8], output: &mut dyn ArchiveSink) -> Result<()> {
    let mut header = meta.output_header(data.len() as u64);
    let mut body = data;
    output
        .append_data(&mut header, &meta.output_path(), &mut body)
        .map_err(|e| Error::output_write(None, e))
}

/// Reads and discards whatever content is left.
pub(crate) fn drain(input: &mut dyn Read) -> Result<u64> {
    io::copy(input, &mut io::sink()).map_err(|e| Error::source_read(None, e))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputSlot {
    Open,
    Written,
    Skipped,
}

/// Per-entry access for an [`EntryHandler`](super::EntryHandler).
///
/// The content can be consumed once, by one of the `read_*` methods or by
/// [`copy_through`](Self::copy_through). The output can be produced once, by
/// a `write_*` method, by `copy_through`, or declined with
/// [`skip`](Self::skip). A second attempt to produce output fails with
/// [`Error::EntryAlreadyWritten`].
pub struct EntryContext<'e, 'o> {
    meta: &'e mut EntryMeta,
    input: Option<&'e mut dyn Read>,
    output: &'o mut dyn ArchiveSink,
    indent: &'o Indent,
    slot: OutputSlot,
}

impl<'e, 'o> EntryContext<'e, 'o> {
    pub(crate) fn new(
        meta: &'e mut EntryMeta,
        input: &'e mut dyn Read,
        output: &'o mut dyn ArchiveSink,
        indent: &'o Indent,
    ) -> Self {
        Self {
            meta,
            input: Some(input),
            output,
            indent,
            slot: OutputSlot::Open,
        }
    }

    /// Returns the entry metadata.
    pub fn meta(&self) -> &EntryMeta {
        self.meta
    }

    /// Returns the entry metadata for editing before the entry is written.
    pub fn meta_mut(&mut self) -> &mut EntryMeta {
        self.meta
    }

    /// Returns the entry path.
    pub fn path(&self) -> &str {
        self.meta.path()
    }

    /// Returns whether output has been produced for this entry.
    pub fn is_written(&self) -> bool {
        self.slot == OutputSlot::Written
    }

    fn take_input(&mut self) -> Result<&'e mut dyn Read> {
        match self.input.take() {
            Some(input) => Ok(input),
            None => Err(Error::handler(
                self.meta.path(),
                "entry content was already consumed",
            )),
        }
    }

    fn claim_output(&mut self, slot: OutputSlot) -> Result<()> {
        if self.slot != OutputSlot::Open {
            return Err(Error::EntryAlreadyWritten {
                entry: self.meta.path().to_string(),
            });
        }
        self.slot = slot;
        Ok(())
    }

    /// Reads the whole content.
    pub fn read_data(&mut self) -> Result<Vec<u8>> {
        let input = self.take_input()?;
        let mut data = Vec::new();
        input
            .read_to_end(&mut data)
            .map_err(|e| Error::source_read(None, e))?;
        Ok(data)
    }

    /// Reads the whole content as UTF-8 text.
    pub fn read_text(&mut self) -> Result<String> {
        let data = self.read_data()?;
        String::from_utf8(data).map_err(|_| Error::handler(self.meta.path(), "content is not valid UTF-8"))
    }

    /// Reads the whole content as a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedJson`] if the content does not parse.
    pub fn read_json(&mut self) -> Result<Value> {
        let data = self.read_data()?;
        serde_json::from_slice(&data).map_err(|source| Error::MalformedJson {
            entry: self.meta.path().to_string(),
            source,
        })
    }

    /// Writes `data` as the entry content.
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.claim_output(OutputSlot::Written)?;
        emit_bytes(self.meta, data, self.output)
    }

    /// Writes `text` as the entry content.
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        self.write_data(text.as_bytes())
    }

    /// Writes `value` with the configured indentation.
    pub fn write_json(&mut self, value: &Value) -> Result<()> {
        let encoded = self
            .indent
            .encode(value)
            .map_err(|e| Error::output_write(None, e.into()))?;
        self.write_data(&encoded)
    }

    /// Streams the content through unchanged, with the current metadata.
    pub fn copy_through(&mut self) -> Result<()> {
        self.claim_output(OutputSlot::Written)?;
        let input = self.take_input()?;
        copy_entry(self.meta, input, self.output)
    }

    /// Leaves the entry out of the output.
    pub fn skip(&mut self) -> Result<()> {
        self.claim_output(OutputSlot::Skipped)
    }

    /// Drains unread content and reports whether output was produced.
    pub(crate) fn finish(mut self) -> Result<bool> {
        if let Some(input) = self.input.take() {
            drain(input)?;
        }
        Ok(self.is_written())
    }
}
