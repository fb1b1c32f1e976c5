//! Threaded decompression and compression stages.
//!
//! With [`PipelineConfig::enabled`] set, inflating the input and deflating
//! the output each run on a named thread of their own, connected to the
//! entry loop by bounded channels. A full channel blocks its sender, so a
//! slow stage stalls the ones feeding it instead of buffering without
//! bound. Only bytes cross the channels; entries are still processed one at
//! a time on the calling thread.
//!
//! Both threads are scoped: they borrow the caller's reader and writer and
//! are joined before the surrounding [`std::thread::scope`] returns.

use std::io::{self, Read, Write};
use std::mem;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread::{self, Scope, ScopedJoinHandle};

use crate::codec::{InputDecoder, OutputEncoder};
use crate::config::PipelineConfig;

const INFLATE_THREAD: &str = "tarpatch-inflate";
const DEFLATE_THREAD: &str = "tarpatch-deflate";

/// Reading end of the inflate stage.
///
/// Dropping it makes the producer's next send fail, which stops the thread.
pub struct ChannelReader {
    rx: Receiver<io::Result<Vec<u8>>>,
    chunk: Vec<u8>,
    pos: usize,
    done: bool,
}

impl ChannelReader {
    fn new(rx: Receiver<io::Result<Vec<u8>>>) -> Self {
        Self {
            rx,
            chunk: Vec::new(),
            pos: 0,
            done: false,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos == self.chunk.len() {
            if self.done {
                return Ok(0);
            }
            match self.rx.recv() {
                Ok(Ok(chunk)) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Ok(Err(e)) => {
                    self.done = true;
                    return Err(e);
                }
                // Sender dropped: the stage reached end of input.
                Err(_) => self.done = true,
            }
        }
        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Spawns the inflate stage, reading `source` in `chunk_size` pieces.
pub fn spawn_reader<'scope, R>(
    scope: &'scope Scope<'scope, '_>,
    mut source: R,
    chunk_size: usize,
    depth: usize,
) -> io::Result<ChannelReader>
where
    R: Read + Send + 'scope,
{
    let (tx, rx) = sync_channel::<io::Result<Vec<u8>>>(depth);
    thread::Builder::new()
        .name(INFLATE_THREAD.to_string())
        .spawn_scoped(scope, move || {
            loop {
                let mut chunk = vec![0u8; chunk_size];
                match source.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        chunk.truncate(n);
                        if tx.send(Ok(chunk)).is_err() {
                            log::trace!("{} consumer went away", INFLATE_THREAD);
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
        })?;
    Ok(ChannelReader::new(rx))
}

/// Writing end of the deflate stage.
///
/// Bytes are batched into `chunk_size` pieces before they are sent. When
/// the stage thread has failed, writes report the thread's own error rather
/// than a bare broken pipe.
pub struct ChannelWriter<'scope, W> {
    tx: Option<SyncSender<Vec<u8>>>,
    buf: Vec<u8>,
    chunk_size: usize,
    handle: Option<ScopedJoinHandle<'scope, io::Result<W>>>,
}

impl<'scope, W> ChannelWriter<'scope, W> {
    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = mem::replace(&mut self.buf, Vec::with_capacity(self.chunk_size));
        let sent = match &self.tx {
            Some(tx) => tx.send(chunk).is_ok(),
            None => false,
        };
        if sent { Ok(()) } else { Err(self.stage_error()) }
    }

    /// Joins the stage after it stopped early and returns why it stopped.
    fn stage_error(&mut self) -> io::Error {
        self.tx = None;
        match self.handle.take().map(ScopedJoinHandle::join) {
            Some(Ok(Err(e))) => e,
            Some(Err(_)) => io::Error::other(format!("{} panicked", DEFLATE_THREAD)),
            Some(Ok(Ok(_))) | None => io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("{} stopped early", DEFLATE_THREAD),
            ),
        }
    }

    /// Sends buffered bytes, closes the channel and joins the stage.
    ///
    /// Returns the underlying writer once the compressor has been finished.
    pub fn finish(mut self) -> io::Result<W> {
        self.send_buffered()?;
        self.tx = None;
        match self.handle.take().map(ScopedJoinHandle::join) {
            Some(Ok(result)) => result,
            Some(Err(_)) => Err(io::Error::other(format!("{} panicked", DEFLATE_THREAD))),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("{} already stopped", DEFLATE_THREAD),
            )),
        }
    }
}

impl<W> Write for ChannelWriter<'_, W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        if self.buf.len() >= self.chunk_size {
            self.send_buffered()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

/// Spawns the deflate stage, which owns `encoder` until the channel closes.
pub fn spawn_writer<'scope, W>(
    scope: &'scope Scope<'scope, '_>,
    mut encoder: OutputEncoder<W>,
    chunk_size: usize,
    depth: usize,
) -> io::Result<ChannelWriter<'scope, W>>
where
    W: Write + Send + 'scope,
{
    let (tx, rx) = sync_channel::<Vec<u8>>(depth);
    let handle = thread::Builder::new()
        .name(DEFLATE_THREAD.to_string())
        .spawn_scoped(scope, move || -> io::Result<W> {
            for chunk in rx {
                encoder.write_all(&chunk)?;
            }
            encoder.finish()
        })?;
    Ok(ChannelWriter {
        tx: Some(tx),
        buf: Vec::with_capacity(chunk_size),
        chunk_size,
        handle: Some(handle),
    })
}

/// The input chain, inline or threaded.
pub(crate) enum InputStage<R: Read> {
    Inline(InputDecoder<R>),
    Threaded(ChannelReader),
}

impl<R: Read + Send> InputStage<R> {
    pub(crate) fn open<'scope>(
        scope: &'scope Scope<'scope, '_>,
        reader: R,
        config: &PipelineConfig,
    ) -> io::Result<Self>
    where
        R: 'scope,
    {
        let decoder = InputDecoder::sniff(reader)?;
        if !config.enabled {
            return Ok(InputStage::Inline(decoder));
        }
        spawn_reader(scope, decoder, config.chunk_size, config.depth).map(InputStage::Threaded)
    }
}

impl<R: Read> Read for InputStage<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            InputStage::Inline(decoder) => decoder.read(buf),
            InputStage::Threaded(reader) => reader.read(buf),
        }
    }
}

/// The output chain, inline or threaded.
pub(crate) enum OutputStage<'scope, W: Write> {
    Inline(OutputEncoder<W>),
    Threaded(ChannelWriter<'scope, W>),
}

impl<'scope, W: Write + Send + 'scope> OutputStage<'scope, W> {
    pub(crate) fn open(
        scope: &'scope Scope<'scope, '_>,
        writer: W,
        level: Option<u32>,
        config: &PipelineConfig,
    ) -> io::Result<Self> {
        let encoder = OutputEncoder::new(writer, level);
        if !config.enabled {
            return Ok(OutputStage::Inline(encoder));
        }
        spawn_writer(scope, encoder, config.chunk_size, config.depth).map(OutputStage::Threaded)
    }

    /// Finishes compression and returns the underlying writer.
    pub(crate) fn finish(self) -> io::Result<W> {
        match self {
            OutputStage::Inline(encoder) => encoder.finish(),
            OutputStage::Threaded(writer) => writer.finish(),
        }
    }
}

impl<W: Write> Write for OutputStage<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputStage::Inline(encoder) => encoder.write(buf),
            OutputStage::Threaded(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputStage::Inline(encoder) => encoder.flush(),
            OutputStage::Threaded(writer) => writer.flush(),
        }
    }
}
