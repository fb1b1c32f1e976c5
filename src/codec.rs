//! Input sniffing, gzip wrapping and byte counting.
//!
//! The input side accepts both gzip-wrapped and plain tar streams; the first
//! two bytes decide which. The output side wraps the tar stream according to
//! [`OutputCompression`](crate::OutputCompression).

use std::io::{self, BufRead, BufReader, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

/// Magic bytes at the start of every gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A byte total that can be shared with pipeline threads.
#[derive(Debug, Clone, Default)]
pub struct ByteCounter(Arc<AtomicU64>);

impl ByteCounter {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current total.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn add(&self, n: usize) {
        self.0.fetch_add(n as u64, Ordering::Relaxed);
    }
}

/// Reader adapter that counts the bytes passing through it.
pub struct CountingReader<R> {
    inner: R,
    counter: ByteCounter,
}

impl<R> CountingReader<R> {
    /// Wraps `inner`, adding every byte read to `counter`.
    pub fn new(inner: R, counter: ByteCounter) -> Self {
        Self { inner, counter }
    }

    /// Consumes the wrapper and returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.add(n);
        Ok(n)
    }
}

/// Writer adapter that counts the bytes passing through it.
pub struct CountingWriter<W> {
    inner: W,
    counter: ByteCounter,
}

impl<W> CountingWriter<W> {
    /// Wraps `inner`, adding every byte written to `counter`.
    pub fn new(inner: W, counter: ByteCounter) -> Self {
        Self { inner, counter }
    }

    /// Consumes the wrapper and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.counter.add(n);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Decompressing reader chosen by sniffing the stream head.
pub enum InputDecoder<R: Read> {
    /// Gzip stream; concatenated members are read through.
    Gzip(MultiGzDecoder<BufReader<R>>),
    /// Anything else, handed to the tar reader as is.
    Plain(BufReader<R>),
}

impl<R: Read> InputDecoder<R> {
    /// Sniffs `reader` and wraps it in the matching decoder.
    ///
    /// Nothing is consumed from the stream by the sniff itself.
    pub fn sniff(reader: R) -> io::Result<Self> {
        let mut reader = BufReader::new(reader);
        let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
        log::debug!("input is {}", if is_gzip { "gzip" } else { "plain tar" });
        Ok(if is_gzip {
            InputDecoder::Gzip(MultiGzDecoder::new(reader))
        } else {
            InputDecoder::Plain(reader)
        })
    }

    /// Returns whether the input was gzip-wrapped.
    pub fn is_gzip(&self) -> bool {
        matches!(self, InputDecoder::Gzip(_))
    }
}

impl<R: Read> Read for InputDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            InputDecoder::Gzip(decoder) => decoder.read(buf),
            InputDecoder::Plain(reader) => reader.read(buf),
        }
    }
}

/// Compressing writer for the output tar stream.
pub enum OutputEncoder<W: Write> {
    /// Gzip at a fixed level.
    Gzip(GzEncoder<W>),
    /// Plain tar.
    Plain(W),
}

impl<W: Write> OutputEncoder<W> {
    /// Wraps `writer` in gzip at `level`, or passes it through for `None`.
    pub fn new(writer: W, level: Option<u32>) -> Self {
        match level {
            Some(level) => OutputEncoder::Gzip(GzEncoder::new(writer, Compression::new(level))),
            None => OutputEncoder::Plain(writer),
        }
    }

    /// Writes the gzip trailer, flushes, and returns the underlying writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            OutputEncoder::Gzip(encoder) => {
                let mut inner = encoder.finish()?;
                inner.flush()?;
                Ok(inner)
            }
            OutputEncoder::Plain(mut inner) => {
                inner.flush()?;
                Ok(inner)
            }
        }
    }
}

impl<W: Write> Write for OutputEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputEncoder::Gzip(encoder) => encoder.write(buf),
            OutputEncoder::Plain(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputEncoder::Gzip(encoder) => encoder.flush(),
            OutputEncoder::Plain(writer) => writer.flush(),
        }
    }
}
