//! Per-entry metadata, handler hooks and the entry processor.
//!
//! Every archive entry passes through the entry processor once, with its
//! content readable exactly once. Built-in actions are handled
//! there; [`Action::Custom`](crate::Action::Custom) hands an
//! [`EntryContext`] to an [`EntryHandler`] instead.

mod context;
mod processor;

pub use context::EntryContext;
pub use processor::EntryOutcome;

pub(crate) use processor::{effective_kind, process};

use std::borrow::Cow;
use std::io::{self, Read};
use std::path::Path;

use tar::{EntryType, Header};

use crate::Result;

/// Header fields of one archive entry.
///
/// The path is the full entry path, with GNU long names and PAX paths
/// already resolved. Only the path and the mode can be edited; the size is
/// managed by the writer.
///
/// Names are kept as the raw bytes read from the archive and written back
/// unchanged. [`path`](Self::path) and [`link_name`](Self::link_name) are
/// UTF-8 views used for matching and messages.
#[derive(Debug, Clone)]
pub struct EntryMeta {
    header: Header,
    path: String,
    path_bytes: Vec<u8>,
    link_name: Option<String>,
    link_name_bytes: Option<Vec<u8>>,
    size: u64,
    mode: u32,
    mtime: u64,
}

impl EntryMeta {
    /// Creates metadata from a raw header and an entry path.
    ///
    /// Mode and mtime fields that do not parse are read as zero.
    pub fn new(header: Header, path: impl Into<String>) -> Self {
        let size = header.size().unwrap_or(0);
        let mode = header.mode().unwrap_or(0);
        let mtime = header.mtime().unwrap_or(0);
        let link_name_bytes = header.link_name_bytes().map(Cow::into_owned);
        let path = path.into();
        Self {
            header,
            path_bytes: path.clone().into_bytes(),
            path,
            link_name: link_name_bytes.as_deref().map(lossy),
            link_name_bytes,
            size,
            mode,
            mtime,
        }
    }

    pub(crate) fn from_entry<R: Read>(entry: &tar::Entry<'_, R>) -> io::Result<Self> {
        let header = entry.header().clone();
        let mode = header.mode()?;
        let mtime = header.mtime()?;
        let path_bytes = entry.path_bytes().into_owned();
        let link_name_bytes = entry.link_name_bytes().map(Cow::into_owned);
        Ok(Self {
            path: lossy(&path_bytes),
            path_bytes,
            link_name: link_name_bytes.as_deref().map(lossy),
            link_name_bytes,
            size: entry.size(),
            mode,
            mtime,
            header,
        })
    }

    /// Returns the entry path inside the archive.
    ///
    /// Bytes that are not valid UTF-8 show up as U+FFFD here; see
    /// [`path_bytes`](Self::path_bytes) for the name as stored.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the entry path exactly as stored in the archive.
    pub fn path_bytes(&self) -> &[u8] {
        &self.path_bytes
    }

    /// Renames the entry.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
        self.path_bytes = self.path.clone().into_bytes();
    }

    /// Returns the content size recorded for the entry.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the permission bits.
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Changes the permission bits.
    pub fn set_mode(&mut self, mode: u32) {
        self.mode = mode;
        self.header.set_mode(mode);
    }

    /// Returns the modification time in seconds since the Unix epoch.
    pub fn mtime(&self) -> u64 {
        self.mtime
    }

    /// Returns the entry type.
    pub fn entry_type(&self) -> EntryType {
        self.header.entry_type()
    }

    /// Returns whether this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self.entry_type(), EntryType::Regular | EntryType::Continuous)
    }

    /// Returns whether this is a symbolic or hard link.
    pub fn is_link(&self) -> bool {
        let ty = self.entry_type();
        ty.is_symlink() || ty.is_hard_link()
    }

    /// Returns the link target for links.
    pub fn link_name(&self) -> Option<&str> {
        self.link_name.as_deref()
    }

    /// Returns the link target exactly as stored in the archive.
    pub fn link_name_bytes(&self) -> Option<&[u8]> {
        self.link_name_bytes.as_deref()
    }

    /// Returns the underlying header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns a header ready to be written with a body of `size` bytes.
    pub(crate) fn output_header(&self, size: u64) -> Header {
        let mut header = self.header.clone();
        header.set_size(size);
        header
    }

    /// Returns the path to hand to the archive writer.
    pub(crate) fn output_path(&self) -> Cow<'_, Path> {
        bytes_to_path(&self.path_bytes)
    }

    pub(crate) fn output_link_name(&self) -> Option<Cow<'_, Path>> {
        self.link_name_bytes.as_deref().map(bytes_to_path)
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(unix)]
fn bytes_to_path(bytes: &[u8]) -> Cow<'_, Path> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    Cow::Borrowed(Path::new(OsStr::from_bytes(bytes)))
}

// Other platforms cannot carry arbitrary bytes in a path.
#[cfg(not(unix))]
fn bytes_to_path(bytes: &[u8]) -> Cow<'_, Path> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(Path::new(s)),
        Err(_) => Cow::Owned(lossy(bytes).into()),
    }
}

/// Code run for entries selected by an [`Action::Custom`](crate::Action::Custom) rule.
///
/// The handler gets exclusive access to the entry until it returns; the next
/// entry is not read before then. Content the handler leaves unread is
/// drained afterwards, and an entry the handler never writes is left out of
/// the output.
///
/// Closures of the matching shape implement this trait:
///
/// ```rust
/// use tarpatch::{Action, Rule};
/// use tarpatch::entry::EntryContext;
///
/// let upper = Rule::matching(["**/*.txt"], Action::custom(|ctx: &mut EntryContext<'_, '_>| {
///     let text = ctx.read_text()?;
///     ctx.write_text(&text.to_uppercase())
/// }))?;
/// # Ok::<(), tarpatch::Error>(())
/// ```
pub trait EntryHandler: Send + Sync {
    /// Processes one entry.
    fn handle(&self, ctx: &mut EntryContext<'_, '_>) -> Result<()>;
}

impl<F> EntryHandler for F
where
    F: Fn(&mut EntryContext<'_, '_>) -> Result<()> + Send + Sync,
{
    fn handle(&self, ctx: &mut EntryContext<'_, '_>) -> Result<()> {
        self(ctx)
    }
}
