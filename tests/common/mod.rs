//! Shared test utilities for integration tests.
//!
//! Archives are built with the `tar` and `flate2` crates directly, so the
//! fixtures do not depend on the code under test.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tar::{EntryType, Header};

/// Default mtime for fixture entries.
pub const MTIME: u64 = 1_700_000_000;

/// One entry of a fixture archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub path: String,
    pub entry_type: EntryType,
    pub mode: u32,
    pub mtime: u64,
    pub link_name: Option<String>,
    pub data: Vec<u8>,
}

impl Fixture {
    /// A regular file with mode 0644.
    pub fn file(path: &str, data: &[u8]) -> Self {
        Self {
            path: path.to_string(),
            entry_type: EntryType::Regular,
            mode: 0o644,
            mtime: MTIME,
            link_name: None,
            data: data.to_vec(),
        }
    }

    /// A directory with mode 0755.
    pub fn dir(path: &str) -> Self {
        Self {
            path: path.to_string(),
            entry_type: EntryType::Directory,
            mode: 0o755,
            mtime: MTIME,
            link_name: None,
            data: Vec::new(),
        }
    }

    /// A symlink pointing at `target`.
    pub fn symlink(path: &str, target: &str) -> Self {
        Self {
            path: path.to_string(),
            entry_type: EntryType::Symlink,
            mode: 0o777,
            mtime: MTIME,
            link_name: Some(target.to_string()),
            data: Vec::new(),
        }
    }

    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn mtime(mut self, mtime: u64) -> Self {
        self.mtime = mtime;
        self
    }
}

/// Builds a plain tar stream.
pub fn tar_bytes(entries: &[Fixture]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for entry in entries {
        let mut header = Header::new_gnu();
        header.set_entry_type(entry.entry_type);
        header.set_mode(entry.mode);
        header.set_mtime(entry.mtime);
        header.set_size(entry.data.len() as u64);
        match &entry.link_name {
            Some(target) => builder
                .append_link(&mut header, &entry.path, target)
                .expect("append link"),
            None => builder
                .append_data(&mut header, &entry.path, entry.data.as_slice())
                .expect("append entry"),
        }
    }
    builder.into_inner().expect("finish tar")
}

/// Builds a plain tar stream whose names are raw bytes, bypassing any UTF-8
/// handling in the writer. `link` entries become symlinks.
pub fn raw_tar_bytes(entries: &[(&[u8], Option<&[u8]>, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, link, data) in entries {
        let mut header = Header::new_old();
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        if let Some(target) = link {
            header.as_old_mut().linkname[..target.len()].copy_from_slice(target);
            header.set_entry_type(EntryType::Symlink);
        } else {
            header.set_entry_type(EntryType::Regular);
        }
        header.set_mode(0o644);
        header.set_mtime(MTIME);
        header.set_size(data.len() as u64);
        header.set_cksum();
        builder.append(&header, *data).expect("append raw entry");
    }
    builder.into_inner().expect("finish tar")
}

/// Raw entry names and link targets of a tar or tar.gz stream.
pub fn raw_names(data: &[u8]) -> Vec<(Vec<u8>, Option<Vec<u8>>)> {
    let reader: Box<dyn Read + '_> = if data.starts_with(&[0x1f, 0x8b]) {
        Box::new(MultiGzDecoder::new(data))
    } else {
        Box::new(data)
    };
    let mut archive = tar::Archive::new(reader);
    archive
        .entries()
        .expect("read entries")
        .map(|entry| {
            let entry = entry.expect("read entry");
            (
                entry.path_bytes().into_owned(),
                entry.link_name_bytes().map(|l| l.into_owned()),
            )
        })
        .collect()
}

/// Builds a gzip-wrapped tar stream.
pub fn tgz_bytes(entries: &[Fixture]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes(entries)).expect("compress");
    encoder.finish().expect("finish gzip")
}

/// Shorthand for regular files only.
pub fn files(entries: &[(&str, &[u8])]) -> Vec<Fixture> {
    entries.iter().map(|(p, d)| Fixture::file(p, d)).collect()
}

/// Writes a `.tgz` fixture into `dir`.
pub fn write_tgz(dir: &Path, name: &str, entries: &[Fixture]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, tgz_bytes(entries)).expect("write fixture");
    path
}

/// Reads every entry of a tar or tar.gz stream.
pub fn read_bytes(data: &[u8]) -> Vec<Fixture> {
    let reader: Box<dyn Read + '_> = if data.starts_with(&[0x1f, 0x8b]) {
        Box::new(MultiGzDecoder::new(data))
    } else {
        Box::new(data)
    };
    let mut archive = tar::Archive::new(reader);
    archive
        .entries()
        .expect("read entries")
        .map(|entry| {
            let mut entry = entry.expect("read entry");
            let path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let link_name = entry
                .link_name_bytes()
                .map(|l| String::from_utf8_lossy(&l).into_owned());
            let header = entry.header();
            let entry_type = header.entry_type();
            let mode = header.mode().expect("mode");
            let mtime = header.mtime().expect("mtime");
            let mut data = Vec::new();
            entry.read_to_end(&mut data).expect("read content");
            Fixture {
                path,
                entry_type,
                mode,
                mtime,
                link_name,
                data,
            }
        })
        .collect()
}

/// Reads every entry of an archive file.
pub fn read_archive(path: &Path) -> Vec<Fixture> {
    read_bytes(&fs::read(path).expect("read archive"))
}

/// Entry paths of an archive file, in order.
pub fn entry_names(path: &Path) -> Vec<String> {
    read_archive(path).into_iter().map(|e| e.path).collect()
}

/// Content of one entry, panicking if it is missing.
pub fn entry_data(path: &Path, name: &str) -> Vec<u8> {
    read_archive(path)
        .into_iter()
        .find(|e| e.path == name)
        .unwrap_or_else(|| panic!("entry '{}' missing", name))
        .data
}

/// Lists the file names in `dir`.
pub fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
