//! File access used by the repeater: size queries, first-line reads,
//! appends and truncation. Kept behind a trait so the core loop can run
//! against an in-memory store in tests.
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

pub trait FileStore {
    /// On-disk byte length of the file.
    fn size(&self, path: &Path) -> io::Result<u64>;

    /// Bytes up to and including the first `\n`, or the whole content when
    /// there is no terminator. The whole file must be UTF-8; fails with
    /// `InvalidData` otherwise.
    fn read_first_line(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Append `bytes` to the end of an existing file.
    fn append(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Cut the file down to zero bytes. The file keeps existing.
    fn truncate(&mut self, path: &Path) -> io::Result<()>;
}

/// `FileStore` backed by the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskStore;

impl FileStore for DiskStore {
    fn size(&self, path: &Path) -> io::Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }

    fn read_first_line(&self, path: &Path) -> io::Result<Vec<u8>> {
        first_line(&std::fs::read(path)?)
    }

    fn append(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(path)?;
        file.write_all(bytes)?;
        file.flush()
    }

    fn truncate(&mut self, path: &Path) -> io::Result<()> {
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(0)
    }
}

/// Validate `content` as UTF-8 and cut it after the first `\n`.
pub(crate) fn first_line(content: &[u8]) -> io::Result<Vec<u8>> {
    let text =
        std::str::from_utf8(content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let end = text.find('\n').map_or(text.len(), |i| i + 1);
    Ok(text.as_bytes()[..end].to_vec())
}
