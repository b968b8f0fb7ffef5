//! Address-anchored access to a flat container image (a ROM dump).
//!
//! ```no_run
//! use romtex::container::{ContainerImage, ContainerWriter};
//!
//! // Read
//! let rom = ContainerImage::open("game.z64")?;
//! let raw = rom.block(0xA0, 256)?;
//!
//! // Patch in place
//! let mut w = ContainerWriter::open("game.z64")?;
//! w.write_block(0xA0, raw)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! No header is interpreted.  The only check is that every byte range lies
//! inside the file; a writer never grows or shrinks the container.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Range 0x{address:X}+{length} exceeds container size {size}")]
    OutOfRange { address: u64, length: usize, size: u64 },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

fn check_range(address: u64, length: usize, size: u64) -> Result<(), ContainerError> {
    match address.checked_add(length as u64) {
        Some(end) if end <= size => Ok(()),
        _ => Err(ContainerError::OutOfRange { address, length, size }),
    }
}

// ── ContainerImage ───────────────────────────────────────────────────────────

/// Immutable in-memory copy of a container, shared freely across threads.
#[derive(Debug, Clone)]
pub struct ContainerImage {
    path:  Option<PathBuf>,
    bytes: Vec<u8>,
}

impl ContainerImage {
    /// Read the whole file.  The file itself is only opened for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ContainerError> {
        let path = path.as_ref().to_owned();
        let bytes = std::fs::read(&path)?;
        tracing::debug!("Loaded container {:?} ({} bytes)", path, bytes.len());
        Ok(Self { path: Some(path), bytes })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { path: None, bytes }
    }

    pub fn path(&self) -> Option<&Path> { self.path.as_deref() }

    pub fn len(&self) -> u64 { self.bytes.len() as u64 }

    pub fn is_empty(&self) -> bool { self.bytes.is_empty() }

    pub fn as_bytes(&self) -> &[u8] { &self.bytes }

    /// Exactly `length` bytes starting at `address`.
    pub fn block(&self, address: u64, length: usize) -> Result<&[u8], ContainerError> {
        check_range(address, length, self.len())?;
        let start = address as usize;
        Ok(&self.bytes[start..start + length])
    }
}

// ── ContainerWriter ──────────────────────────────────────────────────────────

/// Single writer that overwrites fixed-size blocks in place.
pub struct ContainerWriter<W: Read + Write + Seek> {
    inner: W,
    size:  u64,
    pub bytes_written: u64,
}

impl ContainerWriter<File> {
    /// Open an existing file for in-place patching.  Never creates or truncates.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ContainerError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Self::new(file)
    }
}

impl<W: Read + Write + Seek> ContainerWriter<W> {
    pub fn new(mut inner: W) -> Result<Self, ContainerError> {
        let size = inner.seek(SeekFrom::End(0))?;
        Ok(Self { inner, size, bytes_written: 0 })
    }

    pub fn len(&self) -> u64 { self.size }

    pub fn is_empty(&self) -> bool { self.size == 0 }

    /// Fails with `OutOfRange` unless `address..address + length` fits.
    pub fn check_range(&self, address: u64, length: usize) -> Result<(), ContainerError> {
        check_range(address, length, self.size)
    }

    /// Read back `length` bytes at `address`.
    pub fn read_block(&mut self, address: u64, length: usize) -> Result<Vec<u8>, ContainerError> {
        check_range(address, length, self.size)?;
        self.inner.seek(SeekFrom::Start(address))?;
        let mut buf = vec![0u8; length];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Overwrite `data.len()` bytes at `address` with one bounded write.
    ///
    /// The range is checked before anything touches the file, so a
    /// rejected block leaves the container unchanged.
    pub fn write_block(&mut self, address: u64, data: &[u8]) -> Result<(), ContainerError> {
        check_range(address, data.len(), self.size)?;
        self.inner.seek(SeekFrom::Start(address))?;
        self.inner.write_all(data)?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ContainerError> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W { self.inner }
}
