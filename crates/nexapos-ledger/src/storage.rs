//! Storage medium abstraction
//!
//! The ledger writes through a [`StorageMedium`] — either the internal
//! flash partition or a removable card. The variant is chosen once at
//! startup from the `use_sd` configuration flag and never re-checked per
//! call.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage full")]
    Full,
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Capability interface over the persistent medium: read, append, flush.
pub trait StorageMedium: Send {
    /// Append raw bytes to the log. Not durable until [`flush`] returns.
    ///
    /// [`flush`]: StorageMedium::flush
    fn append(&mut self, bytes: &[u8]) -> Result<(), StorageError>;

    /// Force previously appended bytes onto the physical medium.
    fn flush(&mut self) -> Result<(), StorageError>;

    /// Read the entire log contents.
    fn read_all(&self) -> Result<String, StorageError>;

    /// Current log size in bytes.
    fn len(&self) -> Result<u64, StorageError>;

    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl<S: StorageMedium + ?Sized> StorageMedium for Box<S> {
    fn append(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).append(bytes)
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        (**self).flush()
    }

    fn read_all(&self) -> Result<String, StorageError> {
        (**self).read_all()
    }

    fn len(&self) -> Result<u64, StorageError> {
        (**self).len()
    }
}

/// Map OS-level write failures onto the storage error kinds the operator
/// must distinguish.
fn map_io(e: io::Error) -> StorageError {
    #[cfg(unix)]
    if let Some(code) = e.raw_os_error() {
        if code == libc::ENOSPC {
            return StorageError::Full;
        }
        if code == libc::EIO || code == libc::ENODEV || code == libc::ENXIO {
            return StorageError::Unavailable(e.to_string());
        }
    }
    StorageError::Io(e)
}

/// The sales log partition on internal flash.
///
/// File-backed with a fixed byte capacity: the log partition is small and
/// an over-quota append is rejected up front, before any bytes land.
pub struct InternalFlashStorage {
    path: PathBuf,
    file: File,
    capacity: u64,
}

impl InternalFlashStorage {
    /// Default log partition quota (bytes)
    pub const DEFAULT_CAPACITY: u64 = 512 * 1024;

    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Self::with_capacity(path, Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(path: &Path, capacity: u64) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            capacity,
        })
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

impl StorageMedium for InternalFlashStorage {
    fn append(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let used = self.file.metadata()?.len();
        // Reject before writing — a truncated record must never land
        if used + bytes.len() as u64 > self.capacity {
            return Err(StorageError::Full);
        }
        self.file.write_all(bytes).map_err(map_io)
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        self.file.flush().map_err(map_io)?;
        self.file.sync_data().map_err(map_io)
    }

    fn read_all(&self) -> Result<String, StorageError> {
        Ok(fs::read_to_string(&self.path)?)
    }

    fn len(&self) -> Result<u64, StorageError> {
        Ok(self.file.metadata()?.len())
    }
}

/// The sales log on a removable card.
///
/// The card may disappear at any moment; its mount point is verified on
/// every append and OS errors are mapped to [`StorageError::Unavailable`]
/// (ejected) or [`StorageError::Full`] (out of space).
#[derive(Debug)]
pub struct RemovableCardStorage {
    mount: PathBuf,
    path: PathBuf,
    file: Option<File>,
}

impl RemovableCardStorage {
    pub fn open(mount: &Path, file_name: &str) -> Result<Self, StorageError> {
        let mut storage = Self {
            mount: mount.to_path_buf(),
            path: mount.join(file_name),
            file: None,
        };
        storage.ensure_open()?;
        Ok(storage)
    }

    fn ensure_open(&mut self) -> Result<&mut File, StorageError> {
        if !self.mount.is_dir() {
            self.file = None;
            return Err(StorageError::Unavailable(format!(
                "card not mounted at {}",
                self.mount.display()
            )));
        }
        if self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(map_io)?;
            self.file = Some(file);
        }
        Ok(self.file.as_mut().expect("just opened"))
    }
}

impl StorageMedium for RemovableCardStorage {
    fn append(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let file = self.ensure_open()?;
        match file.write_all(bytes) {
            Ok(()) => Ok(()),
            Err(e) => {
                // Drop the handle so a re-inserted card reopens cleanly
                self.file = None;
                Err(map_io(e))
            }
        }
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        let file = self.ensure_open()?;
        if let Err(e) = file.flush().and_then(|_| file.sync_data()) {
            self.file = None;
            return Err(map_io(e));
        }
        Ok(())
    }

    fn read_all(&self) -> Result<String, StorageError> {
        if !self.mount.is_dir() {
            return Err(StorageError::Unavailable(format!(
                "card not mounted at {}",
                self.mount.display()
            )));
        }
        if !self.path.exists() {
            return Ok(String::new());
        }
        Ok(fs::read_to_string(&self.path)?)
    }

    fn len(&self) -> Result<u64, StorageError> {
        if !self.path.exists() {
            return Ok(0);
        }
        Ok(fs::metadata(&self.path)?.len())
    }
}
