//! Single-writer lock for the index.
//!
//! Only one indexer may write a store at a time. Readers never take this lock;
//! `SQLite` WAL mode lets them keep reading the last committed generation.

use std::fs::{File, OpenOptions, TryLockError};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Exclusive write access to an index, released on drop.
///
/// The guard holds an OS advisory lock on the lock file for its whole
/// lifetime. The operating system drops that lock when the process exits,
/// so a killed writer never leaves the index locked. The file itself stays
/// on disk; its presence alone means nothing.
#[derive(Debug)]
pub struct WriterLock {
    path: PathBuf,
    _file: File,
}

impl WriterLock {
    /// Try to take the lock at `path`.
    ///
    /// Returns [`Error::Locked`] if another writer already holds it.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Err(Error::Locked(path.to_path_buf())),
            Err(TryLockError::Error(e)) => return Err(e.into()),
        }

        // Best effort: the pid only helps a human see who holds the lock.
        if let Err(e) = file.set_len(0).and_then(|()| writeln!(file, "{}", std::process::id())) {
            tracing::debug!(path = %path.display(), error = %e, "Could not record pid in lock file");
        }

        tracing::debug!(path = %path.display(), "Acquired writer lock");
        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
        })
    }

    /// Whether some writer currently holds the lock at `path`.
    #[must_use]
    pub fn is_held(path: &Path) -> bool {
        let Ok(file) = OpenOptions::new().read(true).write(true).open(path) else {
            return false;
        };
        match file.try_lock() {
            Ok(()) => false,
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Error(e)) => {
                tracing::debug!(path = %path.display(), error = %e, "Could not check writer lock");
                false
            }
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        // Closing the file releases the lock.
        tracing::debug!(path = %self.path.display(), "Released writer lock");
    }
}
