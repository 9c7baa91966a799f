use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::db;

#[derive(Debug)]
pub enum LockError {
    Io(std::io::Error),
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockError::Io(err) => write!(f, "lock I/O error: {}", err),
        }
    }
}

impl std::error::Error for LockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LockError::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for LockError {
    fn from(value: std::io::Error) -> Self {
        LockError::Io(value)
    }
}

/// Single-holder lock on a catalog directory, visible to other processes as
/// a marker file at a fixed name. `Ok(None)` means another holder exists;
/// callers read it as "catalog already open elsewhere", not as a failure.
///
/// If the owning process dies without dropping the lock, the marker is
/// orphaned and must be removed out-of-band before the catalog can be opened
/// again.
#[derive(Debug)]
pub struct CatalogLock {
    path: PathBuf,
    _file: File,
}

impl CatalogLock {
    pub fn try_acquire(dir: &Path) -> Result<Option<Self>, LockError> {
        let path = db::lock_path(dir);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => Ok(Some(CatalogLock { path, _file: file })),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(err) => Err(LockError::Io(err)),
        }
    }
}

impl Drop for CatalogLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
