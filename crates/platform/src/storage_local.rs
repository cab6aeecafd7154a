//! Local filesystem Storage implementation for host builds.
//!
//! `LocalFileStorage` implements `platform::Storage` using `std::fs`.
//! Used when the `std` feature is enabled (desktop runs and tests).
//! All paths are resolved relative to the music root provided at construction.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use crate::storage::{File, Storage};

/// Error type for local filesystem operations.
#[derive(Debug)]
pub struct LocalStorageError(pub std::io::Error);

impl core::fmt::Display for LocalStorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "local storage error: {}", self.0)
    }
}

impl std::error::Error for LocalStorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// An open file on the local filesystem.
pub struct LocalFile {
    inner: fs::File,
    size: u64,
}

impl File for LocalFile {
    type Error = LocalStorageError;

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Read::read(&mut self.inner, buf).map_err(LocalStorageError)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// A `platform::Storage` implementation backed by `std::fs`.
///
/// # Example
/// ```no_run
/// # async fn example() {
/// use platform::storage_local::LocalFileStorage;
/// use platform::Storage;
/// let mut storage = LocalFileStorage::new("/home/user/music");
/// let file = storage.open_file("album/01.mp3").await;
/// # }
/// ```
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    /// Create a new storage rooted at `music_root`.
    #[must_use]
    pub fn new(music_root: &str) -> Self {
        Self {
            root: PathBuf::from(music_root),
        }
    }

    /// Create from the `MUSIC_PATH` environment variable.
    ///
    /// Returns `None` if `MUSIC_PATH` is not set or is not valid UTF-8.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        std::env::var("MUSIC_PATH").ok().map(|p| Self::new(&p))
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Storage for LocalFileStorage {
    type Error = LocalStorageError;
    type File<'a> = LocalFile;

    async fn open_file<'a>(&'a mut self, path: &str) -> Result<Self::File<'a>, Self::Error> {
        let file = fs::File::open(self.resolve(path)).map_err(LocalStorageError)?;
        let meta = file.metadata().map_err(LocalStorageError)?;
        Ok(LocalFile {
            inner: file,
            size: meta.len(),
        })
    }
}
