//! Local filesystem Storage implementation for host builds.
//!
//! `LocalFileStorage` stands in for the SPIFFS partition: paths are
//! SPIFFS-style absolute names (`"/sirena.wav"`) resolved under a host
//! directory given at construction.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use crate::storage::{File, Storage};

/// Error type for local filesystem operations.
#[derive(Debug, thiserror::Error)]
#[error("local storage error: {0}")]
pub struct LocalStorageError(#[from] pub std::io::Error);

/// An open file on the local filesystem.
pub struct LocalFile {
    inner: fs::File,
    size: u64,
    position: u64,
}

impl File for LocalFile {
    type Error = LocalStorageError;

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = Read::read(&mut self.inner, buf)?;
        self.position = self.position.saturating_add(n as u64);
        Ok(n)
    }

    async fn seek(&mut self, pos: u64) -> Result<u64, Self::Error> {
        self.position = Seek::seek(&mut self.inner, SeekFrom::Start(pos))?;
        Ok(self.position)
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn position(&self) -> u64 {
        self.position
    }
}

/// A `platform::Storage` implementation backed by `std::fs`.
///
/// # Example
/// ```no_run
/// # async fn example() {
/// use platform::storage_local::LocalFileStorage;
/// use platform::Storage;
/// let mut spiffs = LocalFileStorage::new("/tmp/spiffs");
/// let file = spiffs.open_file("/sirena.wav").await.unwrap();
/// # }
/// ```
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    /// Create a new storage whose `/` is `mount_root` on the host.
    #[must_use]
    pub fn new(mount_root: &str) -> Self {
        Self {
            root: PathBuf::from(mount_root),
        }
    }

    /// Create from the `SPIFFS_ROOT` environment variable.
    ///
    /// Returns `None` if `SPIFFS_ROOT` is not set or is not valid UTF-8.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        std::env::var("SPIFFS_ROOT").ok().map(|p| Self::new(&p))
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Storage for LocalFileStorage {
    type Error = LocalStorageError;
    type File = LocalFile;

    async fn open_file(&mut self, path: &str) -> Result<Self::File, Self::Error> {
        let inner = fs::File::open(self.resolve(path))?;
        let size = inner.metadata()?.len();
        Ok(LocalFile {
            inner,
            size,
            position: 0,
        })
    }

    async fn exists(&mut self, path: &str) -> Result<bool, Self::Error> {
        Ok(self.resolve(path).is_file())
    }
}
