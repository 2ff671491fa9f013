//! File system capability consumed by storage-backed byte sources.
//!
//! Implemented by the SPIFFS / SD card driver on hardware and by
//! [`LocalFileStorage`](crate::storage_local::LocalFileStorage) on the host.
//! The playback crate wraps an open [`File`] in a `FileSource`.

/// A mounted, read-only file system.
pub trait Storage {
    /// Error type
    type Error: core::fmt::Debug;
    /// Handle type produced by [`open_file`](Storage::open_file)
    type File: File;

    /// Open `path` for reading, positioned at offset 0.
    fn open_file(
        &mut self,
        path: &str,
    ) -> impl core::future::Future<Output = Result<Self::File, Self::Error>>;

    /// `true` if `path` names an existing file.
    fn exists(
        &mut self,
        path: &str,
    ) -> impl core::future::Future<Output = Result<bool, Self::Error>>;
}

/// An open, readable file.
///
/// Dropping the handle closes it.
pub trait File {
    /// Error type
    type Error: core::fmt::Debug;

    /// Read from the current position. Returns `Ok(0)` at end of file.
    fn read(
        &mut self,
        buf: &mut [u8],
    ) -> impl core::future::Future<Output = Result<usize, Self::Error>>;

    /// Seek to an absolute position, returning the new position.
    fn seek(&mut self, pos: u64) -> impl core::future::Future<Output = Result<u64, Self::Error>>;

    /// Total length in bytes, fixed for the life of the handle.
    fn size(&self) -> u64;

    /// Current read position.
    fn position(&self) -> u64;
}
