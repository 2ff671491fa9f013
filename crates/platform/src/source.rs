//! Byte source abstraction
//!
//! A byte source is whatever feeds a playback session: a read-only view of a
//! flash-resident asset, an open file on SPIFFS or an SD card, a region of an
//! external NOR chip. The playback core reads it sequentially and never owns
//! it; closing it is the caller's business.

/// Sequential, optionally seekable provider of audio payload bytes.
///
/// # Contract
///
/// - [`read`](ByteSource::read) returns `Ok(0)` exactly at end of data, or
///   when the source is closed or invalid. It never returns more bytes than
///   remain.
/// - [`seek`](ByteSource::seek) past the end is a no-op: the cursor stays
///   where it was and no error is raised.
/// - [`available`](ByteSource::available) is the number of bytes left
///   between the cursor and the end.
pub trait ByteSource {
    /// Error type
    type Error: core::fmt::Debug;

    /// `true` while the source refers to readable data.
    fn is_valid(&self) -> bool;

    /// Read up to `buf.len()` bytes from the cursor, advancing it.
    fn read(
        &mut self,
        buf: &mut [u8],
    ) -> impl core::future::Future<Output = Result<usize, Self::Error>>;

    /// Bytes remaining after the cursor.
    fn available(&self) -> usize;

    /// Total length of the data, or `None` for an unbounded stream.
    fn total_len(&self) -> Option<usize> {
        None
    }

    /// Move the cursor to an absolute byte position.
    fn seek(&mut self, pos: usize) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Release the underlying handle. Subsequent reads return 0.
    fn close(&mut self);
}

/// A borrowed source is a source: callers lend one for a single session and
/// keep ownership of it afterwards.
impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    type Error = T::Error;

    fn is_valid(&self) -> bool {
        (**self).is_valid()
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).read(buf).await
    }

    fn available(&self) -> usize {
        (**self).available()
    }

    fn total_len(&self) -> Option<usize> {
        (**self).total_len()
    }

    async fn seek(&mut self, pos: usize) -> Result<(), Self::Error> {
        (**self).seek(pos).await
    }

    fn close(&mut self) {
        (**self).close();
    }
}
