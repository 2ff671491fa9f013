//! Byte source over an open file.

use platform::{ByteSource, File, Storage};

/// An open [`File`] on a mounted file system (SPIFFS on hardware, the local
/// disk on the host).
///
/// Closing drops the handle. The file length is captured once at open.
pub struct FileSource<F> {
    file: Option<F>,
    len: usize,
}

impl<F: File> FileSource<F> {
    /// Wrap an already-open file.
    pub fn new(file: F) -> Self {
        let len = usize::try_from(file.size()).unwrap_or(usize::MAX);
        Self {
            file: Some(file),
            len,
        }
    }

    /// Open `path` on `storage`.
    ///
    /// # Errors
    ///
    /// Whatever the file system reports, typically a missing file.
    pub async fn open<S>(storage: &mut S, path: &str) -> Result<Self, S::Error>
    where
        S: Storage<File = F>,
    {
        let file = storage.open_file(path).await?;
        Ok(Self::new(file))
    }

    fn position(&self) -> usize {
        self.file
            .as_ref()
            .map_or(0, |f| usize::try_from(f.position()).unwrap_or(usize::MAX))
    }
}

impl<F: File> ByteSource for FileSource<F> {
    type Error = F::Error;

    fn is_valid(&self) -> bool {
        self.file.is_some()
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let limit = self.available().min(buf.len());
        match (self.file.as_mut(), buf.get_mut(..limit)) {
            (Some(file), Some(dst)) if !dst.is_empty() => file.read(dst).await,
            _ => Ok(0),
        }
    }

    fn available(&self) -> usize {
        self.len.saturating_sub(self.position())
    }

    fn total_len(&self) -> Option<usize> {
        self.file.as_ref().map(|_| self.len)
    }

    async fn seek(&mut self, pos: usize) -> Result<(), Self::Error> {
        if pos > self.len {
            return Ok(());
        }
        if let Some(file) = self.file.as_mut() {
            file.seek(pos as u64).await?;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.file = None;
    }
}
