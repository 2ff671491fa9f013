//! Concrete byte sources.
//!
//! Three backings cover the places a clip can live on a microcontroller:
//!
//! | Source                 | Backing                                   | Error        |
//! |------------------------|-------------------------------------------|--------------|
//! | [`FlashSource`]        | bytes linked into the image               | `Infallible` |
//! | [`ReadStorageSource`]  | region of an `embedded-storage` device    | device error |
//! | [`FileSource`]         | file on a mounted file system             | file error   |
//!
//! [`AnySource`] lets one player alternate between a built-in clip and a
//! file without naming two source types.

mod file;
mod flash;
mod storage;

pub use file::FileSource;
pub use flash::FlashSource;
pub use storage::ReadStorageSource;

use platform::{ByteSource, File};

/// Either an embedded clip or a file.
pub enum AnySource<'a, F> {
    /// Data linked into the firmware image.
    Flash(FlashSource<'a>),
    /// Open file on a mounted file system.
    File(FileSource<F>),
}

impl<'a, F> From<FlashSource<'a>> for AnySource<'a, F> {
    fn from(source: FlashSource<'a>) -> Self {
        AnySource::Flash(source)
    }
}

impl<F> From<FileSource<F>> for AnySource<'_, F> {
    fn from(source: FileSource<F>) -> Self {
        AnySource::File(source)
    }
}

impl<F: File> ByteSource for AnySource<'_, F> {
    type Error = F::Error;

    fn is_valid(&self) -> bool {
        match self {
            AnySource::Flash(s) => s.is_valid(),
            AnySource::File(s) => s.is_valid(),
        }
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self {
            AnySource::Flash(s) => match s.read(buf).await {
                Ok(n) => Ok(n),
                Err(never) => match never {},
            },
            AnySource::File(s) => s.read(buf).await,
        }
    }

    fn available(&self) -> usize {
        match self {
            AnySource::Flash(s) => s.available(),
            AnySource::File(s) => s.available(),
        }
    }

    fn total_len(&self) -> Option<usize> {
        match self {
            AnySource::Flash(s) => s.total_len(),
            AnySource::File(s) => s.total_len(),
        }
    }

    async fn seek(&mut self, pos: usize) -> Result<(), Self::Error> {
        match self {
            AnySource::Flash(s) => match s.seek(pos).await {
                Ok(()) => Ok(()),
                Err(never) => match never {},
            },
            AnySource::File(s) => s.seek(pos).await,
        }
    }

    fn close(&mut self) {
        match self {
            AnySource::Flash(s) => s.close(),
            AnySource::File(s) => s.close(),
        }
    }
}
