//! Byte source over data linked into the firmware image.

use core::convert::Infallible;

use platform::ByteSource;

/// Read-only view of a `'static` (or otherwise borrowed) byte slice, such as
/// a clip embedded with `include_bytes!`.
///
/// Closing drops the borrow; the data itself is never freed.
#[derive(Debug, Clone)]
pub struct FlashSource<'a> {
    data: Option<&'a [u8]>,
    position: usize,
}

impl<'a> FlashSource<'a> {
    /// Source positioned at the first byte of `data`.
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data: Some(data),
            position: 0,
        }
    }

    /// Current cursor.
    pub fn position(&self) -> usize {
        self.position
    }

    fn remaining(&self) -> &'a [u8] {
        self.data
            .and_then(|data| data.get(self.position..))
            .unwrap_or_default()
    }
}

impl ByteSource for FlashSource<'_> {
    type Error = Infallible;

    fn is_valid(&self) -> bool {
        self.data.is_some_and(|data| !data.is_empty())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let rest = self.remaining();
        let n = rest.len().min(buf.len());
        if let (Some(dst), Some(src)) = (buf.get_mut(..n), rest.get(..n)) {
            dst.copy_from_slice(src);
        }
        // Safety: n <= remaining, so the cursor never passes the data length
        #[allow(clippy::arithmetic_side_effects)]
        {
            self.position += n;
        }
        Ok(n)
    }

    fn available(&self) -> usize {
        self.remaining().len()
    }

    fn total_len(&self) -> Option<usize> {
        Some(self.data.map_or(0, <[u8]>::len))
    }

    async fn seek(&mut self, pos: usize) -> Result<(), Self::Error> {
        if self.data.is_some_and(|data| pos <= data.len()) {
            self.position = pos;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.data = None;
        self.position = 0;
    }
}
