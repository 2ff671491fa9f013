//! Byte source over a raw region of a read-only storage device.

use platform::ByteSource;

use embedded_storage::ReadStorage;

/// A window `[offset, offset + len)` of an [`embedded_storage::ReadStorage`]
/// device, typically a partition of external NOR flash holding one clip.
///
/// The window is clamped to the device capacity at construction.
pub struct ReadStorageSource<F> {
    flash: F,
    offset: u32,
    len: usize,
    position: usize,
    open: bool,
}

impl<F: ReadStorage> ReadStorageSource<F> {
    /// Window of `len` bytes starting at device address `offset`.
    pub fn new(flash: F, offset: u32, len: usize) -> Self {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let len = len.min(flash.capacity().saturating_sub(start));
        Self {
            flash,
            offset,
            len,
            position: 0,
            open: true,
        }
    }

    /// Give the device back.
    pub fn into_inner(self) -> F {
        self.flash
    }
}

impl<F> ByteSource for ReadStorageSource<F>
where
    F: ReadStorage,
    F::Error: core::fmt::Debug,
{
    type Error = F::Error;

    fn is_valid(&self) -> bool {
        self.open && self.len > 0
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.available().min(buf.len());
        let Some(dst) = buf.get_mut(..n) else {
            return Ok(0);
        };
        if n == 0 {
            return Ok(0);
        }
        // offset + len fits the device (clamped in new), so this never saturates
        let address = u32::try_from(self.position)
            .ok()
            .and_then(|pos| self.offset.checked_add(pos))
            .unwrap_or(u32::MAX);
        self.flash.read(address, dst)?;
        self.position = self.position.saturating_add(n);
        Ok(n)
    }

    fn available(&self) -> usize {
        if self.open {
            self.len.saturating_sub(self.position)
        } else {
            0
        }
    }

    fn total_len(&self) -> Option<usize> {
        Some(self.len)
    }

    async fn seek(&mut self, pos: usize) -> Result<(), Self::Error> {
        if self.open && pos <= self.len {
            self.position = pos;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }
}
