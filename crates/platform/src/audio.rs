//! Audio sink abstraction
//!
//! The sink is the opaque hardware output channel: an I²S peripheral whose
//! DMA ring drains samples to the built-in DAC pair or to a PDM pin. The
//! playback core only ever talks to it through this trait.

use crate::audio_config::SinkConfig;

/// DMA-backed audio output peripheral.
///
/// Every method is awaited; [`write`](AudioSink::write) is the pipeline's
/// only back-pressure point and resolves once the DMA ring has accepted the
/// bytes.
pub trait AudioSink {
    /// Error type
    type Error: core::fmt::Debug;

    /// Install the driver with a fixed output format.
    ///
    /// Called once at player construction; the format never changes while a
    /// stream is active.
    fn configure(
        &mut self,
        config: SinkConfig,
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Start DMA transfers.
    fn start(&mut self) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Stop DMA transfers. Stopping a stopped sink is a no-op.
    fn stop(&mut self) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Clear pending DMA buffer contents before a fresh session.
    fn zero_buffers(&mut self) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Queue raw PCM bytes for output.
    ///
    /// Waits without a timeout until the DMA ring has room. Returns the
    /// number of bytes accepted, which is `bytes.len()` for a healthy driver.
    fn write(
        &mut self,
        bytes: &[u8],
    ) -> impl core::future::Future<Output = Result<usize, Self::Error>>;
}
