//! I²S output configuration for the audio sink.
//!
//! The sink is driven as an I²S master transmitter. Two wirings are
//! supported, matching the two ways a bare microcontroller can make sound
//! without an external codec:
//!
//! | Mode              | Output                       | Wire format   | APLL |
//! |-------------------|------------------------------|---------------|------|
//! | `BuiltinDac`      | Both 8-bit DAC pins (GPIO25/26) | MSB-justified | on   |
//! | `Pdm { pin }`     | One pulse-density pin          | Standard I²S  | off  |
//!
//! The built-in DAC only understands **unsigned** samples, which is why the
//! DAC profile pairs with the bias-shift transform in the playback crate.
//!
//! # DMA
//!
//! The driver owns `dma_buf_count` descriptors of `dma_buf_len` frames each.
//! With the reference values (4 × 1024 frames at 16 kHz) the ring holds
//! 256 ms of audio, which is the stall budget for a slow source.

use crate::audio_types::SampleRateHz;
use crate::config::{DMA_BUF_COUNT, DMA_BUF_LEN, REFERENCE_SAMPLE_RATE_HZ};

/// Channel layout of the I²S frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelLayout {
    /// Mono stream carried in the left slot only.
    OnlyLeft,
    /// Mono stream duplicated into both slots.
    DuplicatedMono,
}

/// Physical output the peripheral drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputMode {
    /// Internal differential DAC pair, both DAC channels enabled.
    BuiltinDac,
    /// Pulse-density modulation on a single GPIO.
    Pdm {
        /// GPIO number carrying the PDM bitstream.
        pin: u8,
    },
}

/// Serial framing of the I²S bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireFormat {
    /// Philips I²S framing.
    StandardI2s,
    /// MSB-justified framing (required by the built-in DAC).
    MsbJustified,
}

/// Fixed output format installed once per sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SinkConfig {
    /// Output sample rate.
    pub sample_rate: SampleRateHz,
    /// Bits per sample on the wire (always 16 for this player).
    pub bits_per_sample: u8,
    /// Channel layout.
    pub channel_layout: ChannelLayout,
    /// DAC pair or PDM pin.
    pub output_mode: OutputMode,
    /// Serial framing.
    pub wire_format: WireFormat,
    /// Number of DMA descriptors.
    pub dma_buf_count: u8,
    /// Frames per DMA descriptor.
    pub dma_buf_len: u16,
    /// Clock the peripheral from the audio PLL instead of the main PLL.
    pub use_apll: bool,
    /// Let the driver clear descriptors automatically on underrun, so a
    /// starved ring outputs silence instead of repeating stale audio.
    pub tx_desc_auto_clear: bool,
}

impl SinkConfig {
    /// Built-in DAC reference configuration: 16 kHz, 16-bit, left-only mono,
    /// MSB-justified, APLL clocked.
    pub fn builtin_dac() -> Self {
        Self {
            sample_rate: REFERENCE_SAMPLE_RATE_HZ,
            bits_per_sample: 16,
            channel_layout: ChannelLayout::OnlyLeft,
            output_mode: OutputMode::BuiltinDac,
            wire_format: WireFormat::MsbJustified,
            dma_buf_count: DMA_BUF_COUNT,
            dma_buf_len: DMA_BUF_LEN,
            use_apll: true,
            tx_desc_auto_clear: true,
        }
    }

    /// PDM reference configuration on `pin`: 16 kHz, 16-bit, left-only mono,
    /// standard I²S framing, main PLL.
    pub fn pdm(pin: u8) -> Self {
        Self {
            sample_rate: REFERENCE_SAMPLE_RATE_HZ,
            bits_per_sample: 16,
            channel_layout: ChannelLayout::OnlyLeft,
            output_mode: OutputMode::Pdm { pin },
            wire_format: WireFormat::StandardI2s,
            dma_buf_count: DMA_BUF_COUNT,
            dma_buf_len: DMA_BUF_LEN,
            use_apll: false,
            tx_desc_auto_clear: true,
        }
    }

    /// Bytes per sample frame on the wire.
    ///
    /// Left-only mono carries one sample per frame; duplicated mono two.
    pub fn frame_bytes(&self) -> usize {
        let sample_bytes = usize::from(self.bits_per_sample / 8);
        match self.channel_layout {
            ChannelLayout::OnlyLeft => sample_bytes,
            #[allow(clippy::arithmetic_side_effects)] // Safety: ≤ 255 / 8 * 2
            ChannelLayout::DuplicatedMono => sample_bytes * 2,
        }
    }

    /// Total bytes the DMA ring can hold.
    #[allow(clippy::arithmetic_side_effects)] // Safety: u8 × u16 × ≤ 62 fits in usize
    pub fn dma_ring_bytes(&self) -> usize {
        usize::from(self.dma_buf_count) * usize::from(self.dma_buf_len) * self.frame_bytes()
    }

    /// Audio the DMA ring holds when full, in milliseconds.
    ///
    /// This is how long a stalled source can pause before the output starves.
    #[allow(clippy::arithmetic_side_effects)] // Safety: sample_rate ≥ 8000, non-zero divisor
    pub fn ring_duration_ms(&self) -> u32 {
        let frames = u64::from(self.dma_buf_count) * u64::from(self.dma_buf_len);
        let ms = frames * 1000 / u64::from(self.sample_rate.get());
        u32::try_from(ms).unwrap_or(u32::MAX)
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::builtin_dac()
    }
}
