//! Reference playback constants
//!
//! Central values shared by the sink presets and the playback core. All
//! configuration is compile-time; nothing here is read from a file or the
//! environment.

use crate::audio_types::SampleRateHz;

/// Output sample rate of both reference sink profiles.
pub const REFERENCE_SAMPLE_RATE_HZ: SampleRateHz = SampleRateHz::KHZ_16;

/// Number of DMA descriptors the sink driver allocates.
pub const DMA_BUF_COUNT: u8 = 4;

/// Frames per DMA descriptor; also the working-buffer capacity in samples.
pub const DMA_BUF_LEN: u16 = 1024;

/// Working-buffer capacity in samples (one DMA transfer unit).
pub const WORKING_BUFFER_SAMPLES: usize = DMA_BUF_LEN as usize;

/// Size of the canonical WAV header skipped before streaming.
pub const WAV_HEADER_LEN: usize = 44;

/// GPIO carrying the PDM bitstream when no pin is given.
pub const DEFAULT_PDM_PIN: u8 = 25;

/// Amplitude boost applied on the PDM path.
pub const PDM_GAIN: f32 = 10.0;
