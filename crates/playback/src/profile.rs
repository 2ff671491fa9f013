//! Output profiles: a sink configuration paired with the transform its
//! hardware needs.

use platform::audio_config::SinkConfig;
use platform::config::{DEFAULT_PDM_PIN, PDM_GAIN};

use crate::transform::SampleTransform;

/// Everything that differs between the two reference output paths.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputProfile {
    /// Format installed on the sink at construction.
    pub sink: SinkConfig,
    /// Transform applied to every sample.
    pub transform: SampleTransform,
}

impl OutputProfile {
    /// Built-in DAC: MSB-justified, unsigned samples.
    pub fn builtin_dac() -> Self {
        Self {
            sink: SinkConfig::builtin_dac(),
            transform: SampleTransform::BiasShift,
        }
    }

    /// PDM on `pin`, boosted by the reference gain with hard clipping.
    pub fn pdm(pin: u8) -> Self {
        Self {
            sink: SinkConfig::pdm(pin),
            transform: SampleTransform::GainClamp { gain: PDM_GAIN },
        }
    }

    /// PDM on the default pin.
    pub fn pdm_default() -> Self {
        Self::pdm(DEFAULT_PDM_PIN)
    }
}

impl Default for OutputProfile {
    fn default() -> Self {
        Self::builtin_dac()
    }
}
