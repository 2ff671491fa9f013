//! Per-sample transforms.
//!
//! Every complete 16-bit little-endian sample read from the source passes
//! through exactly one [`SampleTransform`] before it reaches the sink. The
//! transform is chosen by the output profile, not by the audio data: the
//! built-in DAC needs unsigned words, the PDM path needs a louder signal.

/// Scale factor between a signed 16-bit sample and the normalised `[-1, 1]`
/// range.
const NORMALISE: f32 = 32_768.0;

/// Largest magnitude a clamped sample is scaled back to.
const FULL_SCALE: f32 = 32_767.0;

/// Stateless mapping applied to each sample on its way to the sink.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleTransform {
    /// Samples are written unchanged.
    Passthrough,
    /// Signed to offset-binary: add 32 768 and reinterpret as unsigned.
    BiasShift,
    /// Multiply the normalised sample by `gain`, clamp to `[-1, 1]`, rescale.
    GainClamp {
        /// Linear gain applied before clamping.
        gain: f32,
    },
}

impl SampleTransform {
    /// Wire word for one signed input sample.
    #[inline]
    pub fn apply(self, sample: i16) -> u16 {
        match self {
            SampleTransform::Passthrough => reinterpret(sample),
            SampleTransform::BiasShift => bias_shift(sample),
            SampleTransform::GainClamp { gain } => reinterpret(gain_clamp(sample, gain)),
        }
    }

    /// Rewrite every little-endian sample in `frames` with its wire word.
    pub fn apply_in_place(self, frames: &mut [[u8; 2]]) {
        if self == SampleTransform::Passthrough {
            return;
        }
        for frame in frames {
            *frame = self.apply(i16::from_le_bytes(*frame)).to_le_bytes();
        }
    }

    /// Short label for log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleTransform::Passthrough => "passthrough",
            SampleTransform::BiasShift => "bias-shift",
            SampleTransform::GainClamp { .. } => "gain-clamp",
        }
    }
}

/// Offset-binary encoding: `-32768 → 0`, `0 → 32768`, `32767 → 65535`.
///
/// Adding 32 768 in a wider type and truncating to 16 bits is the same as
/// flipping the sign bit.
#[inline]
pub fn bias_shift(sample: i16) -> u16 {
    reinterpret(sample) ^ 0x8000
}

/// Boost `sample` by `gain` with hard clipping at full scale.
///
/// The clamp is symmetric, so the most negative output is `-32767`, never
/// `-32768`. Conversion back to an integer truncates toward zero.
#[inline]
// Safety: |normalised| <= 1.0, so the product fits in i16 without saturation
#[allow(clippy::cast_possible_truncation, clippy::arithmetic_side_effects)]
pub fn gain_clamp(sample: i16, gain: f32) -> i16 {
    let normalised = (f32::from(sample) / NORMALISE * gain).clamp(-1.0, 1.0);
    (normalised * FULL_SCALE) as i16
}

#[inline]
fn reinterpret(sample: i16) -> u16 {
    u16::from_le_bytes(sample.to_le_bytes())
}
