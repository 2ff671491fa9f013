//! WAV header handling.
//!
//! Sources are expected to hold a canonical RIFF/WAVE file: a fixed 44-byte
//! header followed by raw little-endian PCM. The header is never parsed, only
//! skipped, so the sink format must already match the data.

use platform::config::WAV_HEADER_LEN;
use platform::ByteSource;

/// Result of positioning a source past its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeaderSkip {
    /// Cursor now sits on the first payload byte.
    Skipped,
    /// The source is shorter than a header; there is no payload to play.
    Truncated,
}

/// Seek `source` to the first byte after the WAV header.
///
/// The seek is issued unconditionally, so a source that was already played
/// is rewound to the start of its payload. Truncation is judged on the
/// source's total length; an unbounded stream is assumed to carry a header.
pub async fn skip_header<S: ByteSource>(source: &mut S) -> Result<HeaderSkip, S::Error> {
    source.seek(WAV_HEADER_LEN).await?;
    match source.total_len() {
        Some(len) if len < WAV_HEADER_LEN => Ok(HeaderSkip::Truncated),
        _ => Ok(HeaderSkip::Skipped),
    }
}
