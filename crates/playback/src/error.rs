//! Playback error type.

/// Failure of a playback operation, generic over the sink error `K` and the
/// source error `S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError<K: core::fmt::Debug, S: core::fmt::Debug> {
    /// The source was closed or empty when `start` was called.
    #[error("byte source is closed or empty")]
    InvalidSource,
    /// The sink driver reported an error.
    #[error("audio sink error: {0:?}")]
    Sink(K),
    /// The source reported an error while seeking or reading.
    #[error("byte source error: {0:?}")]
    Source(S),
    /// The sink accepted zero bytes of a pending chunk.
    #[error("audio sink accepted none of a {0}-byte chunk")]
    SinkStalled(usize),
}

impl<K: core::fmt::Debug, S: core::fmt::Debug> PlaybackError<K, S> {
    /// Short label for log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackError::InvalidSource => "invalid source",
            PlaybackError::Sink(_) => "sink",
            PlaybackError::Source(_) => "source",
            PlaybackError::SinkStalled(_) => "sink stalled",
        }
    }
}
