//! Streaming engine.
//!
//! [`StreamingEngine`] owns the sink and a fixed working buffer of `N`
//! 16-bit samples. One call to [`stream`](StreamingEngine::stream) runs the
//! read → transform → write loop until the source is exhausted:
//!
//! ```text
//!   source.read(≤ 2N bytes) ──► transform whole samples ──► sink.write(all bytes)
//!          ▲                                                        │
//!          └────────────────────────── repeat ◄─────────────────────┘
//! ```
//!
//! The engine has no notion of sessions or cancellation. The player races
//! `stream` against its stop signal and drops the future to cancel, so every
//! await point here (each read and each write) is a cancellation point.
//! Progress is recorded in a caller-owned [`StreamStats`] after every chunk
//! and survives that drop.

use platform::{AudioSink, ByteSource};

use crate::error::PlaybackError;
use crate::transform::SampleTransform;

/// Lifecycle state of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackState {
    /// No session. The sink may be stopped or idle.
    Idle,
    /// A session has been claimed and the sink is being prepared.
    Starting,
    /// The read → transform → write loop is running.
    Streaming,
}

impl PlaybackState {
    /// `true` while a session is claimed.
    pub fn is_active(self) -> bool {
        self != PlaybackState::Idle
    }

    /// Short label for log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Starting => "starting",
            PlaybackState::Streaming => "streaming",
        }
    }
}

/// Running totals for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamStats {
    /// Bytes handed to the sink, counting only fully written chunks.
    pub bytes_written: usize,
    /// Chunks fully written.
    pub chunks: usize,
}

impl StreamStats {
    fn record(&mut self, bytes: usize) {
        self.bytes_written = self.bytes_written.saturating_add(bytes);
        self.chunks = self.chunks.saturating_add(1);
    }
}

/// Sink plus working buffer plus the transform chosen for that sink.
pub struct StreamingEngine<K, const N: usize> {
    sink: K,
    transform: SampleTransform,
    buffer: [[u8; 2]; N],
}

impl<K: AudioSink, const N: usize> StreamingEngine<K, N> {
    /// Working-buffer capacity in bytes: the largest single read and write.
    // Safety: N is a compile-time buffer length; doubling it cannot overflow
    // for any array that fits in memory
    #[allow(clippy::arithmetic_side_effects)]
    pub const CAPACITY_BYTES: usize = N * 2;

    /// Engine driving an already configured `sink`.
    pub fn new(sink: K, transform: SampleTransform) -> Self {
        Self {
            sink,
            transform,
            buffer: [[0; 2]; N],
        }
    }

    /// Transform applied to every sample.
    pub fn transform(&self) -> SampleTransform {
        self.transform
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Give the sink back.
    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Clear stale DMA contents and start the sink.
    pub async fn arm(&mut self) -> Result<(), K::Error> {
        self.sink.zero_buffers().await?;
        self.sink.start().await
    }

    /// Stop the sink. Safe to call on a stopped sink.
    pub async fn halt(&mut self) -> Result<(), K::Error> {
        self.sink.stop().await
    }

    /// Stream `source` to the sink until a read returns 0.
    ///
    /// Each iteration reads at most [`CAPACITY_BYTES`](Self::CAPACITY_BYTES),
    /// transforms the complete samples in what was read, and blocks until
    /// the sink has accepted every byte. A trailing odd byte is written
    /// unmodified.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::Source`] if a read fails.
    /// - [`PlaybackError::Sink`] if a write fails.
    /// - [`PlaybackError::SinkStalled`] if the sink accepts zero bytes.
    pub async fn stream<S: ByteSource>(
        &mut self,
        source: &mut S,
        stats: &mut StreamStats,
    ) -> Result<(), PlaybackError<K::Error, S::Error>> {
        loop {
            let read = source
                .read(self.buffer.as_flattened_mut())
                .await
                .map_err(PlaybackError::Source)?
                .min(Self::CAPACITY_BYTES);
            if read == 0 {
                return Ok(());
            }

            // Safety: division by a non-zero constant
            #[allow(clippy::arithmetic_side_effects)]
            let whole_samples = read / 2;
            if let Some(frames) = self.buffer.get_mut(..whole_samples) {
                self.transform.apply_in_place(frames);
            }

            let chunk = self.buffer.as_flattened().get(..read).unwrap_or_default();
            write_all::<K, S::Error>(&mut self.sink, chunk).await?;
            stats.record(read);
            trace!("chunk written: {} bytes", read);
        }
    }
}

/// Write `chunk` completely, retrying after partial writes.
async fn write_all<K: AudioSink, E: core::fmt::Debug>(
    sink: &mut K,
    mut chunk: &[u8],
) -> Result<(), PlaybackError<K::Error, E>> {
    while !chunk.is_empty() {
        let accepted = sink.write(chunk).await.map_err(PlaybackError::Sink)?;
        if accepted == 0 {
            return Err(PlaybackError::SinkStalled(chunk.len()));
        }
        chunk = chunk.get(accepted..).unwrap_or_default();
    }
    Ok(())
}
