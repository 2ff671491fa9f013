//! WAV playback core: streams 16-bit PCM from a byte source to a DMA-backed
//! audio sink, with start/stop control and blocking or background execution.
#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![allow(async_fn_in_trait)]

#[macro_use]
mod fmt;

pub mod engine;
pub mod error;
pub mod player;
pub mod profile;
pub mod source;
pub mod transform;
pub mod wav;

pub use engine::{PlaybackState, StreamStats, StreamingEngine};
pub use error::PlaybackError;
pub use player::{ExecutionMode, Player, PlayerError, SessionEnd, SessionReport, StartOutcome};
pub use profile::OutputProfile;
pub use source::{AnySource, FileSource, FlashSource, ReadStorageSource};
pub use transform::SampleTransform;

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    /// Per-sample transform tests
    mod transform_tests {
        use crate::transform::{bias_shift, gain_clamp, SampleTransform};

        #[test]
        fn test_bias_shift_endpoints() {
            assert_eq!(bias_shift(i16::MIN), 0);
            assert_eq!(bias_shift(0), 32_768);
            assert_eq!(bias_shift(i16::MAX), 65_535);
            assert_eq!(bias_shift(-1), 32_767);
        }

        #[test]
        fn test_gain_clamp_zero_stays_zero() {
            assert_eq!(gain_clamp(0, 10.0), 0);
        }

        #[test]
        fn test_gain_clamp_saturates_at_threshold() {
            // 3277 / 32768 * 10 > 1.0
            assert_eq!(gain_clamp(3_277, 10.0), 32_767);
            assert_eq!(gain_clamp(i16::MAX, 10.0), 32_767);
            assert_eq!(gain_clamp(-3_277, 10.0), -32_767);
            assert_eq!(gain_clamp(i16::MIN, 10.0), -32_767);
        }

        #[test]
        fn test_gain_clamp_linear_below_threshold() {
            let out = gain_clamp(1_000, 10.0);
            assert!((9_998..=10_000).contains(&out), "got {out}");
            assert_eq!(gain_clamp(-1_000, 10.0), -out);
        }

        #[test]
        fn test_passthrough_keeps_bits() {
            assert_eq!(SampleTransform::Passthrough.apply(-2), 0xFFFE);
            assert_eq!(SampleTransform::Passthrough.apply(0x1234), 0x1234);
        }

        #[test]
        fn test_apply_in_place_rewrites_little_endian_frames() {
            let mut frames = [0i16.to_le_bytes(), (-32_768i16).to_le_bytes()];
            SampleTransform::BiasShift.apply_in_place(&mut frames);
            assert_eq!(frames, [[0x00, 0x80], [0x00, 0x00]]);
        }

        #[test]
        fn test_gain_clamp_variant_matches_free_fn() {
            let t = SampleTransform::GainClamp { gain: 10.0 };
            assert_eq!(t.apply(500), gain_clamp(500, 10.0) as u16);
        }
    }

    /// Header skip tests
    mod wav_tests {
        use embassy_futures::block_on;
        use platform::ByteSource;

        use crate::source::FlashSource;
        use crate::wav::{skip_header, HeaderSkip};

        #[test]
        fn test_skip_header_positions_on_payload() {
            let data = [0u8; 50];
            let mut src = FlashSource::new(&data);
            assert_eq!(block_on(skip_header(&mut src)).unwrap(), HeaderSkip::Skipped);
            assert_eq!(src.position(), 44);
            assert_eq!(src.available(), 6);
        }

        #[test]
        fn test_skip_header_rewinds_a_played_source() {
            let data = [0u8; 100];
            let mut src = FlashSource::new(&data);
            let mut sink = [0u8; 100];
            block_on(src.read(&mut sink)).unwrap();
            assert_eq!(src.available(), 0);
            block_on(skip_header(&mut src)).unwrap();
            assert_eq!(src.available(), 56);
        }

        #[test]
        fn test_short_source_is_truncated() {
            let data = [0u8; 20];
            let mut src = FlashSource::new(&data);
            assert_eq!(block_on(skip_header(&mut src)).unwrap(), HeaderSkip::Truncated);
            assert_eq!(src.position(), 0);
        }

        #[test]
        fn test_header_only_source_is_skipped_and_empty() {
            let data = [0u8; 44];
            let mut src = FlashSource::new(&data);
            assert_eq!(block_on(skip_header(&mut src)).unwrap(), HeaderSkip::Skipped);
            assert_eq!(src.available(), 0);
        }
    }

    /// Byte source tests
    mod source_tests {
        use embassy_futures::block_on;
        use embedded_storage::ReadStorage;
        use platform::mocks::{MockFile, MockFileError, MockStorage};
        use platform::ByteSource;

        use crate::source::{AnySource, FileSource, FlashSource, ReadStorageSource};

        struct RamFlash(Vec<u8>);

        impl ReadStorage for RamFlash {
            type Error = ();

            fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
                let start = offset as usize;
                let src = self.0.get(start..start + bytes.len()).ok_or(())?;
                bytes.copy_from_slice(src);
                Ok(())
            }

            fn capacity(&self) -> usize {
                self.0.len()
            }
        }

        #[test]
        fn test_flash_read_advances_and_ends_with_zero() {
            let data: Vec<u8> = (0..10).collect();
            let mut src = FlashSource::new(&data);
            let mut buf = [0u8; 4];
            assert_eq!(block_on(src.read(&mut buf)).unwrap(), 4);
            assert_eq!(buf, [0, 1, 2, 3]);
            assert_eq!(block_on(src.read(&mut [0u8; 16])).unwrap(), 6);
            assert_eq!(block_on(src.read(&mut buf)).unwrap(), 0);
        }

        #[test]
        fn test_flash_seek_past_end_is_ignored() {
            let data = [0u8; 10];
            let mut src = FlashSource::new(&data);
            block_on(src.seek(4)).unwrap();
            block_on(src.seek(11)).unwrap();
            assert_eq!(src.position(), 4);
            block_on(src.seek(10)).unwrap();
            assert_eq!(src.available(), 0);
        }

        #[test]
        fn test_flash_close_invalidates() {
            let data = [1u8; 8];
            let mut src = FlashSource::new(&data);
            assert!(src.is_valid());
            src.close();
            assert!(!src.is_valid());
            assert_eq!(block_on(src.read(&mut [0u8; 8])).unwrap(), 0);
        }

        #[test]
        fn test_empty_flash_is_invalid() {
            assert!(!FlashSource::new(&[]).is_valid());
        }

        #[test]
        fn test_read_storage_window_is_clamped_to_capacity() {
            let flash = RamFlash((0..64).collect());
            let mut src = ReadStorageSource::new(flash, 48, 100);
            assert_eq!(src.total_len(), Some(16));
            let mut buf = [0u8; 32];
            assert_eq!(block_on(src.read(&mut buf)).unwrap(), 16);
            assert_eq!(buf[0], 48);
            assert_eq!(buf[15], 63);
            assert_eq!(block_on(src.read(&mut buf)).unwrap(), 0);
        }

        #[test]
        fn test_read_storage_seek_and_close() {
            let mut src = ReadStorageSource::new(RamFlash(vec![7; 100]), 0, 100);
            block_on(src.seek(90)).unwrap();
            assert_eq!(src.available(), 10);
            block_on(src.seek(200)).unwrap();
            assert_eq!(src.available(), 10);
            src.close();
            assert!(!src.is_valid());
            assert_eq!(block_on(src.read(&mut [0u8; 4])).unwrap(), 0);
        }

        #[test]
        fn test_file_source_reads_and_seeks() {
            let mut src = FileSource::new(MockFile::new(vec![9u8; 60]));
            block_on(src.seek(44)).unwrap();
            assert_eq!(src.available(), 16);
            assert_eq!(block_on(src.read(&mut [0u8; 64])).unwrap(), 16);
            block_on(src.seek(61)).unwrap();
            assert_eq!(src.available(), 0);
        }

        #[test]
        fn test_file_source_open_missing_path() {
            let mut storage = MockStorage::new();
            let opened = block_on(FileSource::open(&mut storage, "/missing.wav"));
            assert!(matches!(opened, Err(MockFileError::NotFound)));
        }

        #[test]
        fn test_file_source_close_drops_handle() {
            let mut storage = MockStorage::new();
            storage.insert("/clip.wav", MockFile::new(vec![0u8; 48]));
            let mut src = block_on(FileSource::open(&mut storage, "/clip.wav")).unwrap();
            assert!(src.is_valid());
            src.close();
            assert!(!src.is_valid());
            assert_eq!(src.total_len(), None);
            assert_eq!(block_on(src.read(&mut [0u8; 4])).unwrap(), 0);
        }

        #[test]
        fn test_any_source_dispatches() {
            let data = [3u8; 12];
            let mut flash: AnySource<'_, MockFile> = FlashSource::new(&data).into();
            assert_eq!(flash.total_len(), Some(12));
            let mut file: AnySource<'_, MockFile> =
                FileSource::new(MockFile::new(vec![4u8; 5])).into();
            let mut buf = [0u8; 8];
            assert_eq!(block_on(flash.read(&mut buf)).unwrap(), 8);
            assert_eq!(block_on(file.read(&mut buf)).unwrap(), 5);
            assert_eq!(buf[..5], [4; 5]);
        }
    }

    /// Streaming loop tests
    mod engine_tests {
        use embassy_futures::block_on;
        use platform::mocks::{MockFile, MockFileError, MockSink, MockSinkError};

        use crate::engine::{PlaybackState, StreamStats, StreamingEngine};
        use crate::error::PlaybackError;
        use crate::source::{FileSource, FlashSource};
        use crate::transform::SampleTransform;

        #[test]
        fn test_capacity_is_two_bytes_per_sample() {
            assert_eq!(StreamingEngine::<MockSink, 1024>::CAPACITY_BYTES, 2048);
        }

        #[test]
        fn test_chunks_are_bounded_by_capacity() {
            let sink = MockSink::new();
            let probe = sink.probe();
            let mut engine = StreamingEngine::<_, 1024>::new(sink, SampleTransform::Passthrough);
            let data = vec![0x11u8; 5000];
            let mut src = FlashSource::new(&data);
            let mut stats = StreamStats::default();
            block_on(engine.stream(&mut src, &mut stats)).unwrap();
            assert_eq!(probe.snapshot().writes, vec![2048, 2048, 904]);
            assert_eq!(stats.bytes_written, 5000);
            assert_eq!(stats.chunks, 3);
            assert_eq!(probe.snapshot().bytes, data);
        }

        #[test]
        fn test_trailing_odd_byte_is_written_raw() {
            let sink = MockSink::new();
            let probe = sink.probe();
            let mut engine = StreamingEngine::<_, 8>::new(sink, SampleTransform::BiasShift);
            let data = [0x00, 0x00, 0xFF, 0x7F, 0xAB];
            block_on(engine.stream(&mut FlashSource::new(&data), &mut StreamStats::default()))
                .unwrap();
            assert_eq!(probe.snapshot().bytes, vec![0x00, 0x80, 0xFF, 0xFF, 0xAB]);
        }

        #[test]
        fn test_partial_writes_are_retried() {
            let sink = MockSink::new().with_accept_limit(300);
            let probe = sink.probe();
            let mut engine = StreamingEngine::<_, 512>::new(sink, SampleTransform::Passthrough);
            let data = vec![5u8; 1024];
            let mut stats = StreamStats::default();
            block_on(engine.stream(&mut FlashSource::new(&data), &mut stats)).unwrap();
            assert_eq!(probe.snapshot().writes, vec![300, 300, 300, 124]);
            assert_eq!(stats.chunks, 1);
        }

        #[test]
        fn test_zero_accept_is_a_stall() {
            let sink = MockSink::new().with_accept_limit(0);
            let mut engine = StreamingEngine::<_, 16>::new(sink, SampleTransform::Passthrough);
            let data = [1u8; 10];
            let err = block_on(engine.stream(&mut FlashSource::new(&data), &mut StreamStats::default()))
                .unwrap_err();
            assert_eq!(err, PlaybackError::SinkStalled(10));
        }

        #[test]
        fn test_write_error_propagates() {
            let mut engine =
                StreamingEngine::<_, 16>::new(MockSink::failing_write(), SampleTransform::Passthrough);
            let data = [1u8; 10];
            let err = block_on(engine.stream(&mut FlashSource::new(&data), &mut StreamStats::default()))
                .unwrap_err();
            assert_eq!(err, PlaybackError::Sink(MockSinkError::Write));
        }

        #[test]
        fn test_read_error_keeps_earlier_chunks() {
            let sink = MockSink::new();
            let probe = sink.probe();
            let mut engine = StreamingEngine::<_, 64>::new(sink, SampleTransform::Passthrough);
            let mut src = FileSource::new(MockFile::new(vec![0u8; 512]).failing_at(128));
            let mut stats = StreamStats::default();
            let err = block_on(engine.stream(&mut src, &mut stats)).unwrap_err();
            assert_eq!(err, PlaybackError::Source(MockFileError::Read(128)));
            assert_eq!(stats.bytes_written, 128);
            assert_eq!(probe.snapshot().writes, vec![128]);
        }

        #[test]
        fn test_arm_zeroes_then_starts() {
            let sink = MockSink::new();
            let probe = sink.probe();
            let mut engine = StreamingEngine::<_, 16>::new(sink, SampleTransform::Passthrough);
            block_on(engine.arm()).unwrap();
            let log = probe.snapshot();
            assert_eq!((log.zero_count, log.start_count), (1, 1));
            assert!(log.running);
            block_on(engine.halt()).unwrap();
            block_on(engine.halt()).unwrap();
            assert!(!probe.snapshot().running);
        }

        #[test]
        fn test_state_labels() {
            assert!(!PlaybackState::Idle.is_active());
            assert!(PlaybackState::Starting.is_active());
            assert_eq!(PlaybackState::Streaming.as_str(), "streaming");
        }
    }
}
