//! Start/stop lifecycle of the player against a mock sink.
//!
//! Background sessions need the runner polled, so those tests race
//! `player.run()` against the test body on a single-threaded runtime.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]

use core::future::{ready, Future};
use core::pin::pin;

use embassy_futures::join::join;
use embassy_futures::select::{select, Either};
use embassy_futures::yield_now;
use embassy_sync::blocking_mutex::raw::{NoopRawMutex, RawMutex};
use platform::mocks::{MockSink, MockSinkError};
use platform::{AudioSink, ByteSource, SinkConfig};
use playback::transform::{bias_shift, gain_clamp};
use playback::{
    ExecutionMode, FlashSource, OutputProfile, PlaybackError, PlaybackState, Player,
    SessionEnd, SessionReport, StartOutcome,
};

type TestPlayer<'a> = Player<NoopRawMutex, MockSink, FlashSource<'a>, 1024>;

/// Embedded clip whose seek takes one trip through the executor, like a
/// file system that has to fetch a block first.
#[derive(Clone)]
struct SlowSeek<'a>(FlashSource<'a>);

impl ByteSource for SlowSeek<'_> {
    type Error = core::convert::Infallible;

    fn is_valid(&self) -> bool {
        self.0.is_valid()
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.0.read(buf).await
    }

    fn available(&self) -> usize {
        self.0.available()
    }

    fn total_len(&self) -> Option<usize> {
        self.0.total_len()
    }

    async fn seek(&mut self, pos: usize) -> Result<(), Self::Error> {
        yield_now().await;
        self.0.seek(pos).await
    }

    fn close(&mut self) {
        self.0.close();
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// 44-byte header followed by `samples` as little-endian PCM.
fn clip(samples: &[i16]) -> Vec<u8> {
    let mut data = vec![0u8; 44];
    data[..4].copy_from_slice(b"RIFF");
    data[8..12].copy_from_slice(b"WAVE");
    for s in samples {
        data.extend_from_slice(&s.to_le_bytes());
    }
    data
}

fn ramp(len: usize) -> Vec<i16> {
    (0..len).map(|i| (i as u16).wrapping_mul(37) as i16).collect()
}

/// Run `body` while the player's background runner is polled.
async fn drive<M, K, S, const N: usize, F>(player: &Player<M, K, S, N>, body: F) -> F::Output
where
    M: RawMutex,
    K: AudioSink,
    S: ByteSource,
    F: Future,
{
    match select(player.run(), body).await {
        Either::First(never) => never,
        Either::Second(out) => out,
    }
}

async fn wait_idle<M: RawMutex, K: AudioSink, S: ByteSource, const N: usize>(
    player: &Player<M, K, S, N>,
) {
    while player.state() != PlaybackState::Idle {
        yield_now().await;
    }
}

#[tokio::test]
async fn test_new_configures_sink_and_is_idle() {
    init_logging();
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();
    assert_eq!(player.state(), PlaybackState::Idle);
    let log = probe.snapshot();
    assert_eq!(log.config, Some(SinkConfig::builtin_dac()));
    assert_eq!(log.start_count, 0);
}

#[tokio::test]
async fn test_configure_failure_is_reported_at_construction() {
    let result: Result<TestPlayer<'_>, _> =
        Player::new(MockSink::failing_configure(), OutputProfile::builtin_dac()).await;
    assert!(matches!(result, Err(PlaybackError::Sink(MockSinkError::DriverInstall))));
}

#[tokio::test]
async fn test_blocking_start_plays_whole_payload() {
    init_logging();
    let samples = ramp(1024);
    let data = clip(&samples);
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();

    let outcome = player
        .start(FlashSource::new(&data), ExecutionMode::Blocking)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        StartOutcome::Finished(SessionReport {
            end: SessionEnd::Exhausted,
            bytes_written: 2048,
            chunks: 1,
        })
    );
    let log = probe.snapshot();
    assert_eq!(log.writes, vec![2048]);
    assert_eq!((log.zero_count, log.start_count, log.stop_count), (1, 1, 1));
    assert!(!log.running);
    let expected: Vec<u16> = samples.iter().map(|&s| bias_shift(s)).collect();
    assert_eq!(log.words(), expected);
    assert_eq!(player.state(), PlaybackState::Idle);
}

#[tokio::test]
async fn test_chunk_count_follows_buffer_capacity() {
    let data = clip(&ramp(1024));
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: Player<NoopRawMutex, MockSink, FlashSource<'_>, 512> =
        Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();

    let outcome = player
        .start(FlashSource::new(&data), ExecutionMode::Blocking)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        StartOutcome::Finished(SessionReport { bytes_written: 2048, chunks: 2, .. })
    ));
    assert_eq!(probe.snapshot().writes, vec![1024, 1024]);
    assert_eq!(player.state(), PlaybackState::Idle);
}

#[tokio::test]
async fn test_pdm_profile_applies_gain() {
    let samples = [0i16, 100, -100, 3_277, -32_768];
    let data = clip(&samples);
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::pdm(25)).await.unwrap();
    player
        .start(FlashSource::new(&data), ExecutionMode::Blocking)
        .await
        .unwrap();

    let log = probe.snapshot();
    assert_eq!(log.config, Some(SinkConfig::pdm(25)));
    let got: Vec<i16> = log.words().into_iter().map(|w| w as i16).collect();
    let expected: Vec<i16> = samples.iter().map(|&s| gain_clamp(s, 10.0)).collect();
    assert_eq!(got, expected);
    assert_eq!(got[3], 32_767);
    assert_eq!(got[4], -32_767);
}

#[tokio::test]
async fn test_header_is_never_written() {
    let data = clip(&[]);
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();
    let outcome = player
        .start(FlashSource::new(&data), ExecutionMode::Blocking)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        StartOutcome::Finished(SessionReport { end: SessionEnd::Exhausted, bytes_written: 0, .. })
    ));
    assert!(probe.snapshot().writes.is_empty());
}

#[tokio::test]
async fn test_truncated_source_writes_nothing() {
    let data = [0u8; 20];
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();
    let outcome = player
        .start(FlashSource::new(&data), ExecutionMode::Blocking)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        StartOutcome::Finished(SessionReport { end: SessionEnd::Truncated, bytes_written: 0, .. })
    ));
    let log = probe.snapshot();
    assert!(log.writes.is_empty());
    assert!(!log.running);
    assert_eq!(player.state(), PlaybackState::Idle);
}

#[tokio::test]
async fn test_invalid_source_is_rejected_without_touching_sink() {
    let data = clip(&ramp(8));
    let mut source = FlashSource::new(&data);
    source.close();
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();
    let result = player.start(source, ExecutionMode::Background).await;
    assert_eq!(result, Err(PlaybackError::InvalidSource));
    assert_eq!(probe.snapshot().start_count, 0);
    assert_eq!(player.state(), PlaybackState::Idle);
}

#[tokio::test]
async fn test_played_source_is_rewound_to_payload() {
    let samples = ramp(64);
    let data = clip(&samples);
    let mut source = FlashSource::new(&data);
    let mut scratch = vec![0u8; data.len()];
    source.read(&mut scratch).await.unwrap();
    assert_eq!(source.available(), 0);

    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();
    player.start(source.clone(), ExecutionMode::Blocking).await.unwrap();
    assert_eq!(probe.snapshot().total_written(), 128);
}

#[tokio::test]
async fn test_background_start_returns_before_streaming() {
    init_logging();
    let samples = ramp(4096);
    let data = clip(&samples);
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();

    drive(&player, async {
        let outcome = player
            .start(FlashSource::new(&data), ExecutionMode::Background)
            .await
            .unwrap();
        assert_eq!(outcome, StartOutcome::Spawned);
        assert_eq!(player.state(), PlaybackState::Streaming);
        let log = probe.snapshot();
        assert!(log.running);
        assert!(log.writes.is_empty());
        wait_idle(&player).await;
    })
    .await;

    let log = probe.snapshot();
    assert_eq!(log.writes, vec![2048; 4]);
    assert!(!log.running);
    let expected: Vec<u16> = samples.iter().map(|&s| bias_shift(s)).collect();
    assert_eq!(log.words(), expected);
}

#[tokio::test]
async fn test_second_start_while_active_is_ignored() {
    let first = clip(&[1_000; 4096]);
    let second = clip(&[-1_000; 4096]);
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();

    drive(&player, async {
        let a = player.start(FlashSource::new(&first), ExecutionMode::Background).await;
        let b = player.start(FlashSource::new(&second), ExecutionMode::Background).await;
        assert_eq!(a, Ok(StartOutcome::Spawned));
        assert_eq!(b, Ok(StartOutcome::Ignored));
        let c = player.start(FlashSource::new(&second), ExecutionMode::Blocking).await;
        assert_eq!(c, Ok(StartOutcome::Ignored));
        wait_idle(&player).await;
    })
    .await;

    let log = probe.snapshot();
    assert_eq!(log.start_count, 1);
    assert_eq!(log.total_written(), 8192);
    assert!(log.words().iter().all(|&w| w == bias_shift(1_000)));
}

#[tokio::test]
async fn test_stop_mid_stream_leaves_a_prefix() {
    let samples = ramp(32 * 1024);
    let data = clip(&samples);
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();

    drive(&player, async {
        player
            .start(FlashSource::new(&data), ExecutionMode::Background)
            .await
            .unwrap();
        for _ in 0..6 {
            yield_now().await;
        }
        player.stop().await.unwrap();
        assert_eq!(player.state(), PlaybackState::Idle);
    })
    .await;

    let log = probe.snapshot();
    assert!(!log.running);
    assert!(log.total_written() < samples.len() * 2);
    let expected: Vec<u16> = samples.iter().map(|&s| bias_shift(s)).collect();
    let words = log.words();
    assert_eq!(words[..], expected[..words.len()]);
}

#[tokio::test]
async fn test_stop_before_runner_polls_cancels_cleanly() {
    let data = clip(&ramp(4096));
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();

    drive(&player, async {
        player
            .start(FlashSource::new(&data), ExecutionMode::Background)
            .await
            .unwrap();
        player.stop().await.unwrap();
    })
    .await;

    let log = probe.snapshot();
    assert!(log.writes.is_empty());
    assert!(!log.running);
    assert_eq!(player.state(), PlaybackState::Idle);
}

#[tokio::test]
async fn test_stop_while_idle_still_stops_sink() {
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();
    player.stop().await.unwrap();
    player.stop().await.unwrap();
    assert_eq!(probe.snapshot().stop_count, 2);
    assert_eq!(player.state(), PlaybackState::Idle);
}

#[tokio::test]
async fn test_stop_cancels_blocking_session() {
    let data = clip(&ramp(16 * 1024));
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();

    let (outcome, stopped) = join(
        player.start(FlashSource::new(&data), ExecutionMode::Blocking),
        async {
            for _ in 0..4 {
                yield_now().await;
            }
            player.stop().await
        },
    )
    .await;

    stopped.unwrap();
    match outcome.unwrap() {
        StartOutcome::Finished(report) => {
            assert_eq!(report.end, SessionEnd::Cancelled);
            assert_eq!(report.bytes_written, probe.snapshot().total_written());
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(player.state(), PlaybackState::Idle);
    assert!(!probe.snapshot().running);
}

#[tokio::test]
async fn test_player_restarts_after_background_session() {
    let first = clip(&ramp(100));
    let second = clip(&ramp(300));
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();

    drive(&player, async {
        player
            .start(FlashSource::new(&first), ExecutionMode::Background)
            .await
            .unwrap();
        wait_idle(&player).await;
        let again = player
            .start(FlashSource::new(&second), ExecutionMode::Background)
            .await;
        assert_eq!(again, Ok(StartOutcome::Spawned));
        wait_idle(&player).await;
    })
    .await;

    let log = probe.snapshot();
    assert_eq!(log.start_count, 2);
    assert_eq!(log.total_written(), 800);
}

#[tokio::test]
async fn test_background_write_failure_returns_to_idle() {
    let data = clip(&ramp(64));
    let sink = MockSink::failing_write();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();

    drive(&player, async {
        let outcome = player
            .start(FlashSource::new(&data), ExecutionMode::Background)
            .await;
        assert_eq!(outcome, Ok(StartOutcome::Spawned));
        wait_idle(&player).await;
    })
    .await;

    let log = probe.snapshot();
    assert!(log.writes.is_empty());
    assert!(!log.running);
}

#[tokio::test]
async fn test_blocking_write_failure_is_returned() {
    let data = clip(&ramp(64));
    let player: TestPlayer<'_> =
        Player::new(MockSink::failing_write(), OutputProfile::builtin_dac()).await.unwrap();
    let outcome = player
        .start(FlashSource::new(&data), ExecutionMode::Blocking)
        .await;
    assert_eq!(outcome, Err(PlaybackError::Sink(MockSinkError::Write)));
    assert_eq!(player.state(), PlaybackState::Idle);
}

#[tokio::test]
async fn test_shutdown_returns_stopped_sink() {
    let data = clip(&ramp(16));
    let player: TestPlayer<'_> = Player::new(MockSink::new(), OutputProfile::builtin_dac())
        .await
        .unwrap();
    player
        .start(FlashSource::new(&data), ExecutionMode::Blocking)
        .await
        .unwrap();
    let sink = player.shutdown().await.unwrap();
    let log = sink.probe().snapshot();
    assert!(!log.running);
    assert_eq!(log.total_written(), 32);
}

#[tokio::test]
async fn test_dropped_blocking_start_returns_to_idle() {
    let data = clip(&ramp(16 * 1024));
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();

    let timed_out = select(
        player.start(FlashSource::new(&data), ExecutionMode::Blocking),
        async {
            for _ in 0..3 {
                yield_now().await;
            }
        },
    )
    .await;
    assert!(matches!(timed_out, Either::Second(())));
    assert_eq!(player.state(), PlaybackState::Idle);
    assert!(probe.snapshot().running);

    player.stop().await.unwrap();
    assert_eq!(player.state(), PlaybackState::Idle);
    assert!(!probe.snapshot().running);

    let outcome = player
        .start(FlashSource::new(&data), ExecutionMode::Blocking)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        StartOutcome::Finished(SessionReport { end: SessionEnd::Exhausted, .. })
    ));
}

#[tokio::test]
async fn test_dropped_background_start_does_not_block_stop() {
    let data = clip(&ramp(2048));
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: Player<NoopRawMutex, MockSink, SlowSeek<'_>> =
        Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();
    let source = SlowSeek(FlashSource::new(&data));

    // Dropped while the header seek is still pending.
    let dropped = select(
        player.start(source.clone(), ExecutionMode::Background),
        ready(()),
    )
    .await;
    assert!(matches!(dropped, Either::Second(())));
    assert_eq!(player.state(), PlaybackState::Idle);
    assert_eq!(probe.snapshot().start_count, 0);

    drive(&player, async {
        player.stop().await.unwrap();
        let again = player.start(source.clone(), ExecutionMode::Background).await;
        assert_eq!(again, Ok(StartOutcome::Spawned));
        wait_idle(&player).await;
    })
    .await;
    assert_eq!(probe.snapshot().total_written(), 4096);
}

#[tokio::test]
async fn test_leftover_cancel_does_not_cut_next_session() {
    let data = clip(&ramp(8 * 1024));
    let sink = MockSink::new();
    let probe = sink.probe();
    let player: TestPlayer<'_> = Player::new(sink, OutputProfile::builtin_dac()).await.unwrap();

    {
        let mut session = pin!(player.start(FlashSource::new(&data), ExecutionMode::Blocking));
        let polled = select(session.as_mut(), yield_now()).await;
        assert!(matches!(polled, Either::Second(())));
        // Raise the cancel, then abandon both the stop and the session
        // before the session ever observes it.
        let stopping = select(player.stop(), ready(())).await;
        assert!(matches!(stopping, Either::Second(())));
    }
    assert_eq!(player.state(), PlaybackState::Idle);

    let before = probe.snapshot().total_written();
    let outcome = player
        .start(FlashSource::new(&data), ExecutionMode::Blocking)
        .await
        .unwrap();
    match outcome {
        StartOutcome::Finished(report) => {
            assert_eq!(report.end, SessionEnd::Exhausted);
            assert_eq!(report.bytes_written, 16 * 1024);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(probe.snapshot().total_written(), before + 16 * 1024);
}
