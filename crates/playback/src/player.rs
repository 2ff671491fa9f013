//! Playback lifecycle controller.
//!
//! [`Player`] turns the streaming engine into something an application can
//! start and stop at will. It owns the engine behind an async mutex and
//! keeps a small [`Control`] record behind a blocking mutex:
//!
//! ```text
//!           start (guard passed)         sink armed
//!   Idle ─────────────────────► Starting ───────────► Streaming
//!    ▲                                                    │
//!    └──────── exhausted / stopped / failed ◄─────────────┘
//! ```
//!
//! # Execution modes
//!
//! - [`ExecutionMode::Blocking`]: the session runs inside the `start` call
//!   and `start` returns its [`SessionReport`].
//! - [`ExecutionMode::Background`]: `start` prepares the sink, hands the
//!   source to the runner future ([`Player::run`]) and returns at once. The
//!   runner signals completion; the next call that observes the player
//!   (`state`, `start`, `stop`) clears the state.
//!
//! The runner is a single long-lived future, spawned once alongside the
//! player. At most one session exists at any time, so at most one unit of
//! execution streams.
//!
//! # Stopping
//!
//! [`Player::stop`] raises a cancel signal. The streaming loop is raced
//! against that signal with the signal polled first, so cancellation lands
//! at the next read or write. A background stop then waits for the runner
//! to report before returning; the sink is stopped in every case, even when
//! nothing is playing. The source is never closed by the player.

use core::cell::Cell;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use platform::config::WORKING_BUFFER_SAMPLES;
use platform::{AudioSink, ByteSource};

use crate::engine::{PlaybackState, StreamStats, StreamingEngine};
use crate::error::PlaybackError;
use crate::profile::OutputProfile;
use crate::wav::{self, HeaderSkip};

/// Error returned by [`Player`] for a given sink and source.
pub type PlayerError<K, S> =
    PlaybackError<<K as AudioSink>::Error, <S as ByteSource>::Error>;

/// Where a session runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExecutionMode {
    /// In the caller's context; `start` returns when playback ends.
    Blocking,
    /// In the runner future; `start` returns once the sink is running.
    #[default]
    Background,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionEnd {
    /// A read returned 0.
    Exhausted,
    /// [`Player::stop`] interrupted the session.
    Cancelled,
    /// The source was shorter than a WAV header; nothing was written.
    Truncated,
    /// The source or the sink reported an error.
    Failed,
}

impl ExecutionMode {
    /// Short label for log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Blocking => "blocking",
            ExecutionMode::Background => "background",
        }
    }
}

impl SessionEnd {
    /// Short label for log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEnd::Exhausted => "exhausted",
            SessionEnd::Cancelled => "cancelled",
            SessionEnd::Truncated => "truncated",
            SessionEnd::Failed => "failed",
        }
    }
}

/// Summary of one finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionReport {
    /// How the session ended.
    pub end: SessionEnd,
    /// Bytes handed to the sink in fully written chunks.
    pub bytes_written: usize,
    /// Number of fully written chunks.
    pub chunks: usize,
}

impl SessionReport {
    fn new(end: SessionEnd, stats: StreamStats) -> Self {
        Self {
            end,
            bytes_written: stats.bytes_written,
            chunks: stats.chunks,
        }
    }
}

/// What a call to [`Player::start`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartOutcome {
    /// A session was already active; nothing changed.
    Ignored,
    /// The session was handed to the runner.
    Spawned,
    /// The session ran to completion in the caller's context.
    Finished(SessionReport),
}

#[derive(Debug, Clone, Copy)]
struct Control {
    state: PlaybackState,
    mode: ExecutionMode,
    /// A stop has been requested and will clear the state itself.
    stopping: bool,
}

impl Control {
    const IDLE: Self = Self {
        state: PlaybackState::Idle,
        mode: ExecutionMode::Background,
        stopping: false,
    };
}

enum Claim {
    Granted,
    Busy(PlaybackState),
    InvalidSource,
}

struct Session<S> {
    source: S,
    header: HeaderSkip,
}

/// Puts the player back to idle if a `start` future is dropped before its
/// session is handed to the runner or finished in place.
///
/// The sink is left as it was; the next [`Player::stop`] stops it.
struct StartGuard<'a, M, K, S, const N: usize>
where
    M: RawMutex,
    K: AudioSink,
    S: ByteSource,
{
    player: &'a Player<M, K, S, N>,
    mode: ExecutionMode,
    armed: bool,
}

impl<'a, M, K, S, const N: usize> StartGuard<'a, M, K, S, N>
where
    M: RawMutex,
    K: AudioSink,
    S: ByteSource,
{
    fn new(player: &'a Player<M, K, S, N>, mode: ExecutionMode) -> Self {
        Self {
            player,
            mode,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<M, K, S, const N: usize> Drop for StartGuard<'_, M, K, S, N>
where
    M: RawMutex,
    K: AudioSink,
    S: ByteSource,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("start dropped before the session was handed off");
        self.player.control.lock(|cell| cell.set(Control::IDLE));
        if self.mode == ExecutionMode::Background {
            // A stop may be joining a session that will never reach the runner.
            self.player
                .finished
                .signal(SessionReport::new(SessionEnd::Cancelled, StreamStats::default()));
        }
    }
}

/// Streams WAV payloads from sources of type `S` into the sink `K`.
///
/// `M` picks the mutex flavour: `CriticalSectionRawMutex` when the player is
/// shared between executors or interrupts, `NoopRawMutex` on a single
/// executor. `N` is the working-buffer capacity in samples.
///
/// ```ignore
/// static PLAYER: StaticCell<Player<CriticalSectionRawMutex, I2sDac, FlashSource<'static>>> =
///     StaticCell::new();
///
/// let player = PLAYER.init(Player::new(dac, OutputProfile::builtin_dac()).await?);
/// spawner.must_spawn(playback_runner(player)); // loops on player.run()
/// player.start(FlashSource::new(CLIP), ExecutionMode::Background).await?;
/// ```
pub struct Player<M, K, S, const N: usize = { WORKING_BUFFER_SAMPLES }>
where
    M: RawMutex,
    K: AudioSink,
    S: ByteSource,
{
    control: BlockingMutex<M, Cell<Control>>,
    engine: Mutex<M, StreamingEngine<K, N>>,
    session: Signal<M, Session<S>>,
    cancel: Signal<M, ()>,
    finished: Signal<M, SessionReport>,
}

impl<M, K, S, const N: usize> Player<M, K, S, N>
where
    M: RawMutex,
    K: AudioSink,
    S: ByteSource,
{
    /// Configure `sink` for `profile` and build an idle player around it.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::Sink`] if the driver rejects the configuration, for
    /// example because its pins are already claimed.
    pub async fn new(mut sink: K, profile: OutputProfile) -> Result<Self, PlayerError<K, S>> {
        sink.configure(profile.sink)
            .await
            .map_err(PlaybackError::Sink)?;
        info!(
            "sink configured: {} Hz, {}",
            profile.sink.sample_rate.get(),
            profile.transform.as_str()
        );
        Ok(Self {
            control: BlockingMutex::new(Cell::new(Control::IDLE)),
            engine: Mutex::new(StreamingEngine::new(sink, profile.transform)),
            session: Signal::new(),
            cancel: Signal::new(),
            finished: Signal::new(),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PlaybackState {
        self.reap();
        self.control.lock(|cell| cell.get().state)
    }

    /// `true` while a session is claimed.
    pub fn is_playing(&self) -> bool {
        self.state().is_active()
    }

    /// Play `source` from the first byte after its WAV header.
    ///
    /// Returns [`StartOutcome::Ignored`] without touching the source or the
    /// sink if a session is already active. Otherwise the source is seeked
    /// to the payload, the sink's buffers are zeroed, the sink is started
    /// and streaming begins in the context chosen by `mode`.
    ///
    /// Dropping the returned future before it completes puts the player back
    /// to idle; call [`stop`](Self::stop) afterwards to stop the sink.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::InvalidSource`] if the source is closed or empty.
    /// - Any error raised while preparing the sink or seeking the source.
    /// - In blocking mode, any error raised while streaming.
    pub async fn start(
        &self,
        mut source: S,
        mode: ExecutionMode,
    ) -> Result<StartOutcome, PlayerError<K, S>> {
        self.reap();
        match self.claim(&source, mode) {
            Claim::Granted => {}
            Claim::Busy(state) => {
                debug!("start ignored: player is {}", state.as_str());
                return Ok(StartOutcome::Ignored);
            }
            Claim::InvalidSource => return Err(PlaybackError::InvalidSource),
        }
        let mut guard = StartGuard::new(self, mode);
        info!(
            "session start: {}, {} bytes",
            mode.as_str(),
            source.total_len().unwrap_or(0)
        );

        let mut engine = self.engine.lock().await;
        let armed = Self::prepare(&mut engine, &mut source).await;
        self.set_state(PlaybackState::Streaming);

        match (mode, armed) {
            (ExecutionMode::Blocking, Ok(header)) => {
                let (report, result) = self.run_session(&mut engine, &mut source, header).await;
                guard.disarm();
                self.control.lock(|cell| cell.set(Control::IDLE));
                drop(engine);
                log_report(&report);
                result.map(|()| StartOutcome::Finished(report))
            }
            (ExecutionMode::Background, Ok(header)) => {
                guard.disarm();
                drop(engine);
                info!("session handed to runner");
                self.session.signal(Session { source, header });
                Ok(StartOutcome::Spawned)
            }
            (ExecutionMode::Blocking, Err(err)) => {
                Self::abort(&mut engine).await;
                guard.disarm();
                self.control.lock(|cell| cell.set(Control::IDLE));
                Err(err)
            }
            (ExecutionMode::Background, Err(err)) => {
                let report = Self::abort(&mut engine).await;
                guard.disarm();
                drop(engine);
                // A concurrent stop is waiting on this.
                self.finished.signal(report);
                Err(err)
            }
        }
    }

    /// Cancel the active session, if any, and stop the sink.
    ///
    /// Safe to call at any time. In background mode this waits until the
    /// runner has acknowledged the cancellation, so on return the player is
    /// idle. The source is not closed.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::Sink`] if stopping the sink fails.
    pub async fn stop(&self) -> Result<(), PlayerError<K, S>> {
        self.reap();
        let pending = self.control.lock(|cell| {
            let mut ctl = cell.get();
            if !ctl.state.is_active() || ctl.stopping {
                return None;
            }
            ctl.stopping = true;
            cell.set(ctl);
            Some((ctl.state, ctl.mode))
        });

        if let Some((state, mode)) = pending {
            info!("stop requested while {}", state.as_str());
            self.cancel.signal(());
            if mode == ExecutionMode::Background {
                let report = self.finished.wait().await;
                self.control.lock(|cell| cell.set(Control::IDLE));
                log_report(&report);
            }
        }

        let mut engine = self.engine.lock().await;
        engine.halt().await.map_err(PlaybackError::Sink)
    }

    /// Stop playback and give the sink back.
    ///
    /// # Errors
    ///
    /// Whatever [`stop`](Self::stop) reports.
    pub async fn shutdown(self) -> Result<K, PlayerError<K, S>> {
        self.stop().await?;
        Ok(self.engine.into_inner().into_sink())
    }

    /// Background runner. Never returns.
    ///
    /// Must be polled for the player's whole life (spawn it as a task, or
    /// `select` it against the application) for background sessions to make
    /// progress. Sessions are taken one at a time; each one holds the engine
    /// until it ends, then signals its report.
    pub async fn run(&self) -> ! {
        loop {
            let Session { mut source, header } = self.session.wait().await;
            let mut engine = self.engine.lock().await;
            let (report, result) = self.run_session(&mut engine, &mut source, header).await;
            drop(engine);
            drop(source);
            if let Err(err) = result {
                warn!("background session failed: {}", err.as_str());
            }
            log_report(&report);
            self.finished.signal(report);
        }
    }

    fn claim(&self, source: &S, mode: ExecutionMode) -> Claim {
        self.control.lock(|cell| {
            let ctl = cell.get();
            if ctl.state.is_active() {
                return Claim::Busy(ctl.state);
            }
            if !source.is_valid() {
                return Claim::InvalidSource;
            }
            cell.set(Control {
                state: PlaybackState::Starting,
                mode,
                stopping: false,
            });
            // Inside the claim, so a stop racing in from another core cannot
            // have its cancel wiped.
            self.cancel.reset();
            self.finished.reset();
            Claim::Granted
        })
    }

    fn set_state(&self, state: PlaybackState) {
        self.control.lock(|cell| {
            let mut ctl = cell.get();
            ctl.state = state;
            cell.set(ctl);
        });
    }

    /// Clear the state of a background session whose runner has finished,
    /// unless a stop is already waiting to do it.
    fn reap(&self) {
        self.control.lock(|cell| {
            let ctl = cell.get();
            let reapable =
                ctl.state.is_active() && ctl.mode == ExecutionMode::Background && !ctl.stopping;
            if reapable && self.finished.try_take().is_some() {
                cell.set(Control::IDLE);
            }
        });
    }

    async fn prepare(
        engine: &mut StreamingEngine<K, N>,
        source: &mut S,
    ) -> Result<HeaderSkip, PlayerError<K, S>> {
        let header = wav::skip_header(source)
            .await
            .map_err(PlaybackError::Source)?;
        engine.arm().await.map_err(PlaybackError::Sink)?;
        Ok(header)
    }

    /// Stop the sink after a failed preparation.
    async fn abort(engine: &mut StreamingEngine<K, N>) -> SessionReport {
        if engine.halt().await.is_err() {
            warn!("sink stop failed after aborted start");
        }
        SessionReport::new(SessionEnd::Failed, StreamStats::default())
    }

    async fn run_session(
        &self,
        engine: &mut StreamingEngine<K, N>,
        source: &mut S,
        header: HeaderSkip,
    ) -> (SessionReport, Result<(), PlayerError<K, S>>) {
        let mut stats = StreamStats::default();
        let streamed = match header {
            HeaderSkip::Truncated => {
                warn!("source shorter than a WAV header, nothing to play");
                Ok(SessionEnd::Truncated)
            }
            HeaderSkip::Skipped => {
                match select(self.cancel.wait(), engine.stream(source, &mut stats)).await {
                    Either::First(()) => Ok(SessionEnd::Cancelled),
                    Either::Second(Ok(())) => Ok(SessionEnd::Exhausted),
                    Either::Second(Err(err)) => Err(err),
                }
            }
        };

        let halted = engine.halt().await.map_err(PlaybackError::Sink);
        let (end, result) = match (streamed, halted) {
            (Ok(end), Ok(())) => (end, Ok(())),
            (Err(err), _) | (Ok(_), Err(err)) => (SessionEnd::Failed, Err(err)),
        };
        (SessionReport::new(end, stats), result)
    }
}

fn log_report(report: &SessionReport) {
    info!(
        "session {}: {} bytes in {} chunks",
        report.end.as_str(),
        report.bytes_written,
        report.chunks
    );
}
