//! Mock implementations for testing
//!
//! Host-side stand-ins for the audio sink and the file system. The sink
//! records everything the playback core does to it into a shared
//! [`SinkLog`], so tests can inspect it after the sink has been moved into a
//! player.

// Host-only test scaffolding: counters and slice copies are bounded by the
// buffers the tests hand in.
#![allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)]

use std::collections::BTreeMap;
use std::string::String;
use std::sync::{Arc, Mutex, MutexGuard};
use std::vec::Vec;

use crate::audio::AudioSink;
use crate::audio_config::SinkConfig;
use crate::storage::{File, Storage};

/// Failure injected into a [`MockSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MockSinkError {
    /// `configure` was told to fail (driver install / pin conflict).
    #[error("driver install failed")]
    DriverInstall,
    /// `write` was told to fail.
    #[error("DMA write failed")]
    Write,
}

/// Everything a [`MockSink`] has been asked to do.
#[derive(Debug, Default, Clone)]
pub struct SinkLog {
    /// Config passed to the last `configure`.
    pub config: Option<SinkConfig>,
    /// `true` between `start` and `stop`.
    pub running: bool,
    /// Number of `start` calls.
    pub start_count: usize,
    /// Number of `stop` calls.
    pub stop_count: usize,
    /// Number of `zero_buffers` calls.
    pub zero_count: usize,
    /// Byte count of each accepted write, in order.
    pub writes: Vec<usize>,
    /// Concatenation of every accepted byte.
    pub bytes: Vec<u8>,
}

impl SinkLog {
    /// Total bytes accepted across all writes.
    pub fn total_written(&self) -> usize {
        self.bytes.len()
    }

    /// Accepted bytes decoded as little-endian 16-bit words.
    pub fn words(&self) -> Vec<u16> {
        self.bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }
}

/// Shared view of a [`MockSink`]'s log that outlives the sink's move into a
/// player.
#[derive(Debug, Clone, Default)]
pub struct SinkProbe(Arc<Mutex<SinkLog>>);

impl SinkProbe {
    /// Snapshot of the log.
    pub fn snapshot(&self) -> SinkLog {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, SinkLog> {
        // A poisoned log only means another test thread panicked mid-record.
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Mock audio sink
///
/// Every write yields once to the executor before completing, modelling the
/// DMA drain that lets other tasks run while the ring fills.
pub struct MockSink {
    probe: SinkProbe,
    fail_configure: bool,
    fail_write: bool,
    accept_limit: Option<usize>,
}

impl MockSink {
    /// Create a healthy mock sink.
    pub fn new() -> Self {
        Self {
            probe: SinkProbe::default(),
            fail_configure: false,
            fail_write: false,
            accept_limit: None,
        }
    }

    /// Sink whose `configure` fails, as when the pins are already claimed.
    pub fn failing_configure() -> Self {
        Self {
            fail_configure: true,
            ..Self::new()
        }
    }

    /// Sink whose every `write` fails.
    pub fn failing_write() -> Self {
        Self {
            fail_write: true,
            ..Self::new()
        }
    }

    /// Accept at most `limit` bytes per `write` call (0 = never accept).
    #[must_use]
    pub fn with_accept_limit(mut self, limit: usize) -> Self {
        self.accept_limit = Some(limit);
        self
    }

    /// Handle for inspecting the log after the sink has been moved.
    pub fn probe(&self) -> SinkProbe {
        self.probe.clone()
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for MockSink {
    type Error = MockSinkError;

    async fn configure(&mut self, config: SinkConfig) -> Result<(), Self::Error> {
        if self.fail_configure {
            return Err(MockSinkError::DriverInstall);
        }
        self.probe.lock().config = Some(config);
        Ok(())
    }

    async fn start(&mut self) -> Result<(), Self::Error> {
        let mut log = self.probe.lock();
        log.running = true;
        log.start_count += 1;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), Self::Error> {
        let mut log = self.probe.lock();
        log.running = false;
        log.stop_count += 1;
        Ok(())
    }

    async fn zero_buffers(&mut self) -> Result<(), Self::Error> {
        self.probe.lock().zero_count += 1;
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        embassy_futures::yield_now().await;
        if self.fail_write {
            return Err(MockSinkError::Write);
        }
        let accepted = self.accept_limit.map_or(bytes.len(), |l| l.min(bytes.len()));
        if accepted > 0 {
            let mut log = self.probe.lock();
            log.writes.push(accepted);
            log.bytes.extend_from_slice(&bytes[..accepted]);
        }
        Ok(accepted)
    }
}

/// Failure raised by [`MockFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MockFileError {
    /// Injected read failure.
    #[error("read failed at offset {0}")]
    Read(u64),
    /// No file at the requested path.
    #[error("no such file")]
    NotFound,
}

/// In-memory file
#[derive(Debug, Clone)]
pub struct MockFile {
    data: Vec<u8>,
    position: u64,
    fail_at: Option<u64>,
}

impl MockFile {
    /// File holding `data`.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            position: 0,
            fail_at: None,
        }
    }

    /// Fail any read that starts at or beyond `offset`.
    #[must_use]
    pub fn failing_at(mut self, offset: u64) -> Self {
        self.fail_at = Some(offset);
        self
    }
}

impl File for MockFile {
    type Error = MockFileError;

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.fail_at.is_some_and(|at| self.position >= at) {
            return Err(MockFileError::Read(self.position));
        }
        let start = usize::try_from(self.position).unwrap_or(usize::MAX);
        let rest = self.data.get(start..).unwrap_or_default();
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.position += n as u64;
        Ok(n)
    }

    async fn seek(&mut self, pos: u64) -> Result<u64, Self::Error> {
        self.position = pos.min(self.size());
        Ok(self.position)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn position(&self) -> u64 {
        self.position
    }
}

/// In-memory file system keyed by path.
#[derive(Debug, Default)]
pub struct MockStorage {
    files: BTreeMap<String, MockFile>,
}

impl MockStorage {
    /// Empty file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at `path`.
    pub fn insert(&mut self, path: &str, file: MockFile) {
        self.files.insert(path.into(), file);
    }
}

impl Storage for MockStorage {
    type Error = MockFileError;
    type File = MockFile;

    async fn open_file(&mut self, path: &str) -> Result<Self::File, Self::Error> {
        self.files.get(path).cloned().ok_or(MockFileError::NotFound)
    }

    async fn exists(&mut self, path: &str) -> Result<bool, Self::Error> {
        Ok(self.files.contains_key(path))
    }
}
