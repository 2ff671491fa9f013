//! Hardware Abstraction Layer (HAL) for the WAV streaming player
//!
//! This crate provides trait-based abstractions for the collaborators the
//! playback core drives but does not own, enabling development and testing
//! without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (setup / loop wiring, not part of this workspace)
//!         ↓
//! Feature Layer (playback: streaming engine + lifecycle controller)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (I²S / DAC / PDM driver, SPIFFS, flash)
//! ```
//!
//! # Abstractions
//!
//! - [`AudioSink`] - DMA-backed audio output peripheral
//! - [`ByteSource`] - Sequential byte provider feeding a playback session
//! - [`Storage`] / [`File`] - File system access
//!
//! # Features
//!
//! - `std`: Enable standard library support (mocks, `LocalFileStorage`)
//! - `defmt`: Enable defmt logging derives
//!
//! # Example
//!
//! ```no_run
//! use platform::{AudioSink, SinkConfig};
//!
//! async fn bring_up<S: AudioSink>(sink: &mut S) -> Result<(), S::Error> {
//!     sink.configure(SinkConfig::builtin_dac()).await?;
//!     sink.zero_buffers().await?;
//!     sink.start().await
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)] // peripheral and pin names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod audio;
pub mod audio_config;
pub mod audio_types;
pub mod config;
pub mod source;
pub mod storage;

#[cfg(any(test, feature = "std"))]
pub mod mocks;
#[cfg(any(test, feature = "std"))]
pub mod storage_local;

// Re-export main high-level traits
pub use audio::AudioSink;
pub use audio_config::{ChannelLayout, OutputMode, SinkConfig, WireFormat};
pub use audio_types::{OutOfRangeError, SampleRateHz};
pub use source::ByteSource;
pub use storage::{File, Storage};
