//! Hardware Abstraction Layer (HAL) for the Pocket Radio player
//!
//! This crate provides trait-based abstractions for every peripheral the
//! streaming core touches, enabling development and testing without the
//! physical board.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate)
//!         ↓
//! Feature Layers (playback, bluetooth)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (Embassy HAL, network stack, BT controller)
//! ```
//!
//! # Abstraction Levels
//!
//! - [`AudioOutput`] - PCM sink with volume and enable control
//! - [`I2sBus`] - Synchronous audio bus feeding the amplifier
//! - [`TcpConnect`] - Outgoing TCP connections for HTTP radio
//! - [`Storage`] - Read-only file access for local music
//! - [`A2dpSink`] - Bluetooth A2DP/AVRCP stack event stream
//!
//! # Features
//!
//! - `std`: Enable standard library support (local storage, mocks)
//! - `hardware`: Physical hardware implementations
//! - `defmt`: Enable defmt logging derives

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names and codec names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

pub mod audio;
pub mod audio_types;
pub mod bluetooth;
pub mod config;
pub mod network;
pub mod storage;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

#[cfg(any(test, feature = "std"))]
pub mod storage_local;

// Re-export main high-level traits
pub use audio::{AudioOutput, BusWait, I2sBus};
pub use audio_types::{OutOfRangeError, SampleRateHz, VolumeRegister, VolumeStep};
pub use bluetooth::{A2dpSink, ConnectionState, MediaCodec, PeerAddress, SinkEvent};
pub use network::TcpConnect;
pub use storage::{File, Storage};
