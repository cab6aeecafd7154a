//! Streaming core: radio, file and Bluetooth sources feeding the renderer.
//!
//! ```text
//!  RadioFetcher ──┐
//!                 ├─► StreamBuffer ─► DecodeWorker ─┐
//!  FileFetcher ───┘                                 ├─► AudioOutput
//!  BluetoothFetcher ────────────────────────────────┘
//! ```
//!
//! Every worker is a long-lived task running [`session::run_worker`]; the
//! [`audio::Audio`] facade starts and stops sessions through the controls
//! kept in [`audio::AudioContext`].
#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![allow(async_fn_in_trait)] // Embassy executors are single-threaded; no Send bounds

#[macro_use]
mod fmt;

pub mod audio;
pub mod decode;
pub mod decoder;
pub mod fetch;
pub mod http;
pub mod icy;
pub mod mp3_decoder;
pub mod ring_buffer;
pub mod session;
pub mod track;
pub mod volume;

pub use audio::{Audio, AudioContext, AudioError, Source, SourceState, STREAM_BUFFER_BYTES};
pub use decode::DecodeWorker;
pub use decoder::{AudioFormat, DecodeError, FrameDecoder, PcmFrame};
pub use fetch::bluetooth::{BluetoothControl, BluetoothFetcher, BluetoothRequest};
pub use fetch::file::{FileFetcher, FileRequest};
pub use fetch::radio::{RadioError, RadioFetcher, RadioRequest};
pub use http::StreamLocator;
pub use mp3_decoder::NanoMp3Decoder;
pub use ring_buffer::{BufferError, StreamBuffer};
pub use session::{run_worker, CancelToken, SessionControl, Worker};
pub use track::{TitleSignal, TrackListener, TrackTitle};
pub use volume::VolumeControl;
