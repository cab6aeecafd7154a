//! Pocket Radio Firmware
//!
//! Board layer of the portable radio: the STA350 renderer and the task that
//! runs the streaming core on top of it.
//!
//! # Architecture
//!
//! This firmware follows a layered architecture:
//!
//! ```text
//! Application Layer (board bring-up, UI task)
//!         ↓
//! Board Drivers (this crate: STA350 renderer, worker wiring)
//!         ↓
//! Streaming Core (playback, bluetooth)
//!         ↓
//! Platform HAL (trait abstractions + host mocks)
//! ```
//!
//! # Features
//!
//! - `hardware` - Target build: defmt logging and the MPEG decoder
//! - `defmt` - defmt logging only
//! - `tracing` - Host logging through the playback crate
//! - `std` - Standard library support (host testing)

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Critical correctness: deny these
#![deny(clippy::await_holding_lock)] // holding a blocking Mutex across .await is a bug
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
// Logging discipline (allow println in tests via clippy.toml)
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)] // common in Rust crates; not a real issue
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed
// Pedantic lints too noisy for firmware application code:
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]

pub mod audio;

// Re-export key types
pub use audio::{run_streaming_core, DriverSlot, MockRegisterBank, Sources, Sta350, Sta350Error};
