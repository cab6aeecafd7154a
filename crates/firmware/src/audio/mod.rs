//! Audio subsystem: renderer drivers and streaming-core wiring
//!
//! Vertically sliced: one sub-directory per hardware component.
//!
//! # Structure
//!
//! - `renderer/`: amplifier drivers (`Sta350` hardware, `MockRegisterBank` for tests)
//! - `player`: spawns the playback workers against one [`playback::AudioContext`]
//!
//! # Dependency Injection
//!
//! The streaming core targets the [`platform::AudioOutput`] trait.
//! Concrete types are injected at the call site:
//!
//! ```rust,ignore
//! // Hardware:
//! let ctx = AudioContext::new(Sta350::create(&SLOT, i2c, reset, i2s, Delay)?);
//! // Tests:
//! let ctx = AudioContext::new(MockOutput::new());
//! ```

pub mod player;
pub mod renderer;

pub use player::{run_streaming_core, Sources};
pub use renderer::{DriverSlot, MockRegisterBank, Sta350, Sta350Error};
