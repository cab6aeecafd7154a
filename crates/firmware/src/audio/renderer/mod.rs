//! Renderer drivers: the devices behind [`platform::AudioOutput`]
//!
//! - `sta350`: STA350 amplifier on I²C + I²S
//! - `mock`: register-bank I²C device for host tests (always available)

pub mod mock;
pub mod sta350;

pub use mock::MockRegisterBank;
pub use sta350::{DriverSlot, Sta350, Sta350Error};
