//! STA350 digital amplifier (ST Microelectronics)
//!
//! Control over I²C, audio over I²S. The driver is host-testable; the
//! board wiring supplies the concrete I²C, GPIO and bus types.

pub mod registers;

mod driver;

pub use driver::{DriverSlot, Sta350, Sta350Error, READ_TIMEOUT, RESET_HOLD_MS, WRITE_TIMEOUT};
