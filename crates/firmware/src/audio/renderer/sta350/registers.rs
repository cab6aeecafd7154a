//! STA350 register map (the subset the renderer touches)
//!
//! Source: ST STA350BW datasheet, DocID 022714.
//!
//! # Key I²C Constraints
//!
//! ## Addressing
//! The ADDR pin is tied low on the board, giving the 7-bit address `0x1C`
//! (`0x38`/`0x39` as 8-bit write/read bytes). Reads are a register-address
//! write followed by a repeated start and a single data byte.
//!
//! ## EAPD
//! The power stage stays in power-down until `CONFF.EAPD` is set. The other
//! `CONFF` bits hold the output configuration programmed at reset, so EAPD
//! is always changed read-modify-write.
//!
//! ## Master volume
//! `MVOL` attenuates in 0.5 dB steps from `0x00` (0 dB) to `0xFE`; `0xFF` is
//! hard mute. The player only uses `0x00..=0x70` (see
//! [`platform::VolumeRegister`]).

use platform::audio_types::{AmpBus, I2cAddr};

/// 7-bit I²C address with ADDR low.
pub const I2C_ADDR: I2cAddr<AmpBus> = I2cAddr::new(0x1C);

// ---------------------------------------------------------------------------
// Register addresses
// ---------------------------------------------------------------------------

/// Configuration register F: power-down, fault handling, EAPD.
pub const REG_CONFF: u8 = 0x05;

/// Master volume.
pub const REG_MVOL: u8 = 0x07;

/// Fault and status flags (read-only).
pub const REG_STATUS: u8 = 0x2D;

// ---------------------------------------------------------------------------
// Bit fields
// ---------------------------------------------------------------------------

/// `CONFF` bit 7: external amplifier power-down. Set = power stage on.
pub const CONFF_EAPD: u8 = 1 << 7;

/// `CONFF` with EAPD forced to `enabled`, other bits kept.
#[must_use]
pub const fn with_eapd(conff: u8, enabled: bool) -> u8 {
    if enabled {
        conff | CONFF_EAPD
    } else {
        conff & !CONFF_EAPD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eapd_keeps_other_bits() {
        assert_eq!(with_eapd(0x5C, true), 0xDC);
        assert_eq!(with_eapd(0xDC, false), 0x5C);
        assert_eq!(with_eapd(0xDC, true), 0xDC);
    }
}
