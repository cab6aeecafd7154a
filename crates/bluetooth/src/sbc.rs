//! SBC codec-information decoding (A2DP spec, section 4.3.2).
//!
//! The first codec-information byte carries the sampling frequency in the
//! high nibble (one bit per rate) and the channel mode in the low nibble:
//!
//! | bit | meaning   |
//! |-----|-----------|
//! | 7   | 16 kHz    |
//! | 6   | 32 kHz    |
//! | 5   | 44.1 kHz  |
//! | 4   | 48 kHz    |
//! | 3   | mono      |
//! | 2   | dual ch.  |
//! | 1   | stereo    |
//! | 0   | joint st. |

/// Rate assumed when no frequency bit is set.
pub const FALLBACK_RATE_HZ: u32 = 44_100;

/// Channel layout of the SBC stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelMode {
    /// Single channel; the renderer cannot play this.
    Mono,
    /// Any two-channel mode (dual, stereo, joint stereo).
    Stereo,
}

/// Decoded SBC configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SbcConfig {
    /// Sampling frequency in Hz.
    pub sample_rate_hz: u32,
    /// `false` when no frequency bit was set and the fallback was used.
    pub rate_known: bool,
    /// Channel layout.
    pub channels: ChannelMode,
}

impl SbcConfig {
    /// Decode the first SBC codec-information byte.
    ///
    /// When several frequency bits are set the lowest rate wins.
    pub const fn decode(info: u8) -> Self {
        let (sample_rate_hz, rate_known) = if info & 0x80 != 0 {
            (16_000, true)
        } else if info & 0x40 != 0 {
            (32_000, true)
        } else if info & 0x20 != 0 {
            (44_100, true)
        } else if info & 0x10 != 0 {
            (48_000, true)
        } else {
            (FALLBACK_RATE_HZ, false)
        };
        let channels = if info & 0x08 != 0 {
            ChannelMode::Mono
        } else {
            ChannelMode::Stereo
        };
        Self {
            sample_rate_hz,
            rate_known,
            channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_each_frequency_bit() {
        assert_eq!(SbcConfig::decode(0x81).sample_rate_hz, 16_000);
        assert_eq!(SbcConfig::decode(0x41).sample_rate_hz, 32_000);
        assert_eq!(SbcConfig::decode(0x21).sample_rate_hz, 44_100);
        assert_eq!(SbcConfig::decode(0x11).sample_rate_hz, 48_000);
    }

    #[test]
    fn missing_frequency_falls_back_to_44k1() {
        let cfg = SbcConfig::decode(0x01);
        assert_eq!(cfg.sample_rate_hz, FALLBACK_RATE_HZ);
        assert!(!cfg.rate_known);
    }

    #[test]
    fn highest_bit_takes_priority() {
        // 16 kHz and 48 kHz both advertised.
        assert_eq!(SbcConfig::decode(0x91).sample_rate_hz, 16_000);
    }

    #[test]
    fn mono_bit_is_detected() {
        assert_eq!(SbcConfig::decode(0x28).channels, ChannelMode::Mono);
        assert_eq!(SbcConfig::decode(0x21).channels, ChannelMode::Stereo);
        assert_eq!(SbcConfig::decode(0x22).channels, ChannelMode::Stereo);
    }
}
