//! Audio domain newtypes for compile-time safety.
//!
//! These zero-cost abstractions prevent common errors:
//! - `VolumeStep`: clamps 0–16 (0 = loudest), prevents register overflow
//! - `VolumeRegister`: master-volume register value, derived from VolumeStep only
//! - `SampleRateHz`: validates 8000–768000 Hz range
//! - `I2cAddr<Bus>`: phantom type binds address to correct bus

use core::marker::PhantomData;

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

// ── VolumeStep ───────────────────────────────────────────────────────────────

/// Attenuation step, clamped to 0–16.
///
/// Lower is louder: step 0 is full scale, step 16 the quietest setting.
/// The user-facing level is the inverse (see [`VolumeStep::level`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct VolumeStep(u8);

impl VolumeStep {
    /// Full scale.
    pub const LOUDEST: Self = Self(0);
    /// Quietest audible setting.
    pub const QUIETEST: Self = Self(16);
    /// Power-on setting.
    pub const DEFAULT: Self = Self(8);

    /// Create a `VolumeStep`, clamping values above 16 to 16.
    #[must_use]
    pub const fn new(step: u8) -> Self {
        if step > Self::QUIETEST.0 {
            Self::QUIETEST
        } else {
            Self(step)
        }
    }

    /// Create a `VolumeStep`, returning an error if `step > 16`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `step > 16`.
    pub fn try_new(step: u8) -> Result<Self, OutOfRangeError> {
        if step > Self::QUIETEST.0 {
            Err(OutOfRangeError {
                value: u32::from(step),
                min: 0,
                max: u32::from(Self::QUIETEST.0),
            })
        } else {
            Ok(Self(step))
        }
    }

    /// Return the raw step (0–16).
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// One step louder, saturating at [`VolumeStep::LOUDEST`].
    #[must_use]
    pub const fn louder(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    /// One step quieter, saturating at [`VolumeStep::QUIETEST`].
    #[must_use]
    pub const fn quieter(self) -> Self {
        Self::new(self.0.saturating_add(1))
    }

    /// User-facing level: 0 (quietest) to [`VolumeStep::max_level`] (loudest).
    #[must_use]
    pub const fn level(self) -> u8 {
        Self::QUIETEST.0.saturating_sub(self.0)
    }

    /// Highest value [`VolumeStep::level`] can return.
    #[must_use]
    pub const fn max_level() -> u8 {
        Self::QUIETEST.0
    }
}

impl Default for VolumeStep {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ── VolumeRegister ───────────────────────────────────────────────────────────

/// Master-volume register value (0x00 = 0 dB, each LSB = −0.5 dB).
///
/// This type can only be constructed from a [`VolumeStep`], ensuring
/// the conversion formula is applied consistently.
///
/// Formula: `register = step * 7`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct VolumeRegister(u8);

impl VolumeRegister {
    /// Register increment per volume step (3.5 dB).
    pub const STEP: u8 = 7;

    /// Convert a `VolumeStep` to a master-volume register value.
    ///
    /// - step 0  → register 0x00 (0 dB)
    /// - step 16 → register 0x70 (−56 dB)
    #[must_use]
    pub const fn from_step(step: VolumeStep) -> Self {
        // step <= 16, so step * 7 <= 112: never saturates.
        Self(step.get().saturating_mul(Self::STEP))
    }

    /// Return the raw register value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

// ── SampleRateHz ─────────────────────────────────────────────────────────────

/// Sample rate in Hz, validated to the range the audio bus can clock.
///
/// Valid range: 8000–768000 Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct SampleRateHz(u32);

impl SampleRateHz {
    /// Minimum supported sample rate: 8000 Hz (telephony).
    pub const MIN_HZ: u32 = 8_000;

    /// Maximum supported sample rate: 768000 Hz.
    pub const MAX_HZ: u32 = 768_000;

    /// 44.1 kHz, the rate most streams and A2DP sources use.
    pub const CD: Self = Self(44_100);

    /// Create a `SampleRateHz`, returning an error if out of 8000–768000 Hz.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `hz < 8000` or `hz > 768000`.
    pub const fn new(hz: u32) -> Result<Self, OutOfRangeError> {
        if hz < Self::MIN_HZ || hz > Self::MAX_HZ {
            Err(OutOfRangeError {
                value: hz,
                min: Self::MIN_HZ,
                max: Self::MAX_HZ,
            })
        } else {
            Ok(Self(hz))
        }
    }

    /// Return the sample rate in Hz.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

// ── I2C bus phantom types ────────────────────────────────────────────────────

/// Phantom type for the amplifier control bus (STA350: address 0x1C).
#[derive(Debug, Clone, Copy)]
pub struct AmpBus;

// ── I2cAddr ──────────────────────────────────────────────────────────────────

/// I2C 7-bit address bound to a specific bus via phantom type.
///
/// ## Reserved I2C addresses (I2C specification):
/// - 0x00–0x07: reserved (general call, CBUS, etc.)
/// - 0x78–0x7F: reserved (10-bit address prefix, device ID, etc.)
///
/// ## Usage:
/// ```rust
/// use platform::audio_types::{AmpBus, I2cAddr};
///
/// // STA350 amplifier, SA pin low (0x38 in 8-bit write form)
/// let amp_addr: I2cAddr<AmpBus> = I2cAddr::new(0x1C);
/// assert_eq!(amp_addr.get(), 0x1C);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cAddr<Bus> {
    addr: u8,
    _bus: PhantomData<Bus>,
}

impl<Bus> I2cAddr<Bus> {
    /// Create an I2C address without checking reserved ranges.
    ///
    /// Use this only when the address is a known hardware-fixed constant.
    #[must_use]
    pub const fn new(addr: u8) -> Self {
        Self {
            addr,
            _bus: PhantomData,
        }
    }

    /// Create an I2C address, rejecting I2C-reserved ranges.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `addr <= 0x07` or `addr >= 0x78`.
    pub fn try_new(addr: u8) -> Result<Self, OutOfRangeError> {
        if addr <= 0x07 || addr >= 0x78 {
            Err(OutOfRangeError {
                value: u32::from(addr),
                min: 0x08,
                max: 0x77,
            })
        } else {
            Ok(Self::new(addr))
        }
    }

    /// Return the 7-bit I2C address.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.addr
    }
}
