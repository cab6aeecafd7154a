//! Audio output abstraction
//!
//! Two layers: [`I2sBus`] is the raw synchronous audio bus (clock + DMA ring),
//! [`AudioOutput`] is the complete renderer the streaming core talks to
//! (bus plus amplifier control and volume).

use embassy_time::Duration;

use crate::audio_types::{SampleRateHz, VolumeStep};

/// How long a PCM write may block waiting for DMA space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusWait {
    /// Give up after the duration and report what was accepted so far.
    Within(Duration),
    /// Block until every byte is queued.
    Forever,
}

/// Synchronous audio bus (I2S transmitter with a circular DMA buffer).
///
/// PCM is interleaved 16-bit little-endian stereo.
pub trait I2sBus {
    /// Error type
    type Error: core::fmt::Debug;

    /// Reprogram the bit/frame clocks for `rate`.
    async fn set_sample_rate(&mut self, rate: SampleRateHz) -> Result<(), Self::Error>;

    /// Start clocking out the DMA buffer.
    async fn start(&mut self) -> Result<(), Self::Error>;

    /// Stop the bus clocks.
    async fn stop(&mut self) -> Result<(), Self::Error>;

    /// Zero the DMA buffer so a restart does not replay stale audio.
    async fn clear(&mut self) -> Result<(), Self::Error>;

    /// Queue PCM bytes, returning how many were accepted.
    async fn write(&mut self, pcm: &[u8], wait: BusWait) -> Result<usize, Self::Error>;
}

/// Audio renderer: the sink the decoder and the Bluetooth fetcher write into.
pub trait AudioOutput {
    /// Error type
    type Error: core::fmt::Debug;

    /// Bring the output device out of reset and program its defaults.
    async fn init(&mut self) -> Result<(), Self::Error>;

    /// Start the bus and enable the amplifier.
    async fn start(&mut self) -> Result<(), Self::Error>;

    /// Disable the amplifier, stop the bus and silence its buffer.
    async fn stop(&mut self) -> Result<(), Self::Error>;

    /// Apply a volume step (0 = loudest).
    async fn set_volume(&mut self, step: VolumeStep) -> Result<(), Self::Error>;

    /// Change the playback sample rate.
    async fn set_sample_rate(&mut self, rate: SampleRateHz) -> Result<(), Self::Error>;

    /// Write interleaved 16-bit stereo PCM; returns the bytes accepted.
    async fn write(&mut self, pcm: &[u8], wait: BusWait) -> Result<usize, Self::Error>;
}
