//! nanomp3-based MPEG audio frame decoder.
//!
//! nanomp3 is a pure-Rust, `no_std` translation of minimp3. It keeps no
//! input buffer of its own: every call gets the bytes staged so far and
//! reports how many it consumed.
//!
//! # Feature flag
//!
//! The `nanomp3` dependency is gated behind the `mp3` feature. Without it
//! the decoder still exists but reports every stream as unsupported, so the
//! rest of the crate builds and tests without the codec.

use crate::decoder::{DecodeError, FrameDecoder, PcmFrame};

#[cfg(feature = "mp3")]
use crate::decoder::{FRAC_BITS, FRAME_SAMPLES};

#[cfg(feature = "mp3")]
const PCM_SCRATCH: usize = nanomp3::MAX_SAMPLES_PER_FRAME;

/// MPEG audio decoder backed by nanomp3.
pub struct NanoMp3Decoder {
    #[cfg(feature = "mp3")]
    inner: nanomp3::Decoder,
    /// Interleaved float output of the last frame.
    #[cfg(feature = "mp3")]
    pcm: [f32; PCM_SCRATCH],
}

impl NanoMp3Decoder {
    /// Create a decoder with no stream state.
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "mp3")]
            inner: nanomp3::Decoder::new(),
            #[cfg(feature = "mp3")]
            pcm: [0.0; PCM_SCRATCH],
        }
    }
}

impl Default for NanoMp3Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Float sample in `[-1.0, 1.0]` to fixed point with `FRAC_BITS` fraction.
#[cfg(feature = "mp3")]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)] // Safety: input is clamped, product fits i32
fn to_fixed(sample: f32) -> i32 {
    (sample.clamp(-1.0, 1.0) * (1u32 << FRAC_BITS) as f32) as i32
}

impl FrameDecoder for NanoMp3Decoder {
    #[cfg(feature = "mp3")]
    fn decode_frame(&mut self, input: &[u8], output: &mut PcmFrame) -> Result<usize, DecodeError> {
        if input.is_empty() {
            return Err(DecodeError::Underflow);
        }
        let (consumed, info) = self.inner.decode(input, &mut self.pcm);
        let Some(info) = info else {
            return if consumed > 0 {
                Err(DecodeError::InvalidData { skipped: consumed })
            } else {
                Err(DecodeError::Underflow)
            };
        };

        let channels = usize::from(u8::try_from(info.channels.num()).unwrap_or(2)).clamp(1, 2);
        let per_channel = info
            .samples_produced
            .min(FRAME_SAMPLES)
            .min(PCM_SCRATCH.checked_div(channels).unwrap_or(0));
        let [left, right] = &mut output.samples;
        for (i, frame) in self.pcm.chunks_exact(channels).take(per_channel).enumerate() {
            let (Some(l), Some(r)) = (left.get_mut(i), right.get_mut(i)) else {
                break;
            };
            let first = frame.first().copied().unwrap_or_default();
            *l = to_fixed(first);
            *r = to_fixed(frame.get(1).copied().unwrap_or(first));
        }
        output.len = per_channel;
        output.sample_rate = info.sample_rate;
        output.channels = u8::try_from(channels).unwrap_or(2);
        Ok(consumed)
    }

    #[cfg(not(feature = "mp3"))]
    fn decode_frame(&mut self, _input: &[u8], _output: &mut PcmFrame) -> Result<usize, DecodeError> {
        Err(DecodeError::UnsupportedFormat)
    }

    fn reset(&mut self) {
        #[cfg(feature = "mp3")]
        {
            self.inner = nanomp3::Decoder::new();
        }
    }
}
