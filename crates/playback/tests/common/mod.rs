//! Shared fixtures for the streaming-core integration tests.
#![allow(dead_code)]
#![allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use playback::{DecodeError, FrameDecoder, PcmFrame};

/// Bytes per passthrough frame: 16 stereo pairs of 16-bit samples.
pub const FRAME_BYTES: usize = 64;

/// Treats the stream as raw 16-bit stereo PCM at 44.1 kHz, so what comes
/// out of the renderer is byte-for-byte what the fetcher delivered.
pub struct PassthroughDecoder;

impl FrameDecoder for PassthroughDecoder {
    fn decode_frame(&mut self, input: &[u8], output: &mut PcmFrame) -> Result<usize, DecodeError> {
        if input.len() < FRAME_BYTES {
            return Err(DecodeError::Underflow);
        }
        for (i, pair) in input[..FRAME_BYTES].chunks_exact(4).enumerate() {
            let l = i16::from_le_bytes([pair[0], pair[1]]);
            let r = i16::from_le_bytes([pair[2], pair[3]]);
            output.samples[0][i] = i32::from(l) << 13;
            output.samples[1][i] = i32::from(r) << 13;
        }
        output.len = FRAME_BYTES / 4;
        output.sample_rate = 44_100;
        output.channels = 2;
        Ok(FRAME_BYTES)
    }

    fn reset(&mut self) {}
}

/// `len` bytes of a recognisable pattern starting at `seed`.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}
