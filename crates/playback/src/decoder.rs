//! Decoder abstractions: format detection, PCM frame type, codec trait.
//!
//! The decode worker ([`crate::decode`]) is codec-agnostic; it drives any
//! [`FrameDecoder`]. The production engine is
//! [`NanoMp3Decoder`](crate::mp3_decoder::NanoMp3Decoder) (feature `mp3`).
//!
//! # Sample format
//!
//! Decoded samples are fixed-point `i32` with [`FRAC_BITS`] fractional bits,
//! so full scale is `±(1 << 28)`. [`scale`] rounds, clips and shifts them to
//! the 16-bit PCM the renderer takes.

/// Samples per channel in one MPEG-1 Layer III frame.
pub const FRAME_SAMPLES: usize = 1152;

/// Fractional bits of decoded fixed-point samples.
pub const FRAC_BITS: u32 = 28;

const ONE: i32 = 1 << FRAC_BITS;
const OUTPUT_SHIFT: u32 = FRAC_BITS + 1 - 16;

/// One decoded frame, split per channel.
///
/// The arrays are always fully allocated; `len` says how many samples per
/// channel are valid.
#[derive(Clone)]
pub struct PcmFrame {
    /// Left and right channel samples, fixed point.
    pub samples: [[i32; FRAME_SAMPLES]; 2],
    /// Valid samples per channel.
    pub len: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count of the source (1 or 2); mono is already duplicated.
    pub channels: u8,
}

impl PcmFrame {
    /// Create an empty frame suitable as an output buffer.
    pub const fn zeroed() -> Self {
        Self {
            samples: [[0; FRAME_SAMPLES]; 2],
            len: 0,
            sample_rate: 0,
            channels: 0,
        }
    }

    /// Interleave the frame as 16-bit little-endian stereo into `out`.
    ///
    /// Returns the number of bytes written; stops early when `out` is full.
    pub fn write_pcm16(&self, out: &mut [u8]) -> usize {
        let [left, right] = &self.samples;
        let mut written = 0usize;
        for ((l, r), dst) in left
            .iter()
            .zip(right.iter())
            .take(self.len)
            .zip(out.chunks_exact_mut(4))
        {
            let (dl, dr) = dst.split_at_mut(2);
            dl.copy_from_slice(&scale(*l).to_le_bytes());
            dr.copy_from_slice(&scale(*r).to_le_bytes());
            written = written.saturating_add(4);
        }
        written
    }
}

impl Default for PcmFrame {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Round, clip and shift a fixed-point sample to 16 bits.
#[allow(clippy::cast_possible_truncation, clippy::arithmetic_side_effects)] // Safety: the clamp bounds the shifted value to i16 range
pub const fn scale(sample: i32) -> i16 {
    let rounded = sample.saturating_add(1 << (OUTPUT_SHIFT - 1));
    let clipped = if rounded >= ONE {
        ONE - 1
    } else if rounded < -ONE {
        -ONE
    } else {
        rounded
    };
    (clipped >> OUTPUT_SHIFT) as i16
}

/// Errors a [`FrameDecoder`] may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Not enough input for a whole frame; feed more bytes.
    Underflow,
    /// Input could not be decoded; `skipped` bytes should be dropped.
    InvalidData {
        /// Bytes to discard before trying again.
        skipped: usize,
    },
    /// The stream can never be decoded by this engine.
    UnsupportedFormat,
}

impl DecodeError {
    /// `false` for errors that end the decode session.
    pub const fn is_recoverable(self) -> bool {
        !matches!(self, Self::UnsupportedFormat)
    }

    /// Short description for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Underflow => "need more input",
            Self::InvalidData { .. } => "invalid frame data",
            Self::UnsupportedFormat => "unsupported format",
        }
    }
}

/// Compressed formats the player recognises by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioFormat {
    /// MPEG-1/2 audio (Layer II/III).
    Mpeg,
}

impl AudioFormat {
    /// Detect the format from a file extension, ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        ["mp3", "mp2", "mpga"]
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
            .then_some(Self::Mpeg)
    }

    /// Detect the format from the extension of `path`.
    pub fn from_path(path: &str) -> Option<Self> {
        let name = path.rsplit('/').next().unwrap_or(path);
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

/// Stateful frame-by-frame audio decoder.
///
/// Each call consumes bytes from the front of `input` and, on success,
/// fills `output` with one frame. Implementations must not allocate.
pub trait FrameDecoder {
    /// Decode one frame; returns the number of input bytes consumed.
    fn decode_frame(&mut self, input: &[u8], output: &mut PcmFrame) -> Result<usize, DecodeError>;

    /// Forget inter-frame state before a new stream.
    fn reset(&mut self);
}
