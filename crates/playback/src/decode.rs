//! Decode worker: stream buffer → [`FrameDecoder`] → renderer.
//!
//! One session runs the engine through four hooks:
//!
//! - **input**: keep the unconsumed tail at the front of the staging
//!   buffer and top it up from the stream buffer,
//! - **header**: on the first frame of a session, apply its sample rate,
//! - **output**: convert the frame to 16-bit PCM and hand it to the
//!   renderer, retrying in 100 ms slices while the session is active,
//! - **error**: skip over undecodable bytes; stop on a fatal format error.
//!
//! The session ends when the stream buffer stays empty after a stop
//! request, or when the engine reports the format as unsupported.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Duration;
use platform::{AudioOutput, BusWait, SampleRateHz};

use crate::decoder::{DecodeError, FrameDecoder, PcmFrame, FRAME_SAMPLES};
use crate::ring_buffer::StreamBuffer;
use crate::session::{CancelToken, Worker};

/// Compressed bytes staged for the engine.
pub const STAGING_BYTES: usize = 2 * 1024;

const PCM_BYTES: usize = FRAME_SAMPLES * 4;
const OUTPUT_WAIT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Decoder worker; run it with [`run_worker`](crate::session::run_worker).
pub struct DecodeWorker<'a, D: FrameDecoder, O: AudioOutput, const N: usize> {
    decoder: D,
    buffer: &'a StreamBuffer<N>,
    output: &'a Mutex<CriticalSectionRawMutex, O>,
    staging: [u8; STAGING_BYTES],
    filled: usize,
    frame: PcmFrame,
    pcm: [u8; PCM_BYTES],
    rate_applied: bool,
    frames: u32,
}

impl<'a, D: FrameDecoder, O: AudioOutput, const N: usize> DecodeWorker<'a, D, O, N> {
    /// Worker decoding from `buffer` into `output` with `decoder`.
    pub fn new(
        decoder: D,
        buffer: &'a StreamBuffer<N>,
        output: &'a Mutex<CriticalSectionRawMutex, O>,
    ) -> Self {
        Self {
            decoder,
            buffer,
            output,
            staging: [0; STAGING_BYTES],
            filled: 0,
            frame: PcmFrame::zeroed(),
            pcm: [0; PCM_BYTES],
            rate_applied: false,
            frames: 0,
        }
    }

    /// Frames rendered in the current (or last) session.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    async fn input(&mut self, token: CancelToken<'_>) -> Flow {
        if self.filled >= STAGING_BYTES {
            warn!("decoder: no frame in {} staged bytes, dropping them", self.filled);
            self.filled = 0;
        }
        loop {
            let free = self.staging.get_mut(self.filled..).unwrap_or_default();
            match self.buffer.pop(free).await {
                Ok(n) => {
                    self.filled = self.filled.saturating_add(n);
                    return if token.is_active() {
                        Flow::Continue
                    } else {
                        Flow::Stop
                    };
                }
                Err(_) if token.is_active() => {}
                Err(_) => return Flow::Stop,
            }
        }
    }

    /// Decode every whole frame currently staged.
    async fn decode_staged(&mut self, token: CancelToken<'_>) -> Flow {
        loop {
            let staged = self.staging.get(..self.filled).unwrap_or_default();
            match self.decoder.decode_frame(staged, &mut self.frame) {
                Ok(consumed) => {
                    self.consume(consumed.max(1));
                    self.header().await;
                    if self.output(token).await == Flow::Stop {
                        return Flow::Stop;
                    }
                }
                Err(DecodeError::Underflow) => return Flow::Continue,
                Err(DecodeError::InvalidData { skipped }) => {
                    trace!("decoder: skipping {} bytes", skipped);
                    self.consume(skipped.max(1));
                }
                Err(DecodeError::UnsupportedFormat) => {
                    error!("decoder: {}", DecodeError::UnsupportedFormat.as_str());
                    return Flow::Stop;
                }
            }
            if self.filled == 0 {
                return Flow::Continue;
            }
        }
    }

    /// Drop `n` bytes from the front of the staging buffer.
    fn consume(&mut self, n: usize) {
        let n = n.min(self.filled);
        self.staging.copy_within(n..self.filled, 0);
        self.filled = self.filled.saturating_sub(n);
    }

    async fn header(&mut self) {
        if self.rate_applied {
            return;
        }
        self.rate_applied = true;
        match SampleRateHz::new(self.frame.sample_rate) {
            Ok(rate) => {
                info!("decoder: stream at {} Hz", rate.get());
                if self.output.lock().await.set_sample_rate(rate).await.is_err() {
                    warn!("decoder: cannot apply sample rate");
                }
            }
            Err(_) => warn!("decoder: sample rate {} out of range", self.frame.sample_rate),
        }
    }

    async fn output(&mut self, token: CancelToken<'_>) -> Flow {
        let len = self.frame.write_pcm16(&mut self.pcm);
        let mut offset = 0usize;
        while offset < len {
            if !token.is_active() {
                return Flow::Stop;
            }
            let pending = self.pcm.get(offset..len).unwrap_or_default();
            let written = self
                .output
                .lock()
                .await
                .write(pending, BusWait::Within(OUTPUT_WAIT))
                .await;
            match written {
                Ok(0) | Err(_) => embassy_futures::yield_now().await,
                Ok(n) => offset = offset.saturating_add(n),
            }
        }
        self.frames = self.frames.saturating_add(1);
        Flow::Continue
    }
}

impl<D: FrameDecoder, O: AudioOutput, const N: usize> Worker for DecodeWorker<'_, D, O, N> {
    type Request = ();

    async fn run_session(&mut self, (): (), token: CancelToken<'_>) {
        self.decoder.reset();
        self.filled = 0;
        self.frames = 0;
        self.rate_applied = false;
        info!("decoder: start");
        while self.input(token).await == Flow::Continue {
            if self.decode_staged(token).await == Flow::Stop {
                break;
            }
        }
        info!("decoder: finished after {} frames", self.frames);
    }
}
