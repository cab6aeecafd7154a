//! Source fetchers: producers that feed the stream buffer (radio, file) or
//! the renderer directly (Bluetooth).

pub mod bluetooth;
pub mod file;
pub mod radio;

use embassy_time::{Duration, Timer};

use crate::ring_buffer::{BufferError, StreamBuffer};
use crate::session::CancelToken;

/// The session was stopped while data was still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cancelled;

/// Push `bytes` into `buffer`, retrying on timeout while `token` is active.
///
/// Chunks larger than the buffer are split so they can always make
/// progress. `backoff` is slept between retries.
pub(crate) async fn push_while_active<const N: usize>(
    buffer: &StreamBuffer<N>,
    bytes: &[u8],
    token: CancelToken<'_>,
    backoff: Duration,
) -> Result<(), Cancelled> {
    for chunk in bytes.chunks(N.max(1)) {
        loop {
            match buffer.push(chunk).await {
                Ok(()) => break,
                Err(BufferError::Timeout) if token.is_active() => {
                    if backoff > Duration::from_ticks(0) {
                        Timer::after(backoff).await;
                    }
                }
                Err(BufferError::Timeout | BufferError::Oversize) => return Err(Cancelled),
            }
        }
        if !token.is_active() {
            return Err(Cancelled);
        }
    }
    Ok(())
}
