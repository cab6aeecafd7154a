//! Bounded byte ring shared by a fetcher (producer) and the decoder (consumer).
//!
//! Two layers:
//!
//! - [`RingBuffer<N>`]: const-generic, allocation-free byte FIFO. Not
//!   synchronised; all-or-nothing writes, partial reads.
//! - [`StreamBuffer<N>`]: the ring behind a critical-section mutex plus two
//!   signals, giving async `push`/`pop` that wait at most a bounded time.
//!   Both sides re-check their session's active flag whenever a wait times
//!   out, so a timeout is a normal outcome and not a failure.
//!
//! `StreamBuffer::new` is `const`, so the 144 KiB radio buffer can live in a
//! `static` instead of on a task stack.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration};

/// Default bound on every `push`/`pop` wait.
pub const STREAM_TIMEOUT: Duration = Duration::from_millis(100);

/// A fixed-capacity FIFO of bytes.
///
/// Capacity is set at compile time via the const generic `N`.
pub struct RingBuffer<const N: usize> {
    buf: [u8; N],
    /// Index of the next byte to read.
    read: usize,
    /// Number of valid bytes currently held.
    count: usize,
}

impl<const N: usize> RingBuffer<N> {
    /// Create a new, empty ring buffer.
    pub const fn new() -> Self {
        Self {
            buf: [0u8; N],
            read: 0,
            count: 0,
        }
    }

    /// Append `data` to the buffer.
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if `data` would not fit in the remaining space.
    /// The buffer is left unchanged on error (the write is all-or-nothing).
    #[allow(clippy::result_unit_err)] // overflow is the only error; () is sufficient
    #[allow(clippy::arithmetic_side_effects)] // Safety: read < N, count <= N, data.len() <= N - count checked above
    pub fn write_slice(&mut self, data: &[u8]) -> Result<(), ()> {
        if data.len() > self.free() {
            return Err(());
        }
        let write = (self.read + self.count) % N.max(1);
        let first = data.len().min(N - write);
        let (head, tail) = data.split_at(first);
        if let Some(dst) = self.buf.get_mut(write..write + first) {
            dst.copy_from_slice(head);
        }
        if let Some(dst) = self.buf.get_mut(..tail.len()) {
            dst.copy_from_slice(tail);
        }
        self.count += data.len();
        Ok(())
    }

    /// Read up to `out.len()` bytes into `out`.
    ///
    /// Returns the number of bytes actually read (may be less than
    /// `out.len()` if the buffer holds fewer bytes than requested).
    #[allow(clippy::arithmetic_side_effects)] // Safety: read < N; n <= count <= N
    pub fn read_slice(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.count);
        let first = n.min(N - self.read);
        let (head, tail) = out.split_at_mut(first);
        if let Some(src) = self.buf.get(self.read..self.read + first) {
            head.copy_from_slice(src);
        }
        let rest = n - first;
        if let (Some(dst), Some(src)) = (tail.get_mut(..rest), self.buf.get(..rest)) {
            dst.copy_from_slice(src);
        }
        self.read = (self.read + n) % N.max(1);
        self.count -= n;
        n
    }

    /// Drop every byte.
    pub fn clear(&mut self) {
        self.read = 0;
        self.count = 0;
    }

    /// Number of bytes currently available to read.
    pub fn available(&self) -> usize {
        self.count
    }

    /// Number of bytes that can be written without blocking.
    #[allow(clippy::arithmetic_side_effects)] // Safety: count <= N
    pub fn free(&self) -> usize {
        N - self.count
    }

    /// Maximum number of bytes the buffer can hold.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// `true` when no bytes are present.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// `true` when the buffer is completely full.
    pub fn is_full(&self) -> bool {
        self.count == N
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a [`StreamBuffer`] operation gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferError {
    /// The wait bound elapsed; nothing was transferred.
    Timeout,
    /// The chunk is larger than the whole buffer and can never fit.
    Oversize,
}

impl BufferError {
    /// Short description for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "buffer wait timed out",
            Self::Oversize => "chunk larger than buffer",
        }
    }
}

impl core::fmt::Display for BufferError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-producer / single-consumer byte stream with bounded waits.
pub struct StreamBuffer<const N: usize> {
    ring: Mutex<CriticalSectionRawMutex, RefCell<RingBuffer<N>>>,
    /// Raised after a push; the consumer waits on it when empty.
    readable: Signal<CriticalSectionRawMutex, ()>,
    /// Raised after a pop or reset; the producer waits on it when full.
    writable: Signal<CriticalSectionRawMutex, ()>,
}

impl<const N: usize> StreamBuffer<N> {
    /// Create an empty stream buffer.
    pub const fn new() -> Self {
        Self {
            ring: Mutex::new(RefCell::new(RingBuffer::new())),
            readable: Signal::new(),
            writable: Signal::new(),
        }
    }

    /// Append all of `data`, waiting up to [`STREAM_TIMEOUT`] for space.
    pub async fn push(&self, data: &[u8]) -> Result<(), BufferError> {
        self.push_within(data, STREAM_TIMEOUT).await
    }

    /// Append all of `data`, waiting up to `timeout` for space.
    ///
    /// Nothing is written unless the whole chunk fits.
    pub async fn push_within(&self, data: &[u8], timeout: Duration) -> Result<(), BufferError> {
        if data.len() > N {
            return Err(BufferError::Oversize);
        }
        if data.is_empty() {
            return Ok(());
        }
        with_timeout(timeout, async {
            loop {
                if self.try_push(data) {
                    self.readable.signal(());
                    return;
                }
                self.writable.wait().await;
            }
        })
        .await
        .map_err(|_| BufferError::Timeout)
    }

    /// Take up to `out.len()` bytes, waiting up to [`STREAM_TIMEOUT`] for at
    /// least one.
    pub async fn pop(&self, out: &mut [u8]) -> Result<usize, BufferError> {
        self.pop_within(out, STREAM_TIMEOUT).await
    }

    /// Take up to `out.len()` bytes, waiting up to `timeout` for at least one.
    pub async fn pop_within(&self, out: &mut [u8], timeout: Duration) -> Result<usize, BufferError> {
        if out.is_empty() {
            return Ok(0);
        }
        with_timeout(timeout, async {
            loop {
                let n = self.try_pop(out);
                if n > 0 {
                    self.writable.signal(());
                    return n;
                }
                self.readable.wait().await;
            }
        })
        .await
        .map_err(|_| BufferError::Timeout)
    }

    /// Drop everything buffered and wake a producer blocked on a full ring.
    pub fn reset(&self) {
        self.ring.lock(|ring| ring.borrow_mut().clear());
        self.readable.reset();
        self.writable.signal(());
    }

    /// Fill level in percent: `(capacity - free) * 100 / capacity`.
    #[allow(clippy::cast_possible_truncation)] // Safety: len <= N, so the quotient is <= 100
    pub fn level(&self) -> u8 {
        let used = self.len();
        (used.saturating_mul(100).checked_div(N).unwrap_or(0)) as u8
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.ring.lock(|ring| ring.borrow().available())
    }

    /// `true` when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total capacity in bytes.
    pub const fn capacity(&self) -> usize {
        N
    }

    fn try_push(&self, data: &[u8]) -> bool {
        self.ring
            .lock(|ring| ring.borrow_mut().write_slice(data).is_ok())
    }

    fn try_pop(&self, out: &mut [u8]) -> usize {
        self.ring.lock(|ring| ring.borrow_mut().read_slice(out))
    }
}

impl<const N: usize> Default for StreamBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
