//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests. Every mock records what was asked
//! of it so tests can assert on the interaction afterwards.

#![cfg(any(test, feature = "std"))]
#![allow(clippy::arithmetic_side_effects)] // Mock counters and cursors; overflow not a concern in tests
#![allow(clippy::indexing_slicing)] // Cursors are bounded by the scripted data length

use std::collections::{HashMap, VecDeque};
use std::string::String;
use std::vec::Vec;

use embedded_io::ErrorKind;

use crate::audio::{AudioOutput, BusWait, I2sBus};
use crate::audio_types::{SampleRateHz, VolumeStep};
use crate::bluetooth::{A2dpSink, ConnectionState, MediaCodec, PeerAddress, SinkEvent};
use crate::network::TcpConnect;
use crate::storage::{File, Storage};

/// Error injected by a mock configured to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockFault;

// ── Audio output ─────────────────────────────────────────────────────────────

/// Mock renderer capturing every PCM byte written to it.
pub struct MockOutput {
    initialised: bool,
    started: bool,
    volume: Option<VolumeStep>,
    volume_writes: usize,
    rates: Vec<SampleRateHz>,
    written: Vec<u8>,
    start_count: usize,
    stop_count: usize,
    max_per_write: usize,
    fail_init: bool,
    fail_volume: bool,
}

impl MockOutput {
    /// Create a mock that accepts every write in full.
    pub fn new() -> Self {
        Self {
            initialised: false,
            started: false,
            volume: None,
            volume_writes: 0,
            rates: Vec::new(),
            written: Vec::new(),
            start_count: 0,
            stop_count: 0,
            max_per_write: usize::MAX,
            fail_init: false,
            fail_volume: false,
        }
    }

    /// Accept at most `bytes` per write call (simulates a full DMA ring).
    #[must_use]
    pub fn with_max_per_write(mut self, bytes: usize) -> Self {
        self.max_per_write = bytes;
        self
    }

    /// Make `init` fail.
    #[must_use]
    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Make every `set_volume` fail after the value is recorded as attempted.
    pub fn set_fail_volume(&mut self, fail: bool) {
        self.fail_volume = fail;
    }

    /// `true` once `init` succeeded.
    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// `true` between `start` and `stop`.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Last volume step applied successfully.
    pub fn volume(&self) -> Option<VolumeStep> {
        self.volume
    }

    /// Number of `set_volume` calls (including failed ones).
    pub fn volume_writes(&self) -> usize {
        self.volume_writes
    }

    /// Every sample rate applied, in order.
    pub fn rates(&self) -> &[SampleRateHz] {
        &self.rates
    }

    /// All PCM bytes accepted so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Number of `start` calls.
    pub fn start_count(&self) -> usize {
        self.start_count
    }

    /// Number of `stop` calls.
    pub fn stop_count(&self) -> usize {
        self.stop_count
    }
}

impl Default for MockOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for MockOutput {
    type Error = MockFault;

    async fn init(&mut self) -> Result<(), Self::Error> {
        if self.fail_init {
            return Err(MockFault);
        }
        self.initialised = true;
        Ok(())
    }

    async fn start(&mut self) -> Result<(), Self::Error> {
        self.started = true;
        self.start_count += 1;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), Self::Error> {
        self.started = false;
        self.stop_count += 1;
        Ok(())
    }

    async fn set_volume(&mut self, step: VolumeStep) -> Result<(), Self::Error> {
        self.volume_writes += 1;
        if self.fail_volume {
            return Err(MockFault);
        }
        self.volume = Some(step);
        Ok(())
    }

    async fn set_sample_rate(&mut self, rate: SampleRateHz) -> Result<(), Self::Error> {
        self.rates.push(rate);
        Ok(())
    }

    async fn write(&mut self, pcm: &[u8], _wait: BusWait) -> Result<usize, Self::Error> {
        let n = pcm.len().min(self.max_per_write);
        self.written.extend_from_slice(&pcm[..n]);
        if n == 0 {
            embassy_futures::yield_now().await;
        }
        Ok(n)
    }
}

// ── I2S bus ──────────────────────────────────────────────────────────────────

/// Mock I2S transmitter.
#[derive(Default)]
pub struct MockI2sBus {
    /// Sample rate last programmed.
    pub rate: Option<SampleRateHz>,
    /// `true` while clocks run.
    pub running: bool,
    /// Number of `clear` calls.
    pub clears: usize,
    /// PCM bytes queued so far.
    pub written: Vec<u8>,
    /// Ordered log of bus operations (`"start"`, `"stop"`, `"clear"`).
    pub ops: Vec<&'static str>,
}

impl MockI2sBus {
    /// Create an idle bus.
    pub fn new() -> Self {
        Self::default()
    }
}

impl I2sBus for MockI2sBus {
    type Error = MockFault;

    async fn set_sample_rate(&mut self, rate: SampleRateHz) -> Result<(), Self::Error> {
        self.rate = Some(rate);
        Ok(())
    }

    async fn start(&mut self) -> Result<(), Self::Error> {
        self.running = true;
        self.ops.push("start");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), Self::Error> {
        self.running = false;
        self.ops.push("stop");
        Ok(())
    }

    async fn clear(&mut self) -> Result<(), Self::Error> {
        self.clears += 1;
        self.ops.push("clear");
        Ok(())
    }

    async fn write(&mut self, pcm: &[u8], _wait: BusWait) -> Result<usize, Self::Error> {
        self.written.extend_from_slice(pcm);
        Ok(pcm.len())
    }
}

// ── Network ──────────────────────────────────────────────────────────────────

/// Mock TCP connector serving one scripted response per `connect` call.
pub struct MockConnector {
    responses: VecDeque<Vec<u8>>,
    chunk: usize,
    hold_open: bool,
    /// `(host, port)` of every connection attempt.
    pub connects: Vec<(String, u16)>,
    /// Request bytes written on each connection, as text.
    pub requests: Vec<String>,
}

impl MockConnector {
    /// Create a connector with no scripted responses (every connect fails).
    pub fn new() -> Self {
        Self {
            responses: VecDeque::new(),
            chunk: 1024,
            hold_open: false,
            connects: Vec::new(),
            requests: Vec::new(),
        }
    }

    /// Queue the raw bytes the next connection will return.
    #[must_use]
    pub fn respond(mut self, raw: impl Into<Vec<u8>>) -> Self {
        self.responses.push_back(raw.into());
        self
    }

    /// Deliver at most `bytes` per `read` call.
    #[must_use]
    pub fn with_chunk(mut self, bytes: usize) -> Self {
        self.chunk = bytes.max(1);
        self
    }

    /// Keep the socket open (reads pend) after the scripted bytes run out.
    #[must_use]
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection handed out by [`MockConnector`].
pub struct MockConnection<'a> {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
    hold_open: bool,
    request: &'a mut String,
}

impl TcpConnect for MockConnector {
    type Error = ErrorKind;
    type Connection<'a> = MockConnection<'a>;

    async fn connect<'a>(
        &'a mut self,
        host: &str,
        port: u16,
    ) -> Result<Self::Connection<'a>, Self::Error> {
        self.connects.push((String::from(host), port));
        let data = self
            .responses
            .pop_front()
            .ok_or(ErrorKind::ConnectionRefused)?;
        self.requests.push(String::new());
        let request = self.requests.last_mut().ok_or(ErrorKind::Other)?;
        Ok(MockConnection {
            data,
            pos: 0,
            chunk: self.chunk,
            hold_open: self.hold_open,
            request,
        })
    }
}

impl embedded_io::ErrorType for MockConnection<'_> {
    type Error = ErrorKind;
}

impl embedded_io_async::Read for MockConnection<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let remaining = self.data.len() - self.pos;
        if remaining == 0 {
            if self.hold_open {
                core::future::pending::<()>().await;
            }
            return Ok(0);
        }
        let n = remaining.min(self.chunk).min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl embedded_io_async::Write for MockConnection<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.request.push_str(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }
}

// ── Storage ──────────────────────────────────────────────────────────────────

/// In-memory file system.
#[derive(Default)]
pub struct MockStorage {
    files: HashMap<String, Vec<u8>>,
    /// Paths passed to `open_file`, in order.
    pub opened: Vec<String>,
}

impl MockStorage {
    /// Create an empty file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file.
    #[must_use]
    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(String::from(path), contents.into());
        self
    }
}

/// Open in-memory file.
pub struct MockFile {
    data: Vec<u8>,
    pos: usize,
}

impl File for MockFile {
    type Error = MockFault;

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = (self.data.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

impl Storage for MockStorage {
    type Error = MockFault;
    type File<'a> = MockFile;

    async fn open_file<'a>(&'a mut self, path: &str) -> Result<Self::File<'a>, Self::Error> {
        self.opened.push(String::from(path));
        let data = self.files.get(path).cloned().ok_or(MockFault)?;
        Ok(MockFile { data, pos: 0 })
    }
}

// ── Bluetooth ────────────────────────────────────────────────────────────────

/// Owned form of [`SinkEvent`] for scripting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedEvent {
    /// See [`SinkEvent::Connection`].
    Connection(ConnectionState, PeerAddress),
    /// See [`SinkEvent::AudioConfig`].
    AudioConfig(MediaCodec, u8),
    /// See [`SinkEvent::AudioData`].
    AudioData(Vec<u8>),
    /// See [`SinkEvent::RemoteControl`].
    RemoteControl(bool),
    /// See [`SinkEvent::Metadata`].
    Metadata(u8, Vec<u8>),
    /// See [`SinkEvent::TrackChanged`].
    TrackChanged,
}

/// Command the stack received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkCommand {
    /// `set_discoverable`
    Discoverable(bool),
    /// `disconnect`
    Disconnect(PeerAddress),
    /// `send_passthrough`
    Passthrough {
        /// Transaction label.
        label: u8,
        /// Operation id.
        key: u8,
        /// Key state.
        released: bool,
    },
    /// `request_metadata`
    RequestMetadata {
        /// Transaction label.
        label: u8,
        /// Requested attributes.
        attribute_mask: u8,
    },
    /// `register_notification`
    RegisterNotification {
        /// Transaction label.
        label: u8,
        /// Notification event id.
        event: u8,
    },
}

/// Mock A2DP/AVRCP stack replaying a scripted event sequence.
///
/// Once the script is exhausted `next_event` pends forever.
#[derive(Default)]
pub struct MockA2dpSink {
    script: VecDeque<ScriptedEvent>,
    current: Option<ScriptedEvent>,
    /// Every command issued, in order.
    pub commands: Vec<SinkCommand>,
}

impl MockA2dpSink {
    /// Create a sink with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the script.
    #[must_use]
    pub fn then(mut self, event: ScriptedEvent) -> Self {
        self.script.push_back(event);
        self
    }
}

impl A2dpSink for MockA2dpSink {
    type Error = MockFault;

    async fn set_discoverable(&mut self, discoverable: bool) -> Result<(), Self::Error> {
        self.commands.push(SinkCommand::Discoverable(discoverable));
        Ok(())
    }

    async fn disconnect(&mut self, peer: PeerAddress) -> Result<(), Self::Error> {
        self.commands.push(SinkCommand::Disconnect(peer));
        Ok(())
    }

    async fn next_event(&mut self) -> SinkEvent<'_> {
        if self.script.is_empty() {
            core::future::pending::<()>().await;
        }
        self.current = self.script.pop_front();
        match &self.current {
            Some(ScriptedEvent::Connection(state, peer)) => SinkEvent::Connection {
                state: *state,
                peer: *peer,
            },
            Some(ScriptedEvent::AudioConfig(codec, sbc_info)) => SinkEvent::AudioConfig {
                codec: *codec,
                sbc_info: *sbc_info,
            },
            Some(ScriptedEvent::AudioData(pcm)) => SinkEvent::AudioData(pcm),
            Some(ScriptedEvent::RemoteControl(connected)) => SinkEvent::RemoteControl {
                connected: *connected,
            },
            Some(ScriptedEvent::Metadata(attribute, text)) => SinkEvent::Metadata {
                attribute: *attribute,
                text,
            },
            Some(ScriptedEvent::TrackChanged) | None => SinkEvent::TrackChanged,
        }
    }

    async fn send_passthrough(
        &mut self,
        label: u8,
        key: u8,
        released: bool,
    ) -> Result<(), Self::Error> {
        self.commands.push(SinkCommand::Passthrough {
            label,
            key,
            released,
        });
        Ok(())
    }

    async fn request_metadata(
        &mut self,
        label: u8,
        attribute_mask: u8,
    ) -> Result<(), Self::Error> {
        self.commands.push(SinkCommand::RequestMetadata {
            label,
            attribute_mask,
        });
        Ok(())
    }

    async fn register_notification(&mut self, label: u8, event: u8) -> Result<(), Self::Error> {
        self.commands
            .push(SinkCommand::RegisterNotification { label, event });
        Ok(())
    }
}
