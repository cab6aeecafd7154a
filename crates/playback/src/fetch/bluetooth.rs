//! Bluetooth A2DP sink fetcher.
//!
//! Unlike the radio and file fetchers this one bypasses the stream buffer
//! and the decoder: the stack delivers PCM, which goes straight to the
//! renderer. The worker also drives the AVRCP controller side (title
//! metadata, track-change notifications, the "next" key) and publishes the
//! link state for the UI.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use bluetooth::avrcp::{self, MediaAttribute, Notification, PassthroughKey, TransactionLabels};
use bluetooth::{BluetoothState, ChannelMode, LinkState, SbcConfig};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration};
use platform::{A2dpSink, AudioOutput, BusWait, ConnectionState, MediaCodec, SampleRateHz, SinkEvent};

use crate::session::{CancelToken, SessionControl, Worker};
use crate::track::TrackListener;

/// How long one wait for a stack event lasts before the active flag is
/// checked again.
const EVENT_POLL: Duration = Duration::from_millis(100);

/// Commands the UI sends to the connected phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RemoteCommand {
    /// Skip to the next track.
    Next,
}

/// A remote command could not be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RemoteError {
    /// No AVRCP controller channel to the phone.
    NotConnected,
}

impl RemoteError {
    /// Short description for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotConnected => "remote control not connected",
        }
    }
}

/// Parameters of one Bluetooth session.
#[derive(Clone, Copy, Default)]
pub struct BluetoothRequest {
    /// Receives the phone's track titles.
    pub listener: Option<&'static dyn TrackListener>,
}

/// Shared state between the facade and the Bluetooth worker.
pub struct BluetoothControl {
    session: SessionControl<BluetoothRequest>,
    command: Signal<CriticalSectionRawMutex, RemoteCommand>,
    link: AtomicU8,
    remote_ready: AtomicBool,
}

impl BluetoothControl {
    /// Idle control block.
    pub const fn new() -> Self {
        Self {
            session: SessionControl::new(),
            command: Signal::new(),
            link: AtomicU8::new(LinkState::Disabled as u8),
            remote_ready: AtomicBool::new(false),
        }
    }

    /// Start/stop handshake of the worker.
    pub fn session(&self) -> &SessionControl<BluetoothRequest> {
        &self.session
    }

    /// Ask the phone to skip to the next track.
    pub fn next(&self) -> Result<(), RemoteError> {
        if !self.remote_ready.load(Ordering::Acquire) {
            return Err(RemoteError::NotConnected);
        }
        self.command.signal(RemoteCommand::Next);
        Ok(())
    }

    /// Link state as last published by the worker.
    pub fn link_state(&self) -> LinkState {
        LinkState::from_u8(self.link.load(Ordering::Acquire))
    }

    fn publish(&self, state: &BluetoothState) {
        self.link.store(state.link() as u8, Ordering::Release);
        self.remote_ready
            .store(state.remote_control(), Ordering::Release);
    }
}

impl Default for BluetoothControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Stack calls owed after an event, made once the event borrow is released.
enum FollowUp {
    None,
    Hide,
    Rediscover,
    RequestTitle { register: bool },
    Next,
}

/// Bluetooth worker; run it with
/// [`run_worker`](crate::session::run_worker) on
/// [`BluetoothControl::session`].
pub struct BluetoothFetcher<'a, S: A2dpSink, O: AudioOutput> {
    sink: S,
    output: &'a Mutex<CriticalSectionRawMutex, O>,
    control: &'a BluetoothControl,
    labels: TransactionLabels,
    state: BluetoothState,
}

impl<'a, S: A2dpSink, O: AudioOutput> BluetoothFetcher<'a, S, O> {
    /// Worker over `sink`, writing PCM to `output`.
    pub fn new(
        sink: S,
        output: &'a Mutex<CriticalSectionRawMutex, O>,
        control: &'a BluetoothControl,
    ) -> Self {
        Self {
            sink,
            output,
            control,
            labels: TransactionLabels::new(),
            state: BluetoothState::new(),
        }
    }

    /// The stack, for inspection.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    async fn follow_up(&mut self, action: FollowUp) {
        let result = match action {
            FollowUp::None => Ok(()),
            FollowUp::Hide => self.sink.set_discoverable(false).await,
            FollowUp::Rediscover => self.sink.set_discoverable(true).await,
            FollowUp::RequestTitle { register } => {
                let label = self.labels.next_label();
                let requested = self
                    .sink
                    .request_metadata(label, MediaAttribute::Title.mask())
                    .await;
                if register && requested.is_ok() {
                    let label = self.labels.next_label();
                    self.sink
                        .register_notification(label, Notification::TrackChanged.code())
                        .await
                } else {
                    requested
                }
            }
            FollowUp::Next => {
                if self.state.remote_control() {
                    let key = PassthroughKey::Forward.code();
                    let press = self.labels.next_label();
                    match self.sink.send_passthrough(press, key, false).await {
                        Ok(()) => {
                            let release = self.labels.next_label();
                            self.sink.send_passthrough(release, key, true).await
                        }
                        Err(e) => Err(e),
                    }
                } else {
                    warn!("bluetooth: next ignored, remote control down");
                    Ok(())
                }
            }
        };
        if result.is_err() {
            warn!("bluetooth: stack command failed");
        }
        self.control.publish(&self.state);
    }

    async fn teardown(&mut self) {
        if self.sink.set_discoverable(false).await.is_err() {
            warn!("bluetooth: cannot leave discoverable mode");
        }
        if let Some(peer) = self.state.peer_address() {
            if self.sink.disconnect(peer).await.is_err() {
                warn!("bluetooth: disconnect failed");
            }
        }
        self.state.on_disabled();
        self.control.publish(&self.state);
    }
}

impl<S: A2dpSink, O: AudioOutput> Worker for BluetoothFetcher<'_, S, O> {
    type Request = BluetoothRequest;

    async fn run_session(&mut self, request: BluetoothRequest, token: CancelToken<'_>) {
        info!("bluetooth: sink enabled");
        self.control.command.reset();
        self.state.on_enabled();
        if self.sink.set_discoverable(true).await.is_err() {
            warn!("bluetooth: cannot enter discoverable mode");
        }
        self.control.publish(&self.state);

        while token.is_active() {
            let action = match select(
                with_timeout(EVENT_POLL, self.sink.next_event()),
                self.control.command.wait(),
            )
            .await
            {
                Either::First(Ok(event)) => {
                    handle_event(event, &mut self.state, self.output, request.listener).await
                }
                Either::First(Err(_)) => FollowUp::None,
                Either::Second(RemoteCommand::Next) => FollowUp::Next,
            };
            self.follow_up(action).await;
        }

        self.teardown().await;
        info!("bluetooth: sink disabled");
    }
}

async fn handle_event<O: AudioOutput>(
    event: SinkEvent<'_>,
    state: &mut BluetoothState,
    output: &Mutex<CriticalSectionRawMutex, O>,
    listener: Option<&'static dyn TrackListener>,
) -> FollowUp {
    match event {
        SinkEvent::AudioData(pcm) => {
            write_pcm(output, pcm).await;
            FollowUp::None
        }
        SinkEvent::AudioConfig { codec, sbc_info } => {
            if let MediaCodec::Other(kind) = codec {
                error!("bluetooth: unsupported codec type {}", kind);
                return FollowUp::None;
            }
            let config = SbcConfig::decode(sbc_info);
            if config.channels == ChannelMode::Mono {
                error!("bluetooth: mono streams are not supported");
                return FollowUp::None;
            }
            info!("bluetooth: sbc {} Hz", config.sample_rate_hz);
            match SampleRateHz::new(config.sample_rate_hz) {
                Ok(rate) => {
                    if output.lock().await.set_sample_rate(rate).await.is_err() {
                        warn!("bluetooth: cannot apply sample rate");
                    }
                }
                Err(_) => warn!("bluetooth: sample rate out of range"),
            }
            FollowUp::None
        }
        SinkEvent::Connection {
            state: ConnectionState::Connected,
            peer,
        } => {
            info!("bluetooth: peer connected");
            state.on_connected(peer);
            FollowUp::Hide
        }
        SinkEvent::Connection {
            state: ConnectionState::Disconnected,
            ..
        } => {
            info!("bluetooth: peer disconnected");
            state.on_disconnected();
            FollowUp::Rediscover
        }
        SinkEvent::Connection { .. } => FollowUp::None,
        SinkEvent::RemoteControl { connected } => {
            debug!("bluetooth: remote control {}", u8::from(connected));
            state.on_remote_control(connected);
            if connected {
                FollowUp::RequestTitle { register: true }
            } else {
                FollowUp::None
            }
        }
        SinkEvent::TrackChanged => {
            if state.remote_control() {
                FollowUp::RequestTitle { register: true }
            } else {
                FollowUp::None
            }
        }
        SinkEvent::Metadata { attribute, text } => {
            if attribute == MediaAttribute::Title.id() && state.remote_control() {
                let title = avrcp::title_text(text);
                info!("bluetooth: now playing {}", title.as_str());
                if let Some(listener) = listener {
                    listener.on_title(&title);
                }
            }
            FollowUp::None
        }
    }
}

/// Write all of `pcm`, waiting as long as the bus needs.
async fn write_pcm<O: AudioOutput>(output: &Mutex<CriticalSectionRawMutex, O>, pcm: &[u8]) {
    let mut output = output.lock().await;
    let mut offset = 0usize;
    while let Some(rest) = pcm.get(offset..).filter(|rest| !rest.is_empty()) {
        match output.write(rest, BusWait::Forever).await {
            Ok(0) => embassy_futures::yield_now().await,
            Ok(n) => offset = offset.saturating_add(n),
            Err(_) => {
                warn!("bluetooth: pcm write failed");
                return;
            }
        }
    }
}
