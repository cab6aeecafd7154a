//! Audio facade: the control surface the UI calls.
//!
//! [`AudioContext`] owns everything the streaming workers share: the stream
//! buffer, the renderer, and one session control per worker. It is built
//! once (usually in a `static`) and the workers are created from it.
//! [`Audio`] sits on top and enforces the rules: one source at a time,
//! starting a source stops the current one, and stopping tears the pipeline
//! down consumer-first so no stale bytes survive into the next session.
//!
//! ```text
//!   UI ──► Audio ──► SessionControl ──► RadioFetcher ─┐
//!                                   ──► FileFetcher  ─┼─► StreamBuffer ─► DecodeWorker ─┐
//!                                   ──► BluetoothFetcher ───────────────────────────────┴─► AudioOutput
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use platform::{A2dpSink, AudioOutput, Storage, TcpConnect, VolumeStep};

use bluetooth::LinkState;

use crate::decode::DecodeWorker;
use crate::decoder::{AudioFormat, FrameDecoder};
use crate::fetch::bluetooth::{BluetoothControl, BluetoothFetcher, BluetoothRequest, RemoteError};
use crate::fetch::file::{FileFetcher, FileRequest};
use crate::fetch::radio::{RadioFetcher, RadioRequest};
use crate::ring_buffer::StreamBuffer;
use crate::session::SessionControl;
use crate::track::TrackListener;
use crate::volume::VolumeControl;

/// Stream buffer size for radio and file playback.
pub const STREAM_BUFFER_BYTES: usize = 144 * 1024;

/// A playback source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Source {
    /// Internet radio.
    Radio,
    /// Local music file.
    Music,
    /// Bluetooth A2DP sink.
    Bluetooth,
}

/// Lifecycle of one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SourceState {
    /// Not playing.
    #[default]
    Idle,
    /// Pipeline being brought up.
    Starting,
    /// Workers running.
    Playing,
}

/// Errors returned to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioError {
    /// The renderer rejected a command.
    Output,
    /// The file is not in a format the decoder handles.
    UnsupportedFormat,
    /// The file path does not fit the request buffer.
    PathTooLong,
    /// The command needs a source that is not playing.
    NotPlaying,
    /// The phone's remote-control channel is down.
    RemoteUnavailable,
}

impl AudioError {
    /// Short description for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Output => "audio output error",
            Self::UnsupportedFormat => "unsupported audio format",
            Self::PathTooLong => "file path too long",
            Self::NotPlaying => "source not playing",
            Self::RemoteUnavailable => "remote control unavailable",
        }
    }
}

impl core::fmt::Display for AudioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RemoteError> for AudioError {
    fn from(_: RemoteError) -> Self {
        Self::RemoteUnavailable
    }
}

/// Shared state of the streaming core.
pub struct AudioContext<O, const N: usize = STREAM_BUFFER_BYTES> {
    buffer: StreamBuffer<N>,
    output: Mutex<CriticalSectionRawMutex, O>,
    radio: SessionControl<RadioRequest>,
    music: SessionControl<FileRequest>,
    decoder: SessionControl<()>,
    bluetooth: BluetoothControl,
    volume: VolumeControl,
}

impl<O: AudioOutput, const N: usize> AudioContext<O, N> {
    /// Context around the renderer `output`, volume at its power-on step.
    pub const fn new(output: O) -> Self {
        Self {
            buffer: StreamBuffer::new(),
            output: Mutex::new(output),
            radio: SessionControl::new(),
            music: SessionControl::new(),
            decoder: SessionControl::new(),
            bluetooth: BluetoothControl::new(),
            volume: VolumeControl::new(VolumeStep::DEFAULT),
        }
    }

    /// The stream buffer between fetchers and decoder.
    pub fn buffer(&self) -> &StreamBuffer<N> {
        &self.buffer
    }

    /// The renderer.
    pub fn output(&self) -> &Mutex<CriticalSectionRawMutex, O> {
        &self.output
    }

    /// Take the renderer back, e.g. to release its peripherals.
    pub fn into_output(self) -> O {
        self.output.into_inner()
    }

    /// Session control of the radio worker.
    pub fn radio_session(&self) -> &SessionControl<RadioRequest> {
        &self.radio
    }

    /// Session control of the file worker.
    pub fn music_session(&self) -> &SessionControl<FileRequest> {
        &self.music
    }

    /// Session control of the decode worker.
    pub fn decoder_session(&self) -> &SessionControl<()> {
        &self.decoder
    }

    /// Bluetooth worker control.
    pub fn bluetooth(&self) -> &BluetoothControl {
        &self.bluetooth
    }

    /// Radio worker over `connector`.
    pub fn radio_fetcher<C: TcpConnect>(&self, connector: C) -> RadioFetcher<'_, C, N> {
        RadioFetcher::new(connector, &self.buffer)
    }

    /// File worker over `storage`.
    pub fn file_fetcher<S: Storage>(&self, storage: S) -> FileFetcher<'_, S, N> {
        FileFetcher::new(storage, &self.buffer)
    }

    /// Decode worker running `decoder`.
    pub fn decode_worker<D: FrameDecoder>(&self, decoder: D) -> DecodeWorker<'_, D, O, N> {
        DecodeWorker::new(decoder, &self.buffer, &self.output)
    }

    /// Bluetooth worker over `sink`.
    pub fn bluetooth_fetcher<S: A2dpSink>(&self, sink: S) -> BluetoothFetcher<'_, S, O> {
        BluetoothFetcher::new(sink, &self.output, &self.bluetooth)
    }
}

/// The control surface.
pub struct Audio<'a, O: AudioOutput, const N: usize = STREAM_BUFFER_BYTES> {
    ctx: &'a AudioContext<O, N>,
    radio: SourceState,
    music: SourceState,
    bluetooth: SourceState,
}

impl<'a, O: AudioOutput, const N: usize> Audio<'a, O, N> {
    /// Facade over `ctx`; nothing is playing.
    pub fn new(ctx: &'a AudioContext<O, N>) -> Self {
        Self {
            ctx,
            radio: SourceState::Idle,
            music: SourceState::Idle,
            bluetooth: SourceState::Idle,
        }
    }

    /// Bring up the renderer and apply the initial volume.
    ///
    /// Failure here means the board cannot play audio at all.
    pub async fn init(&mut self) -> Result<(), AudioError> {
        let mut output = self.ctx.output.lock().await;
        output.init().await.map_err(|_| AudioError::Output)?;
        output
            .set_volume(self.ctx.volume.step())
            .await
            .map_err(|_| AudioError::Output)?;
        info!("audio: init done, level {}", self.ctx.volume.level());
        Ok(())
    }

    /// Lifecycle state of `source`.
    pub fn state(&self, source: Source) -> SourceState {
        match source {
            Source::Radio => self.radio,
            Source::Music => self.music,
            Source::Bluetooth => self.bluetooth,
        }
    }

    /// The source that is starting or playing, if any.
    pub fn active_source(&self) -> Option<Source> {
        [Source::Radio, Source::Music, Source::Bluetooth]
            .into_iter()
            .find(|&source| self.state(source) != SourceState::Idle)
    }

    /// Play an internet radio station.
    pub async fn radio_play(&mut self, request: RadioRequest) -> Result<(), AudioError> {
        self.stop_all().await;
        self.radio = SourceState::Starting;
        info!("audio: radio {}", request.locator.host.as_str());
        self.ctx.buffer.reset();
        {
            let mut output = self.ctx.output.lock().await;
            if output.set_sample_rate(request.sample_rate).await.is_err() {
                warn!("audio: cannot preset sample rate");
            }
            if output.start().await.is_err() {
                self.radio = SourceState::Idle;
                return Err(AudioError::Output);
            }
        }
        self.ctx.radio.start(request);
        self.ctx.decoder.start(());
        self.radio = SourceState::Playing;
        Ok(())
    }

    /// Stop the radio; no-op when it is not playing.
    pub async fn radio_stop(&mut self) {
        if self.radio == SourceState::Idle {
            return;
        }
        self.teardown_stream(&self.ctx.radio).await;
        self.radio = SourceState::Idle;
        info!("audio: radio stopped");
    }

    /// Play a music file from storage.
    pub async fn music_play(&mut self, path: &str) -> Result<(), AudioError> {
        AudioFormat::from_path(path).ok_or(AudioError::UnsupportedFormat)?;
        let request = FileRequest::new(path).ok_or(AudioError::PathTooLong)?;
        self.stop_all().await;
        self.music = SourceState::Starting;
        self.ctx.buffer.reset();
        if self.ctx.output.lock().await.start().await.is_err() {
            self.music = SourceState::Idle;
            return Err(AudioError::Output);
        }
        self.ctx.music.start(request);
        self.ctx.decoder.start(());
        self.music = SourceState::Playing;
        info!("audio: music {}", path);
        Ok(())
    }

    /// Stop the music file; no-op when it is not playing.
    pub async fn music_stop(&mut self) {
        if self.music == SourceState::Idle {
            return;
        }
        self.teardown_stream(&self.ctx.music).await;
        self.music = SourceState::Idle;
        info!("audio: music stopped");
    }

    /// Become a Bluetooth speaker; titles go to `listener`.
    pub async fn bluetooth_play(
        &mut self,
        listener: Option<&'static dyn TrackListener>,
    ) -> Result<(), AudioError> {
        self.stop_all().await;
        self.bluetooth = SourceState::Starting;
        if self.ctx.output.lock().await.start().await.is_err() {
            self.bluetooth = SourceState::Idle;
            return Err(AudioError::Output);
        }
        self.ctx
            .bluetooth
            .session()
            .start(BluetoothRequest { listener });
        self.bluetooth = SourceState::Playing;
        info!("audio: bluetooth");
        Ok(())
    }

    /// Stop the Bluetooth sink; no-op when it is not playing.
    pub async fn bluetooth_stop(&mut self) {
        if self.bluetooth == SourceState::Idle {
            return;
        }
        self.ctx.bluetooth.session().stop().await;
        if self.ctx.output.lock().await.stop().await.is_err() {
            warn!("audio: output stop failed");
        }
        self.bluetooth = SourceState::Idle;
        info!("audio: bluetooth stopped");
    }

    /// Ask the connected phone to skip to the next track.
    pub fn bluetooth_next(&self) -> Result<(), AudioError> {
        if self.bluetooth != SourceState::Playing {
            return Err(AudioError::NotPlaying);
        }
        self.ctx.bluetooth.next()?;
        Ok(())
    }

    /// Link state of the Bluetooth sink.
    pub fn bluetooth_state(&self) -> LinkState {
        self.ctx.bluetooth.link_state()
    }

    /// One step louder; returns the new level.
    pub async fn volume_up(&mut self) -> u8 {
        let step = self.ctx.volume.louder();
        self.apply_volume(step).await;
        step.level()
    }

    /// One step quieter; returns the new level.
    pub async fn volume_down(&mut self) -> u8 {
        let step = self.ctx.volume.quieter();
        self.apply_volume(step).await;
        step.level()
    }

    /// Current volume level (0 = quietest).
    pub fn volume_level(&self) -> u8 {
        self.ctx.volume.level()
    }

    /// Loudest volume level.
    pub fn volume_max_level(&self) -> u8 {
        self.ctx.volume.max_level()
    }

    /// Stream buffer fill level in percent.
    pub fn buffer_level(&self) -> u8 {
        self.ctx.buffer.level()
    }

    /// Stop a radio or music session whose fetcher finished and whose
    /// buffered bytes have all been decoded. Returns the stopped source.
    ///
    /// Call periodically from the UI task.
    pub async fn poll_end_of_stream(&mut self) -> Option<Source> {
        if !self.ctx.buffer.is_empty() {
            return None;
        }
        if self.music == SourceState::Playing && self.ctx.music.is_finished() {
            self.music_stop().await;
            return Some(Source::Music);
        }
        if self.radio == SourceState::Playing && self.ctx.radio.is_finished() {
            self.radio_stop().await;
            return Some(Source::Radio);
        }
        None
    }

    async fn apply_volume(&mut self, step: VolumeStep) {
        debug!("audio: volume step {}", step.get());
        if self.ctx.output.lock().await.set_volume(step).await.is_err() {
            warn!("audio: volume change failed");
        }
    }

    async fn stop_all(&mut self) {
        self.radio_stop().await;
        self.music_stop().await;
        self.bluetooth_stop().await;
    }

    /// Decoder first, then the fetcher, then the renderer; finally drop
    /// whatever is still buffered.
    async fn teardown_stream<R>(&self, fetcher: &SessionControl<R>) {
        self.ctx.decoder.stop().await;
        fetcher.stop().await;
        if self.ctx.output.lock().await.stop().await.is_err() {
            warn!("audio: output stop failed");
        }
        self.ctx.buffer.reset();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use platform::mocks::MockOutput;

    type Ctx = AudioContext<MockOutput, 1024>;

    #[tokio::test]
    async fn init_applies_default_volume() {
        let ctx = Ctx::new(MockOutput::new());
        let mut audio = Audio::new(&ctx);
        audio.init().await.unwrap();
        let out = ctx.output().lock().await;
        assert!(out.is_initialised());
        assert_eq!(out.volume(), Some(VolumeStep::DEFAULT));
    }

    #[tokio::test]
    async fn init_failure_is_reported() {
        let ctx = Ctx::new(MockOutput::new().failing_init());
        let mut audio = Audio::new(&ctx);
        assert_eq!(audio.init().await, Err(AudioError::Output));
    }

    #[tokio::test]
    async fn volume_is_clamped_and_tolerates_write_failures() {
        let ctx = Ctx::new(MockOutput::new());
        let mut audio = Audio::new(&ctx);
        audio.init().await.unwrap();
        for _ in 0..20 {
            audio.volume_up().await;
        }
        assert_eq!(audio.volume_level(), audio.volume_max_level());
        ctx.output().lock().await.set_fail_volume(true);
        assert_eq!(audio.volume_down().await, 15);
        for _ in 0..20 {
            audio.volume_down().await;
        }
        assert_eq!(audio.volume_level(), 0);
    }

    #[tokio::test]
    async fn music_play_rejects_unknown_format() {
        let ctx = Ctx::new(MockOutput::new());
        let mut audio = Audio::new(&ctx);
        assert_eq!(
            audio.music_play("/music/notes.txt").await,
            Err(AudioError::UnsupportedFormat)
        );
        assert_eq!(audio.state(Source::Music), SourceState::Idle);
        assert_eq!(ctx.output().lock().await.start_count(), 0);
    }

    #[tokio::test]
    async fn next_requires_bluetooth() {
        let ctx = Ctx::new(MockOutput::new());
        let audio = Audio::new(&ctx);
        assert_eq!(audio.bluetooth_next(), Err(AudioError::NotPlaying));
        assert_eq!(audio.bluetooth_state(), LinkState::Disabled);
    }

    #[tokio::test]
    async fn stop_on_idle_source_is_noop() {
        let ctx = Ctx::new(MockOutput::new());
        let mut audio = Audio::new(&ctx);
        audio.radio_stop().await;
        audio.music_stop().await;
        audio.bluetooth_stop().await;
        assert_eq!(ctx.output().lock().await.stop_count(), 0);
        assert_eq!(audio.active_source(), None);
    }
}
