//! Streaming-core wiring: one future that serves every worker session.
//!
//! The board code builds an [`AudioContext`] around the renderer (normally
//! in a `static`), hands this module the network, storage and Bluetooth
//! back ends, and spawns the returned future once. The UI task then drives
//! playback through [`playback::Audio`] on the same context.
//!
//! ```rust,ignore
//! static SLOT: DriverSlot = DriverSlot::new();
//! static CTX: StaticCell<AudioContext<Renderer>> = StaticCell::new();
//!
//! let renderer = Sta350::create(&SLOT, i2c, reset, i2s, Delay)?;
//! let ctx = CTX.init(AudioContext::new(renderer));
//! spawner.must_spawn(streaming_task(ctx, tcp, sd_card, bt_sink));
//!
//! let mut audio = Audio::new(ctx);
//! audio.init().await?;
//! ```

use embassy_futures::select::{select4, Either4};
use platform::{A2dpSink, AudioOutput, Storage, TcpConnect};
use playback::{run_worker, AudioContext, FrameDecoder};

/// Back ends the streaming workers pull audio from.
pub struct Sources<C, S, B> {
    /// Outgoing TCP for internet radio.
    pub connector: C,
    /// File system holding the music library.
    pub storage: S,
    /// Bluetooth A2DP/AVRCP stack.
    pub sink: B,
}

/// Run the radio, file, Bluetooth and decode workers forever.
///
/// Each worker parks until the facade starts a session for it, so the
/// idle cost is four pending signal waits.
pub async fn run_streaming_core<O, C, S, B, D, const N: usize>(
    ctx: &AudioContext<O, N>,
    sources: Sources<C, S, B>,
    decoder: D,
) -> !
where
    O: AudioOutput,
    C: TcpConnect,
    S: Storage,
    B: A2dpSink,
    D: FrameDecoder,
{
    let mut radio = ctx.radio_fetcher(sources.connector);
    let mut file = ctx.file_fetcher(sources.storage);
    let mut bluetooth = ctx.bluetooth_fetcher(sources.sink);
    let mut decode = ctx.decode_worker(decoder);

    #[cfg(feature = "defmt")]
    defmt::info!("streaming core up, {=usize} byte stream buffer", N);

    match select4(
        run_worker(ctx.radio_session(), &mut radio),
        run_worker(ctx.music_session(), &mut file),
        run_worker(ctx.bluetooth().session(), &mut bluetooth),
        run_worker(ctx.decoder_session(), &mut decode),
    )
    .await
    {
        Either4::First(never)
        | Either4::Second(never)
        | Either4::Third(never)
        | Either4::Fourth(never) => match never {},
    }
}
