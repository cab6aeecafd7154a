//! End-to-end sessions through the facade: fetcher → stream buffer →
//! decode worker → renderer, with every worker running as its own future.
#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

mod common;

use common::{pattern, PassthroughDecoder, FRAME_BYTES};
use bluetooth::LinkState;
use embassy_futures::select::{select, select3, select4, Either, Either3, Either4};
use embassy_time::{Duration, Timer};
use platform::mocks::{
    MockA2dpSink, MockConnector, MockOutput, MockStorage, ScriptedEvent, SinkCommand,
};
use platform::{ConnectionState, MediaCodec, SampleRateHz};
use playback::{
    run_worker, Audio, AudioContext, RadioRequest, Source, SourceState, StreamLocator,
    TitleSignal,
};

type Ctx = AudioContext<MockOutput, 4096>;

async fn written_len(ctx: &Ctx) -> usize {
    ctx.output().lock().await.written().len()
}

#[tokio::test]
async fn radio_follows_redirect_strips_metadata_and_ends_idle() {
    static TITLES: TitleSignal = TitleSignal::new();

    let first = pattern(FRAME_BYTES, 0);
    let second = pattern(FRAME_BYTES, 100);
    let mut body = first.clone();
    let meta = b"StreamTitle='Artist - Song';";
    let mut block = meta.to_vec();
    block.resize(32, 0);
    body.push(2);
    body.extend_from_slice(&block);
    body.extend_from_slice(&second);

    let mut ok = b"ICY 200 OK\r\nicy-metaint: 64\r\n\r\n".to_vec();
    ok.extend_from_slice(&body);
    let connector = MockConnector::new()
        .respond("HTTP/1.1 302 Found\r\nLocation: http://stream.example:8000/live\r\n\r\n")
        .respond(ok)
        .with_chunk(17);

    let ctx = Ctx::new(MockOutput::new());
    let mut radio = ctx.radio_fetcher(connector);
    let mut decoder = ctx.decode_worker(PassthroughDecoder);
    let mut audio = Audio::new(&ctx);

    let request = RadioRequest::new(
        StreamLocator::parse_url("http://radio.example/stream").unwrap(),
        SampleRateHz::new(44_100).unwrap(),
    )
    .with_titles(&TITLES);

    let script = async {
        audio.init().await.unwrap();
        audio.radio_play(request).await.unwrap();
        assert_eq!(audio.active_source(), Some(Source::Radio));
        while written_len(&ctx).await < 2 * FRAME_BYTES {
            Timer::after(Duration::from_millis(1)).await;
        }
        loop {
            if audio.poll_end_of_stream().await == Some(Source::Radio) {
                break;
            }
            Timer::after(Duration::from_millis(1)).await;
        }
        assert_eq!(audio.state(Source::Radio), SourceState::Idle);
    };
    match select3(
        run_worker(ctx.radio_session(), &mut radio),
        run_worker(ctx.decoder_session(), &mut decoder),
        script,
    )
    .await
    {
        Either3::First(never) | Either3::Second(never) => match never {},
        Either3::Third(()) => {}
    }

    let out = ctx.output().lock().await;
    let mut expected = first;
    expected.extend_from_slice(&second);
    assert_eq!(out.written(), &expected[..]);
    assert_eq!(out.start_count(), 1);
    assert_eq!(out.stop_count(), 1);
    assert_eq!(TITLES.current().as_str(), "Artist\nSong");

    let connector = radio.connector();
    assert_eq!(connector.connects[0], ("radio.example".into(), 80));
    assert_eq!(connector.connects[1], ("stream.example".into(), 8000));
    assert!(connector.requests[1].starts_with("GET /live HTTP/1.0\r\n"));
    assert!(connector.requests[1].contains("Icy-MetaData: 1\r\n"));
}

#[tokio::test]
async fn short_file_plays_through_and_returns_to_idle() {
    let track = pattern(3 * FRAME_BYTES, 7);
    let storage = MockStorage::new().with_file("/music/short.mp3", track.clone());

    let ctx = Ctx::new(MockOutput::new());
    let mut file = ctx.file_fetcher(storage);
    let mut decoder = ctx.decode_worker(PassthroughDecoder);
    let mut audio = Audio::new(&ctx);

    let script = async {
        audio.music_play("/music/short.mp3").await.unwrap();
        loop {
            if audio.poll_end_of_stream().await == Some(Source::Music) {
                break;
            }
            Timer::after(Duration::from_millis(1)).await;
        }
        assert_eq!(audio.active_source(), None);
        assert_eq!(audio.buffer_level(), 0);
    };
    match select3(
        run_worker(ctx.music_session(), &mut file),
        run_worker(ctx.decoder_session(), &mut decoder),
        script,
    )
    .await
    {
        Either3::First(never) | Either3::Second(never) => match never {},
        Either3::Third(()) => {}
    }

    assert_eq!(ctx.output().lock().await.written(), &track[..]);
}

#[tokio::test]
async fn music_plays_from_local_disk() {
    use platform::storage_local::LocalFileStorage;

    let tmp = tempfile::TempDir::new().unwrap();
    std::fs::create_dir(tmp.path().join("album")).unwrap();
    let track = pattern(5 * FRAME_BYTES, 0x21);
    std::fs::write(tmp.path().join("album/01.MP3"), &track).unwrap();

    let ctx = Ctx::new(MockOutput::new());
    let mut file = ctx.file_fetcher(LocalFileStorage::new(tmp.path().to_str().unwrap()));
    let mut decoder = ctx.decode_worker(PassthroughDecoder);
    let mut audio = Audio::new(&ctx);

    let script = async {
        audio.music_play("/album/01.MP3").await.unwrap();
        while audio.poll_end_of_stream().await != Some(Source::Music) {
            Timer::after(Duration::from_millis(1)).await;
        }
    };
    match select3(
        run_worker(ctx.music_session(), &mut file),
        run_worker(ctx.decoder_session(), &mut decoder),
        script,
    )
    .await
    {
        Either3::First(never) | Either3::Second(never) => match never {},
        Either3::Third(()) => {}
    }

    assert_eq!(ctx.output().lock().await.written(), &track[..]);
}

#[tokio::test]
async fn stop_returns_while_fetcher_is_blocked_on_a_full_buffer() {
    let storage = MockStorage::new().with_file("/music/long.mp3", pattern(64 * 1024, 0));

    // The renderer never accepts data, so the decoder stalls and the
    // buffer fills up behind it.
    let ctx: AudioContext<MockOutput, 256> = AudioContext::new(MockOutput::new().with_max_per_write(0));
    let mut file = ctx.file_fetcher(storage);
    let mut decoder = ctx.decode_worker(PassthroughDecoder);
    let mut audio = Audio::new(&ctx);

    let script = async {
        audio.music_play("/music/long.mp3").await.unwrap();
        while audio.buffer_level() < 100 {
            Timer::after(Duration::from_millis(1)).await;
        }
        audio.music_stop().await;
        assert_eq!(audio.state(Source::Music), SourceState::Idle);
        assert_eq!(audio.buffer_level(), 0);
        assert!(!ctx.music_session().is_running());
        assert!(!ctx.decoder_session().is_running());
    };
    match select3(
        run_worker(ctx.music_session(), &mut file),
        run_worker(ctx.decoder_session(), &mut decoder),
        script,
    )
    .await
    {
        Either3::First(never) | Either3::Second(never) => match never {},
        Either3::Third(()) => {}
    }
}

#[tokio::test]
async fn radio_fills_the_buffer_while_the_renderer_stalls() {
    let mut ok = b"ICY 200 OK\r\n\r\n".to_vec();
    ok.extend_from_slice(&pattern(64 * 1024, 7));
    let connector = MockConnector::new().respond(ok).hold_open();

    let ctx: AudioContext<MockOutput, 256> = AudioContext::new(MockOutput::new().with_max_per_write(0));
    let mut radio = ctx.radio_fetcher(connector);
    let mut decoder = ctx.decode_worker(PassthroughDecoder);
    let mut audio = Audio::new(&ctx);

    let request = RadioRequest::new(
        StreamLocator::parse_url("http://radio.example/fast").unwrap(),
        SampleRateHz::new(44_100).unwrap(),
    );
    let script = async {
        assert_eq!(audio.buffer_level(), 0);
        audio.radio_play(request).await.unwrap();
        let mut peak = 0;
        while peak < 100 {
            peak = peak.max(audio.buffer_level());
            Timer::after(Duration::from_millis(1)).await;
        }
        assert_eq!(audio.buffer_level(), 100);
        audio.radio_stop().await;
        assert_eq!(audio.state(Source::Radio), SourceState::Idle);
        assert!(!ctx.radio_session().is_running());
        ctx.buffer().reset();
        assert_eq!(audio.buffer_level(), 0);
    };
    match select3(
        run_worker(ctx.radio_session(), &mut radio),
        run_worker(ctx.decoder_session(), &mut decoder),
        script,
    )
    .await
    {
        Either3::First(never) | Either3::Second(never) => match never {},
        Either3::Third(()) => {}
    }
}

#[tokio::test]
async fn switching_sources_leaks_no_bytes_into_the_next_session() {
    let radio_bytes = pattern(8 * FRAME_BYTES, 0x40);
    let mut ok = b"HTTP/1.0 200 OK\r\n\r\n".to_vec();
    ok.extend_from_slice(&radio_bytes);
    let connector = MockConnector::new().respond(ok).hold_open();
    let track = pattern(2 * FRAME_BYTES, 0x90);
    let storage = MockStorage::new().with_file("/music/next.mp3", track.clone());

    let ctx = Ctx::new(MockOutput::new());
    let mut radio = ctx.radio_fetcher(connector);
    let mut file = ctx.file_fetcher(storage);
    let mut decoder = ctx.decode_worker(PassthroughDecoder);
    let mut audio = Audio::new(&ctx);

    let request = RadioRequest::new(
        StreamLocator::parse_url("http://radio.example/").unwrap(),
        SampleRateHz::new(44_100).unwrap(),
    );
    let script = async {
        audio.radio_play(request).await.unwrap();
        while written_len(&ctx).await < FRAME_BYTES {
            Timer::after(Duration::from_millis(1)).await;
        }
        // Starting music stops the radio first.
        audio.music_play("/music/next.mp3").await.unwrap();
        assert_eq!(audio.state(Source::Radio), SourceState::Idle);
        let radio_part = written_len(&ctx).await;
        assert_eq!(radio_part % FRAME_BYTES, 0);
        while written_len(&ctx).await < radio_part + track.len() {
            Timer::after(Duration::from_millis(1)).await;
        }
        Timer::after(Duration::from_millis(20)).await;
        let out = ctx.output().lock().await;
        assert_eq!(&out.written()[..radio_part], &radio_bytes[..radio_part]);
        assert_eq!(&out.written()[radio_part..], &track[..]);
    };
    match select4(
        run_worker(ctx.radio_session(), &mut radio),
        run_worker(ctx.music_session(), &mut file),
        run_worker(ctx.decoder_session(), &mut decoder),
        script,
    )
    .await
    {
        Either4::First(never) | Either4::Second(never) | Either4::Third(never) => match never {},
        Either4::Fourth(()) => {}
    }
}

#[tokio::test]
async fn bluetooth_speaker_plays_titles_and_skips() {
    static TITLES: TitleSignal = TitleSignal::new();
    const PHONE: [u8; 6] = [0xA0, 0xB1, 0xC2, 0xD3, 0xE4, 0xF5];

    // 44.1 kHz, joint stereo
    let sink = MockA2dpSink::new()
        .then(ScriptedEvent::Connection(ConnectionState::Connected, PHONE))
        .then(ScriptedEvent::AudioConfig(MediaCodec::Sbc, 0x21))
        .then(ScriptedEvent::RemoteControl(true))
        .then(ScriptedEvent::Metadata(1, b"Phone Song".to_vec()))
        .then(ScriptedEvent::AudioData(vec![9; 8]));

    let ctx = Ctx::new(MockOutput::new());
    let mut speaker = ctx.bluetooth_fetcher(sink);
    let mut audio = Audio::new(&ctx);

    let script = async {
        audio.init().await.unwrap();
        audio.bluetooth_play(Some(&TITLES)).await.unwrap();
        assert_eq!(audio.active_source(), Some(Source::Bluetooth));
        assert_eq!(TITLES.wait_changed().await.as_str(), "Phone Song");
        while written_len(&ctx).await < 8 {
            Timer::after(Duration::from_millis(1)).await;
        }
        assert_eq!(audio.bluetooth_state(), LinkState::Connected);
        audio.bluetooth_next().unwrap();
        Timer::after(Duration::from_millis(20)).await;
        audio.bluetooth_stop().await;
        assert_eq!(audio.state(Source::Bluetooth), SourceState::Idle);
        assert_eq!(audio.bluetooth_state(), LinkState::Disabled);
    };
    match select(run_worker(ctx.bluetooth().session(), &mut speaker), script).await {
        Either::First(never) => match never {},
        Either::Second(()) => {}
    }

    let out = ctx.output().lock().await;
    assert_eq!(out.written(), &[9; 8]);
    assert_eq!(out.rates(), &[SampleRateHz::new(44_100).unwrap()]);
    assert_eq!((out.start_count(), out.stop_count()), (1, 1));
    drop(out);

    let commands = &speaker.sink().commands;
    let presses = commands
        .iter()
        .filter(|c| matches!(c, SinkCommand::Passthrough { .. }))
        .count();
    assert_eq!(presses, 2, "press and release");
    assert_eq!(commands.last(), Some(&SinkCommand::Disconnect(PHONE)));
}
