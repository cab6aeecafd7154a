//! Internet radio fetcher: HTTP GET, optional ICY metadata, bytes into the
//! stream buffer.
//!
//! One session is one station. The fetcher follows up to
//! [`MAX_REDIRECTS`] redirects, then reads the body in 1 KiB pieces. Each
//! read is bounded so the active flag is polled at least every 100 ms; a
//! stream that delivers nothing for the stall limit is abandoned. Whatever
//! ends the session, the worker returns and the completion signal fires.

use embassy_time::{with_timeout, Duration, Instant};
use embedded_io_async::Read;
use platform::{SampleRateHz, TcpConnect};

use super::{push_while_active, Cancelled};
use crate::http::{self, HttpError, StreamLocator, HEADER_CAPACITY, MAX_REDIRECTS};
use crate::icy::{IcyParser, Segment};
use crate::ring_buffer::StreamBuffer;
use crate::session::{CancelToken, Worker};
use crate::track::TrackListener;

/// Bytes requested per socket read.
pub const CHUNK_BYTES: usize = 1024;

/// Bound on DNS + connect and on receiving the response header.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time without data after which a stream counts as dead.
pub const DEFAULT_STALL_LIMIT: Duration = Duration::from_secs(5);

const READ_SLICE: Duration = Duration::from_millis(100);

/// Parameters of one radio session.
#[derive(Clone)]
pub struct RadioRequest {
    /// Station address.
    pub locator: StreamLocator,
    /// Nominal sample rate, applied before the first frame decodes.
    pub sample_rate: SampleRateHz,
    /// Ask the server for in-band titles.
    pub icy_metadata: bool,
    /// Receives titles when `icy_metadata` is set.
    pub listener: Option<&'static dyn TrackListener>,
}

impl RadioRequest {
    /// Request for `locator` without metadata.
    pub fn new(locator: StreamLocator, sample_rate: SampleRateHz) -> Self {
        Self {
            locator,
            sample_rate,
            icy_metadata: false,
            listener: None,
        }
    }

    /// Ask for ICY metadata and deliver titles to `listener`.
    #[must_use]
    pub fn with_titles(mut self, listener: &'static dyn TrackListener) -> Self {
        self.icy_metadata = true;
        self.listener = Some(listener);
        self
    }
}

/// Why a radio session ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// Name resolution or TCP connect failed or timed out.
    Connect,
    /// Request or response header problem.
    Http(HttpError),
    /// No data within the stall limit.
    Stalled,
    /// The connection failed mid-stream.
    Io,
}

impl RadioError {
    /// Short description for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect failed",
            Self::Http(e) => e.as_str(),
            Self::Stalled => "stream stalled",
            Self::Io => "stream read failed",
        }
    }
}

impl From<HttpError> for RadioError {
    fn from(e: HttpError) -> Self {
        Self::Http(e)
    }
}

impl core::fmt::Display for RadioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Http(e) => write!(f, "http: {e}"),
            other => f.write_str(other.as_str()),
        }
    }
}

enum Outcome {
    Redirect(StreamLocator),
    EndOfStream,
    Cancelled,
}

/// Radio worker; run it with [`run_worker`](crate::session::run_worker).
pub struct RadioFetcher<'a, C: TcpConnect, const N: usize> {
    connector: C,
    buffer: &'a StreamBuffer<N>,
    stall_limit: Duration,
    icy: IcyParser,
    last_error: Option<RadioError>,
    head: [u8; HEADER_CAPACITY],
    chunk: [u8; CHUNK_BYTES],
}

impl<'a, C: TcpConnect, const N: usize> RadioFetcher<'a, C, N> {
    /// Fetcher that opens connections through `connector` and fills `buffer`.
    pub fn new(connector: C, buffer: &'a StreamBuffer<N>) -> Self {
        Self {
            connector,
            buffer,
            stall_limit: DEFAULT_STALL_LIMIT,
            icy: IcyParser::new(0),
            last_error: None,
            head: [0; HEADER_CAPACITY],
            chunk: [0; CHUNK_BYTES],
        }
    }

    /// Override the stall limit.
    #[must_use]
    pub fn with_stall_limit(mut self, limit: Duration) -> Self {
        self.stall_limit = limit;
        self
    }

    /// The connector, for inspection.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Error that ended the last session, if it did not end cleanly.
    pub fn last_error(&self) -> Option<RadioError> {
        self.last_error
    }

    async fn stream_once(
        &mut self,
        locator: &StreamLocator,
        request: &RadioRequest,
        token: CancelToken<'_>,
    ) -> Result<Outcome, RadioError> {
        let buffer = self.buffer;
        let stall_limit = self.stall_limit;
        let icy = &mut self.icy;
        let head_buf = &mut self.head;
        let chunk = &mut self.chunk;

        debug!("radio: connecting to {} port {}", locator.host.as_str(), locator.port);
        let mut conn = match with_timeout(
            CONNECT_TIMEOUT,
            self.connector.connect(&locator.host, locator.port),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(_)) | Err(_) => return Err(RadioError::Connect),
        };

        http::write_request(&mut conn, locator, request.icy_metadata).await?;
        let (head, filled) = with_timeout(
            CONNECT_TIMEOUT,
            http::read_response_head(&mut conn, head_buf, locator),
        )
        .await
        .map_err(|_| RadioError::Stalled)??;

        if head.is_redirect() {
            return head
                .location
                .map(Outcome::Redirect)
                .ok_or(RadioError::Http(HttpError::Malformed));
        }
        if !(200..300).contains(&head.status) {
            return Err(HttpError::BadStatus(head.status).into());
        }

        let interval = if request.icy_metadata {
            head.meta_interval
        } else {
            0
        };
        debug!("radio: status {} metaint {}", head.status, interval);
        *icy = IcyParser::new(interval);

        let body = head_buf.get(head.header_len..filled).unwrap_or_default();
        if forward(icy, body, buffer, token, request.listener).await.is_err() {
            return Ok(Outcome::Cancelled);
        }

        let mut last_data = Instant::now();
        while token.is_active() {
            match with_timeout(READ_SLICE, conn.read(chunk.as_mut_slice())).await {
                Err(_) => {
                    if last_data.elapsed() >= stall_limit {
                        return Err(RadioError::Stalled);
                    }
                }
                Ok(Ok(0)) => return Ok(Outcome::EndOfStream),
                Ok(Ok(n)) => {
                    last_data = Instant::now();
                    let bytes = chunk.get(..n).unwrap_or_default();
                    if forward(icy, bytes, buffer, token, request.listener)
                        .await
                        .is_err()
                    {
                        return Ok(Outcome::Cancelled);
                    }
                }
                Ok(Err(_)) => return Err(RadioError::Io),
            }
        }
        Ok(Outcome::Cancelled)
    }
}

/// Run `bytes` through the ICY parser: audio to the buffer, titles to the
/// listener.
async fn forward<const N: usize>(
    icy: &mut IcyParser,
    mut bytes: &[u8],
    buffer: &StreamBuffer<N>,
    token: CancelToken<'_>,
    listener: Option<&'static dyn TrackListener>,
) -> Result<(), Cancelled> {
    while let Some(segment) = icy.next(&mut bytes) {
        match segment {
            Segment::Audio(audio) => {
                push_while_active(buffer, audio, token, Duration::from_ticks(0)).await?;
            }
            Segment::Metadata => {
                if let Some(title) = icy.title() {
                    info!("radio: now playing {}", title.as_str());
                    if let Some(listener) = listener {
                        listener.on_title(&title);
                    }
                }
            }
        }
    }
    Ok(())
}

impl<C: TcpConnect, const N: usize> Worker for RadioFetcher<'_, C, N> {
    type Request = RadioRequest;

    async fn run_session(&mut self, request: RadioRequest, token: CancelToken<'_>) {
        info!("radio: request {}{}", request.locator.host.as_str(), request.locator.path.as_str());
        self.last_error = None;
        let mut locator = request.locator.clone();
        let mut hops = 0usize;
        loop {
            match self.stream_once(&locator, &request, token).await {
                Ok(Outcome::Redirect(next)) => {
                    if hops >= MAX_REDIRECTS {
                        self.last_error = Some(RadioError::Http(HttpError::TooManyRedirects));
                        warn!("radio: {}", HttpError::TooManyRedirects.as_str());
                        break;
                    }
                    hops = hops.saturating_add(1);
                    debug!("radio: redirected to {}", next.host.as_str());
                    locator = next;
                }
                Ok(Outcome::EndOfStream) => {
                    info!("radio: end of stream");
                    break;
                }
                Ok(Outcome::Cancelled) => {
                    debug!("radio: stopped");
                    break;
                }
                Err(e) => {
                    warn!("radio: {}", e.as_str());
                    self.last_error = Some(e);
                    break;
                }
            }
        }
    }
}
