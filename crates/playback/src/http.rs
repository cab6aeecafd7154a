//! Minimal HTTP/1.0 client side for internet radio.
//!
//! Only what a stream request needs: one `GET`, a status line that may be
//! `HTTP/1.x` or Shoutcast's `ICY 200 OK`, a handful of headers, and the
//! redirect target. The body is the audio stream itself and is read by the
//! radio fetcher directly from the connection.

use core::fmt::Write as _;

use embedded_io_async::{Read, Write};
use heapless::String;
use platform::config::USER_AGENT;

/// Response header bytes accepted before giving up.
pub const HEADER_CAPACITY: usize = 2048;

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 3;

const DEFAULT_PORT: u16 = 80;

/// Where a stream lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLocator {
    /// Host name or address.
    pub host: String<64>,
    /// TCP port.
    pub port: u16,
    /// Request path, always starting with `/`.
    pub path: String<192>,
}

/// Ways the HTTP exchange can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HttpError {
    /// Host, port or path could not be parsed or does not fit.
    InvalidUrl,
    /// The connection failed while sending or receiving headers.
    Io,
    /// Headers did not fit in [`HEADER_CAPACITY`] bytes.
    HeaderTooLarge,
    /// Status line or headers are not HTTP.
    Malformed,
    /// The server answered with a non-success status.
    BadStatus(u16),
    /// More than [`MAX_REDIRECTS`] redirects.
    TooManyRedirects,
}

impl HttpError {
    /// Short description for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid stream url",
            Self::Io => "connection error",
            Self::HeaderTooLarge => "response header too large",
            Self::Malformed => "malformed response",
            Self::BadStatus(_) => "unexpected http status",
            Self::TooManyRedirects => "too many redirects",
        }
    }
}

impl core::fmt::Display for HttpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BadStatus(code) => write!(f, "unexpected http status {code}"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl StreamLocator {
    /// Build a locator from its parts. An empty `port` means 80; a path
    /// without a leading `/` gets one.
    pub fn new(host: &str, port: &str, path: &str) -> Result<Self, HttpError> {
        let port = if port.is_empty() {
            DEFAULT_PORT
        } else {
            port.parse().map_err(|_| HttpError::InvalidUrl)?
        };
        let mut locator = Self {
            host: String::new(),
            port,
            path: String::new(),
        };
        if host.is_empty() {
            return Err(HttpError::InvalidUrl);
        }
        locator
            .host
            .push_str(host)
            .map_err(|_| HttpError::InvalidUrl)?;
        if !path.starts_with('/') {
            locator
                .path
                .push('/')
                .map_err(|_| HttpError::InvalidUrl)?;
        }
        locator
            .path
            .push_str(path)
            .map_err(|_| HttpError::InvalidUrl)?;
        Ok(locator)
    }

    /// Parse `http://host[:port][/path]`. Other schemes are rejected.
    pub fn parse_url(url: &str) -> Result<Self, HttpError> {
        let rest = strip_prefix_ignore_case(url.trim(), "http://").ok_or(HttpError::InvalidUrl)?;
        let (authority, path) = match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, port),
            None => (authority, ""),
        };
        Self::new(host, port, path)
    }

    /// Resolve a `Location` value against this locator.
    ///
    /// Absolute `http://` URLs replace the locator; `/path` keeps host and
    /// port; a bare relative path replaces the last path segment.
    pub fn resolve(&self, location: &str) -> Result<Self, HttpError> {
        let location = location.trim();
        if strip_prefix_ignore_case(location, "http://").is_some() {
            return Self::parse_url(location);
        }
        if location.is_empty() || location.contains("://") || location.starts_with("//") {
            return Err(HttpError::InvalidUrl);
        }
        let mut next = self.clone();
        next.path.clear();
        if !location.starts_with('/') {
            let dir = self
                .path
                .rfind('/')
                .and_then(|i| self.path.get(..=i))
                .unwrap_or("/");
            next.path.push_str(dir).map_err(|_| HttpError::InvalidUrl)?;
        }
        next.path
            .push_str(location)
            .map_err(|_| HttpError::InvalidUrl)?;
        Ok(next)
    }

    /// `host` or `host:port` as sent in the `Host` header.
    fn write_host<W: core::fmt::Write>(&self, out: &mut W) -> core::fmt::Result {
        if self.port == DEFAULT_PORT {
            write!(out, "{}", self.host)
        } else {
            write!(out, "{}:{}", self.host, self.port)
        }
    }
}

/// Send the `GET` request for `locator`.
pub async fn write_request<C: Write>(
    conn: &mut C,
    locator: &StreamLocator,
    icy_metadata: bool,
) -> Result<(), HttpError> {
    let mut request: String<512> = String::new();
    format_request(&mut request, locator, icy_metadata).map_err(|_| HttpError::InvalidUrl)?;
    conn.write_all(request.as_bytes())
        .await
        .map_err(|_| HttpError::Io)?;
    conn.flush().await.map_err(|_| HttpError::Io)
}

fn format_request(
    out: &mut String<512>,
    locator: &StreamLocator,
    icy_metadata: bool,
) -> core::fmt::Result {
    write!(out, "GET {} HTTP/1.0\r\nHost: ", locator.path)?;
    locator.write_host(out)?;
    write!(out, "\r\nUser-Agent: {USER_AGENT}\r\nAccept: */*\r\n")?;
    if icy_metadata {
        out.write_str("Icy-MetaData: 1\r\n")?;
    }
    out.write_str("Connection: close\r\n\r\n")
}

/// What the response header told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// Status code.
    pub status: u16,
    /// `icy-metaint`, 0 when absent.
    pub meta_interval: usize,
    /// Redirect target for 3xx responses.
    pub location: Option<StreamLocator>,
    /// Bytes occupied by the status line and headers, terminator included.
    pub header_len: usize,
}

impl ResponseHead {
    /// `true` for 301/302/303/307/308.
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }
}

/// Parse a response header from the front of `buf`.
///
/// Returns `Ok(None)` while the terminating blank line has not arrived yet.
/// Only the status line and the `icy-metaint` and `Location` values are
/// decoded; other headers may carry any bytes. A relative `Location` is
/// resolved against `base`.
pub fn parse_response_head(
    buf: &[u8],
    base: &StreamLocator,
) -> Result<Option<ResponseHead>, HttpError> {
    let Some(header_len) = header_end(buf) else {
        return Ok(None);
    };
    let head = buf.get(..header_len).ok_or(HttpError::Malformed)?;
    let mut lines = head.split(|&b| b == b'\n').map(trim_ascii);

    let status_line = lines.next().ok_or(HttpError::Malformed)?;
    let status_line = core::str::from_utf8(status_line).map_err(|_| HttpError::Malformed)?;
    let mut parts = status_line.split_ascii_whitespace();
    let protocol = parts.next().ok_or(HttpError::Malformed)?;
    if !(protocol.starts_with("HTTP/1.") || protocol == "ICY") {
        return Err(HttpError::Malformed);
    }
    let status: u16 = parts
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or(HttpError::Malformed)?;

    let mut response = ResponseHead {
        status,
        meta_interval: 0,
        location: None,
        header_len,
    };
    for line in lines {
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            continue;
        };
        let (name, value) = line.split_at(colon);
        let name = trim_ascii(name);
        let value = trim_ascii(value.get(1..).unwrap_or_default());
        if name.eq_ignore_ascii_case(b"icy-metaint") {
            let interval = core::str::from_utf8(value).ok().and_then(|v| v.parse().ok());
            response.meta_interval = interval.unwrap_or_else(|| {
                warn!("http: unusable icy-metaint, metadata disabled");
                0
            });
        } else if name.eq_ignore_ascii_case(b"location") && response.is_redirect() {
            if let Ok(value) = core::str::from_utf8(value) {
                response.location = Some(base.resolve(value)?);
            }
        }
    }
    Ok(Some(response))
}

/// Read from `conn` until a complete response header is in `buf`.
///
/// Returns the parsed head and the number of bytes in `buf`; bytes after
/// `head.header_len` are the start of the body.
pub async fn read_response_head<C: Read>(
    conn: &mut C,
    buf: &mut [u8; HEADER_CAPACITY],
    base: &StreamLocator,
) -> Result<(ResponseHead, usize), HttpError> {
    let mut filled = 0usize;
    loop {
        let free = buf.get_mut(filled..).ok_or(HttpError::HeaderTooLarge)?;
        if free.is_empty() {
            return Err(HttpError::HeaderTooLarge);
        }
        let n = conn.read(free).await.map_err(|_| HttpError::Io)?;
        if n == 0 {
            return Err(HttpError::Malformed);
        }
        filled = filled.saturating_add(n);
        let received = buf.get(..filled).ok_or(HttpError::HeaderTooLarge)?;
        if let Some(head) = parse_response_head(received, base)? {
            return Ok((head, filled));
        }
    }
}

fn header_end(buf: &[u8]) -> Option<usize> {
    let crlf = buf
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| i.saturating_add(4));
    let lf = buf
        .windows(2)
        .position(|w| w == b"\n\n")
        .map(|i| i.saturating_add(2));
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if !first.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    while let [rest @ .., last] = bytes {
        if !last.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    bytes
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use platform::mocks::MockConnector;
    use platform::TcpConnect;

    fn base() -> StreamLocator {
        StreamLocator::parse_url("http://radio.example:8000/streams/live").unwrap()
    }

    #[test]
    fn locator_defaults_port_and_slash() {
        let loc = StreamLocator::new("radio.example", "", "live").unwrap();
        assert_eq!(loc.port, 80);
        assert_eq!(loc.path.as_str(), "/live");
        assert_eq!(StreamLocator::new("h", "abc", "/"), Err(HttpError::InvalidUrl));
        assert_eq!(StreamLocator::new("", "80", "/"), Err(HttpError::InvalidUrl));
    }

    #[test]
    fn parses_urls() {
        let loc = StreamLocator::parse_url("http://ice.example:8000/stream.mp3").unwrap();
        assert_eq!(loc.host.as_str(), "ice.example");
        assert_eq!(loc.port, 8000);
        assert_eq!(loc.path.as_str(), "/stream.mp3");

        let bare = StreamLocator::parse_url("HTTP://ice.example").unwrap();
        assert_eq!(bare.port, 80);
        assert_eq!(bare.path.as_str(), "/");

        assert_eq!(
            StreamLocator::parse_url("https://ice.example/"),
            Err(HttpError::InvalidUrl)
        );
    }

    #[test]
    fn parses_icy_status_and_metaint() {
        let raw = b"ICY 200 OK\r\nicy-name: Test\r\nICY-METAINT: 16000\r\n\r\nAUDIO";
        let head = parse_response_head(raw, &base()).unwrap().unwrap();
        assert_eq!(head.status, 200);
        assert_eq!(head.meta_interval, 16000);
        assert_eq!(&raw[head.header_len..], b"AUDIO");
    }

    #[test]
    fn incomplete_head_is_not_an_error() {
        assert_eq!(parse_response_head(b"HTTP/1.0 200 OK\r\nicy-met", &base()), Ok(None));
    }

    #[test]
    fn bare_lf_terminator_is_accepted() {
        let head = parse_response_head(b"HTTP/1.1 200 OK\nicy-metaint: 8\n\nxx", &base())
            .unwrap()
            .unwrap();
        assert_eq!(head.meta_interval, 8);
        assert_eq!(head.header_len, 32);
    }

    #[test]
    fn redirect_carries_location() {
        let raw = b"HTTP/1.1 302 Found\r\nLocation: http://edge.example:8080/a\r\n\r\n";
        let head = parse_response_head(raw, &base()).unwrap().unwrap();
        assert!(head.is_redirect());
        let loc = head.location.unwrap();
        assert_eq!(loc.host.as_str(), "edge.example");
        assert_eq!(loc.port, 8080);
    }

    #[test]
    fn latin1_header_values_are_ignored() {
        let raw = b"ICY 200 OK\r\nicy-name: Radio Caf\xE9\r\nicy-metaint: 16000\r\n\r\n";
        let head = parse_response_head(raw, &base()).unwrap().unwrap();
        assert_eq!(head.status, 200);
        assert_eq!(head.meta_interval, 16000);
    }

    #[test]
    fn garbled_metaint_disables_metadata() {
        for raw in [
            &b"ICY 200 OK\r\nicy-metaint: lots\r\n\r\n"[..],
            &b"ICY 200 OK\r\nicy-metaint: \xFF\r\n\r\n"[..],
            &b"ICY 200 OK\r\nicy-metaint:\r\n\r\n"[..],
        ] {
            let head = parse_response_head(raw, &base()).unwrap().unwrap();
            assert_eq!(head.meta_interval, 0);
        }
    }

    #[test]
    fn relative_location_keeps_host_and_port() {
        let raw = b"HTTP/1.1 301 Moved\r\nLocation: /live2\r\n\r\n";
        let loc = parse_response_head(raw, &base()).unwrap().unwrap().location.unwrap();
        assert_eq!(loc.host.as_str(), "radio.example");
        assert_eq!(loc.port, 8000);
        assert_eq!(loc.path.as_str(), "/live2");

        let sibling = base().resolve("backup.mp3").unwrap();
        assert_eq!(sibling.path.as_str(), "/streams/backup.mp3");
        assert_eq!(base().resolve("https://tls.example/"), Err(HttpError::InvalidUrl));
    }

    #[test]
    fn non_http_is_malformed() {
        assert_eq!(
            parse_response_head(b"SSH-2.0-OpenSSH\r\n\r\n", &base()),
            Err(HttpError::Malformed)
        );
    }

    #[tokio::test]
    async fn request_has_icy_header_and_host_port() {
        let mut net = MockConnector::new().respond(&b""[..]);
        let loc = StreamLocator::new("radio.example", "8000", "/live").unwrap();
        {
            let mut conn = net.connect("radio.example", 8000).await.unwrap();
            write_request(&mut conn, &loc, true).await.unwrap();
        }
        let request = &net.requests[0];
        assert!(request.starts_with("GET /live HTTP/1.0\r\n"));
        assert!(request.contains("Host: radio.example:8000\r\n"));
        assert!(request.contains("Icy-MetaData: 1\r\n"));
        assert!(request.contains(USER_AGENT));
        assert!(request.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn oversized_head_is_rejected() {
        let mut raw = b"HTTP/1.0 200 OK\r\n".to_vec();
        raw.extend(std::iter::repeat(b'x').take(HEADER_CAPACITY));
        let mut net = MockConnector::new().respond(raw);
        let mut conn = net.connect("h", 80).await.unwrap();
        let mut buf = [0u8; HEADER_CAPACITY];
        assert_eq!(
            read_response_head(&mut conn, &mut buf, &base()).await.unwrap_err(),
            HttpError::HeaderTooLarge
        );
    }
}
