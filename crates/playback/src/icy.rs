//! ICY (Shoutcast/Icecast) in-band metadata de-interleaving.
//!
//! With `Icy-MetaData: 1` the server inserts a metadata block after every
//! `icy-metaint` bytes of audio. A block is one length byte `k` followed by
//! `16 * k` bytes of text such as `StreamTitle='Artist - Song';`, padded
//! with NULs. `k == 0` means "nothing new this interval".
//!
//! [`IcyParser`] splits a chunked byte stream into audio runs and completed
//! metadata blocks. State carries across chunk boundaries, so the network
//! read size does not matter.

use bluetooth::avrcp::TITLE_MAX_BYTES;
use heapless::Vec;

use crate::track::TrackTitle;

/// Largest possible metadata payload (`255 * 16`).
pub const MAX_METADATA: usize = 255 * 16;

const TITLE_KEY: &[u8] = b"StreamTitle='";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Audio,
    MetaLength,
    MetaPayload { remaining: usize },
}

/// One piece of the de-interleaved stream.
#[derive(Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Audio bytes to forward to the decoder.
    Audio(&'a [u8]),
    /// A metadata block just completed; read it with [`IcyParser::metadata`]
    /// or [`IcyParser::title`].
    Metadata,
}

/// Per-session ICY state machine.
pub struct IcyParser {
    interval: usize,
    until_meta: usize,
    state: State,
    meta: Vec<u8, MAX_METADATA>,
}

impl IcyParser {
    /// Parser for a stream with `icy-metaint: interval`.
    ///
    /// An interval of zero disables metadata handling: every byte is audio.
    pub const fn new(interval: usize) -> Self {
        Self {
            interval,
            until_meta: interval,
            state: State::Audio,
            meta: Vec::new(),
        }
    }

    /// Audio bytes still expected before the next metadata block.
    pub const fn until_metadata(&self) -> usize {
        self.until_meta
    }

    /// Take the next segment off the front of `input`.
    ///
    /// Returns `None` once `input` is exhausted; bytes belonging to a
    /// partially received length byte or payload are absorbed into the
    /// parser state.
    #[allow(clippy::arithmetic_side_effects)] // Safety: every subtraction is bounded by a preceding min()
    pub fn next<'c>(&mut self, input: &mut &'c [u8]) -> Option<Segment<'c>> {
        loop {
            if input.is_empty() {
                return None;
            }
            if self.interval == 0 {
                let audio = core::mem::take(input);
                return Some(Segment::Audio(audio));
            }
            match self.state {
                State::Audio => {
                    let n = self.until_meta.min(input.len());
                    let (audio, rest) = input.split_at(n);
                    *input = rest;
                    self.until_meta -= n;
                    if self.until_meta == 0 {
                        self.state = State::MetaLength;
                    }
                    if n > 0 {
                        return Some(Segment::Audio(audio));
                    }
                }
                State::MetaLength => {
                    let (len, rest) = input.split_first()?;
                    *input = rest;
                    self.meta.clear();
                    let payload = usize::from(*len) * 16;
                    if payload == 0 {
                        self.restart_interval();
                    } else {
                        self.state = State::MetaPayload { remaining: payload };
                    }
                }
                State::MetaPayload { remaining } => {
                    let n = remaining.min(input.len());
                    let (part, rest) = input.split_at(n);
                    *input = rest;
                    // Capacity is MAX_METADATA and payloads never exceed it.
                    let _ = self.meta.extend_from_slice(part);
                    if remaining == n {
                        self.restart_interval();
                        return Some(Segment::Metadata);
                    }
                    self.state = State::MetaPayload {
                        remaining: remaining - n,
                    };
                }
            }
        }
    }

    /// Raw payload of the last completed metadata block.
    pub fn metadata(&self) -> &[u8] {
        &self.meta
    }

    /// `StreamTitle` of the last completed metadata block, if any.
    pub fn title(&self) -> Option<TrackTitle> {
        parse_stream_title(&self.meta)
    }

    fn restart_interval(&mut self) {
        self.until_meta = self.interval;
        self.state = State::Audio;
    }
}

/// Extract the display title from a metadata payload.
///
/// Finds `StreamTitle='…';`, turns the first hyphen into a line break
/// (trimming the spaces around it) and keeps at most 127 bytes. Returns
/// `None` when there is no title or it is blank.
pub fn parse_stream_title(meta: &[u8]) -> Option<TrackTitle> {
    let end = meta.iter().position(|&b| b == 0).unwrap_or(meta.len());
    let meta = meta.get(..end)?;
    let start = find(meta, TITLE_KEY)?.checked_add(TITLE_KEY.len())?;
    let value = meta.get(start..)?;
    let value_end = find(value, b"';")
        .or_else(|| value.iter().rposition(|&b| b == b'\''))
        .unwrap_or(value.len());
    let value = value.get(..value_end)?;

    let mut title = TrackTitle::new();
    let mut split = false;
    let text = Text::new(value);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' && !split {
            split = true;
            trim_end_spaces(&mut title);
            while chars.peek() == Some(&' ') {
                chars.next();
            }
            if !push(&mut title, '\n') {
                break;
            }
            continue;
        }
        if !push(&mut title, c) {
            break;
        }
    }

    if title.trim().is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Append `c` unless the title would grow past [`TITLE_MAX_BYTES`].
fn push(title: &mut TrackTitle, c: char) -> bool {
    if title.len().saturating_add(c.len_utf8()) > TITLE_MAX_BYTES {
        return false;
    }
    title.push(c).is_ok()
}

fn trim_end_spaces(title: &mut TrackTitle) {
    while title.ends_with(' ') {
        title.pop();
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Title bytes as characters: UTF-8 when valid, Latin-1 otherwise.
enum Text<'a> {
    Utf8(&'a str),
    Latin1(&'a [u8]),
}

impl<'a> Text<'a> {
    fn new(raw: &'a [u8]) -> Self {
        match core::str::from_utf8(raw) {
            Ok(s) => Self::Utf8(s),
            Err(_) => Self::Latin1(raw),
        }
    }

    fn chars(&self) -> TextChars<'a> {
        match *self {
            Self::Utf8(s) => TextChars::Utf8(s.chars()),
            Self::Latin1(raw) => TextChars::Latin1(raw.iter()),
        }
    }
}

enum TextChars<'a> {
    Utf8(core::str::Chars<'a>),
    Latin1(core::slice::Iter<'a, u8>),
}

impl Iterator for TextChars<'_> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        match self {
            Self::Utf8(chars) => chars.next(),
            Self::Latin1(bytes) => bytes.next().map(|&b| char::from(b)),
        }
    }
}
