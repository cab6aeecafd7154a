//! AVRCP controller helpers: transaction labels, operation ids, and
//! metadata handling.
//!
//! AVCTP carries a 4-bit transaction label per command; the controller must
//! not reuse a label while a command with that label is outstanding, so
//! labels are handed out round-robin.

use heapless::String;

/// Longest title forwarded to the UI, in bytes.
pub const TITLE_MAX_BYTES: usize = 127;

/// Title buffer: [`TITLE_MAX_BYTES`] plus one spare byte.
pub type Title = String<128>;

/// Round-robin allocator for 4-bit AVCTP transaction labels.
#[derive(Debug, Default)]
pub struct TransactionLabels {
    next: u8,
}

impl TransactionLabels {
    /// Start at label 0.
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Take the next label (0..=15, wrapping).
    pub fn next_label(&mut self) -> u8 {
        let label = self.next;
        self.next = label.wrapping_add(1) & 0x0F;
        label
    }
}

/// AV/C panel subunit operation ids used with passthrough commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PassthroughKey {
    /// Skip to next track.
    Forward = 0x4B,
}

impl PassthroughKey {
    /// Raw operation id.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Media attributes the controller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MediaAttribute {
    /// Track title.
    Title = 0x01,
}

impl MediaAttribute {
    /// Attribute id as carried in the metadata response.
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Request bit for this attribute.
    #[allow(clippy::arithmetic_side_effects)] // Safety: attribute ids start at 1 and stay below 8
    pub const fn mask(self) -> u8 {
        1 << (self as u8 - 1)
    }
}

/// Notification event ids the controller registers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Notification {
    /// Peer changed track.
    TrackChanged = 0x02,
}

impl Notification {
    /// Raw event id.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Copy a metadata title into a bounded string.
///
/// Keeps at most [`TITLE_MAX_BYTES`] bytes, cut back to a character
/// boundary; stops at the first invalid UTF-8 sequence or NUL.
pub fn title_text(raw: &[u8]) -> Title {
    let raw = raw.split(|&b| b == 0).next().unwrap_or_default();
    let valid = match core::str::from_utf8(raw) {
        Ok(s) => s,
        Err(e) => core::str::from_utf8(raw.get(..e.valid_up_to()).unwrap_or_default())
            .unwrap_or_default(),
    };
    let mut end = valid.len().min(TITLE_MAX_BYTES);
    while !valid.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    let mut title = Title::new();
    // `end` <= 127 < capacity, so the push cannot fail.
    let _ = title.push_str(valid.get(..end).unwrap_or_default());
    title
}
