//! Track-title notifications towards the UI.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;

/// Title as shown on screen (at most 127 bytes of UTF-8).
pub type TrackTitle = heapless::String<128>;

/// Receives the current track title; artist and title are separated by `\n`
/// when the source provides both.
///
/// Called from a streaming task, so implementations must not block.
pub trait TrackListener: Sync {
    /// A new title is playing.
    fn on_title(&self, title: &str);
}

/// Ready-made listener: keeps the latest title and wakes one waiter.
pub struct TitleSignal {
    title: Mutex<CriticalSectionRawMutex, RefCell<TrackTitle>>,
    changed: Signal<CriticalSectionRawMutex, ()>,
}

impl TitleSignal {
    /// Create an empty title slot.
    pub const fn new() -> Self {
        Self {
            title: Mutex::new(RefCell::new(TrackTitle::new())),
            changed: Signal::new(),
        }
    }

    /// Wait for the next title change and return it.
    pub async fn wait_changed(&self) -> TrackTitle {
        self.changed.wait().await;
        self.current()
    }

    /// Latest title (empty before the first one arrives).
    pub fn current(&self) -> TrackTitle {
        self.title.lock(|t| t.borrow().clone())
    }
}

impl Default for TitleSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackListener for TitleSignal {
    fn on_title(&self, title: &str) {
        self.title.lock(|slot| {
            let mut slot = slot.borrow_mut();
            slot.clear();
            let mut end = title.len().min(slot.capacity().saturating_sub(1));
            while !title.is_char_boundary(end) {
                end = end.saturating_sub(1);
            }
            // `end` is below capacity, so this cannot overflow.
            let _ = slot.push_str(title.get(..end).unwrap_or_default());
        });
        self.changed.signal(());
    }
}
