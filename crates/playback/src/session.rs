//! Start/stop handshake between the facade and a long-lived worker task.
//!
//! Every fetcher and the decoder run the same shape of task: park until a
//! session is requested, run it while an `active` flag stays set, then
//! report completion. Stopping clears the flag and waits for that report,
//! so once [`SessionControl::stop`] returns the worker touches neither the
//! stream buffer nor the output device.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Shared handle for one worker.
pub struct SessionControl<R> {
    request: Signal<CriticalSectionRawMutex, R>,
    active: AtomicBool,
    running: AtomicBool,
    done: Signal<CriticalSectionRawMutex, ()>,
}

impl<R> SessionControl<R> {
    /// Create an idle control block.
    pub const fn new() -> Self {
        Self {
            request: Signal::new(),
            active: AtomicBool::new(false),
            running: AtomicBool::new(false),
            done: Signal::new(),
        }
    }

    /// Hand `request` to the worker and mark the session active.
    pub fn start(&self, request: R) {
        self.done.reset();
        self.running.store(true, Ordering::Release);
        self.active.store(true, Ordering::Release);
        self.request.signal(request);
    }

    /// Ask the running session to end and wait until it has.
    ///
    /// Returns immediately when no session was started.
    pub async fn stop(&self) {
        if !self.running.load(Ordering::Acquire) {
            return;
        }
        self.active.store(false, Ordering::Release);
        self.done.wait().await;
        self.running.store(false, Ordering::Release);
    }

    /// `true` between `start` and the end of `stop`.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// `true` once the worker ended the current session on its own.
    pub fn is_finished(&self) -> bool {
        self.done.signaled()
    }

    fn token(&self) -> CancelToken<'_> {
        CancelToken {
            active: &self.active,
        }
    }
}

impl<R> Default for SessionControl<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of the active flag, handed to the worker for one session.
#[derive(Clone, Copy)]
pub struct CancelToken<'a> {
    active: &'a AtomicBool,
}

impl CancelToken<'_> {
    /// `false` once a stop was requested.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// A task body driven by [`run_worker`].
pub trait Worker {
    /// Parameters of one session.
    type Request;

    /// Run one session to completion, returning early once `token` goes
    /// inactive.
    async fn run_session(&mut self, request: Self::Request, token: CancelToken<'_>);
}

/// Serve sessions for `worker` forever.
pub async fn run_worker<W: Worker>(control: &SessionControl<W::Request>, worker: &mut W) -> ! {
    loop {
        let request = control.request.wait().await;
        worker.run_session(request, control.token()).await;
        control.done.signal(());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use embassy_futures::select::{select, Either};
    use embassy_time::{Duration, Timer};

    struct Counter {
        sessions: u32,
        last: u32,
    }

    impl Worker for Counter {
        type Request = u32;

        async fn run_session(&mut self, request: u32, token: CancelToken<'_>) {
            self.sessions += 1;
            self.last = request;
            while token.is_active() {
                Timer::after(Duration::from_millis(1)).await;
            }
        }
    }

    #[tokio::test]
    async fn stop_without_start_returns_immediately() {
        let control: SessionControl<u32> = SessionControl::new();
        control.stop().await;
        assert!(!control.is_running());
    }

    #[tokio::test]
    async fn stop_waits_for_worker_to_finish() {
        let control: SessionControl<u32> = SessionControl::new();
        let mut worker = Counter {
            sessions: 0,
            last: 0,
        };
        let body = async {
            control.start(7);
            Timer::after(Duration::from_millis(5)).await;
            assert!(control.is_running());
            assert!(!control.is_finished());
            control.stop().await;
            assert!(!control.is_running());
            control.start(9);
            Timer::after(Duration::from_millis(5)).await;
            control.stop().await;
        };
        match select(run_worker(&control, &mut worker), body).await {
            Either::First(never) => match never {},
            Either::Second(()) => {}
        }
        assert_eq!(worker.sessions, 2);
        assert_eq!(worker.last, 9);
    }
}
