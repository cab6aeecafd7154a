//! User volume state.
//!
//! The renderer works in attenuation steps (0 = loudest, 16 = quietest, see
//! [`VolumeStep`]); the UI shows the inverse as a level from 0 to
//! [`VolumeStep::max_level`]. This module only keeps the current step. The
//! facade applies it to the renderer.

use core::sync::atomic::{AtomicU8, Ordering};

use platform::VolumeStep;

/// Current volume step, shared between the UI task and the facade.
pub struct VolumeControl {
    step: AtomicU8,
}

impl VolumeControl {
    /// Start at `initial`.
    pub const fn new(initial: VolumeStep) -> Self {
        Self {
            step: AtomicU8::new(initial.get()),
        }
    }

    /// Current step.
    pub fn step(&self) -> VolumeStep {
        VolumeStep::new(self.step.load(Ordering::Relaxed))
    }

    /// One step louder, saturating; returns the new step.
    pub fn louder(&self) -> VolumeStep {
        self.update(VolumeStep::louder)
    }

    /// One step quieter, saturating; returns the new step.
    pub fn quieter(&self) -> VolumeStep {
        self.update(VolumeStep::quieter)
    }

    /// Level shown to the user (higher is louder).
    pub fn level(&self) -> u8 {
        self.step().level()
    }

    /// Highest level [`level`](Self::level) can return.
    pub fn max_level(&self) -> u8 {
        VolumeStep::max_level()
    }

    fn update(&self, change: impl Fn(VolumeStep) -> VolumeStep) -> VolumeStep {
        let next = change(self.step());
        self.step.store(next.get(), Ordering::Relaxed);
        next
    }
}

impl Default for VolumeControl {
    fn default() -> Self {
        Self::new(VolumeStep::DEFAULT)
    }
}
