//! The process-wide split-brain flag (spec.md §4.I, §5, §9).
//!
//! A plain `AtomicBool` is the simplest correct representation: the loop
//! is single-threaded, so no lock is needed and no ordering stronger than
//! `Relaxed` is required between the detector (the sole writer) and the
//! garbage collector (the sole reader) -- they never run concurrently,
//! only sequentially within or across ticks.
//!
//! In a threaded reimplementation this would need to become a real
//! synchronization point; see the note in spec.md §9.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct SplitBrainFlag {
    set: AtomicBool,
}

impl SplitBrainFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.set.store(true, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.set.store(false, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Relaxed)
    }
}
