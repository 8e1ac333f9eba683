//! Edit counters for offline data.
//!
//! Skeletons and mask specs are never edited while poses are evaluated.
//! Each owns a [`ChangeTracker`]; caches built from them remember the
//! counter they saw and rebuild once it moves.

use std::ops::{Deref, DerefMut};

/// Monotonic edit counter. Starts at 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeTracker {
    version: u64,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one edit.
    pub fn changed(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// `&mut` access to tracked data; records one edit when dropped, however
/// many writes went through it.
pub struct MutGuard<'a, T> {
    value: &'a mut T,
    tracker: &'a mut ChangeTracker,
}

impl<'a, T> MutGuard<'a, T> {
    pub fn new(value: &'a mut T, tracker: &'a mut ChangeTracker) -> Self {
        Self { value, tracker }
    }
}

impl<T> Deref for MutGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value
    }
}

impl<T> DerefMut for MutGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value
    }
}

impl<T> Drop for MutGuard<'_, T> {
    fn drop(&mut self) {
        self.tracker.changed();
    }
}
