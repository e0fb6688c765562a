// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! A mutex whose locking can be permanently disabled.
//!
//! Good for structures that are mutable while being built and read-only
//! thereafter: once `seal` has been called, `lock` hands out bypass tokens
//! without touching the underlying mutex, so sealed readers pay nothing.
//!
//! The log uses this for segments -- a segment's lock serializes appends
//! while the segment is active and is sealed by the append that fills it,
//! after which every traversal of the segment is lock-free.

use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};

/// A mutex with a permanent lock-free end state.
pub struct SealableMutex {
    inner: Mutex<()>,
    sealed: AtomicBool,
}

/// The result of [`SealableMutex::lock`]: either a live guard or a bypass
/// token handed out after sealing.
pub struct Hold<'a> {
    owner: &'a SealableMutex,
    guard: Option<MutexGuard<'a, ()>>,
}

impl SealableMutex {
    /// Creates an unlocked, unsealed mutex.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(()),
            sealed: AtomicBool::new(false),
        }
    }

    /// Acquires the mutex, or returns a bypass token once sealed.
    pub fn lock(&self) -> Hold<'_> {
        if self.is_sealed() {
            return Hold {
                owner: self,
                guard: None,
            };
        }
        let guard = self.inner.lock();
        if self.is_sealed() {
            // Sealed while we were waiting; release and bypass.
            drop(guard);
            return Hold {
                owner: self,
                guard: None,
            };
        }
        Hold {
            owner: self,
            guard: Some(guard),
        }
    }

    /// Permanently disables locking from the unlocked state. Acquires and
    /// releases the underlying mutex once to quiesce any waiters already
    /// queued behind it. Idempotent.
    ///
    /// The current holder of a [`Hold`] must use [`Hold::seal`] instead;
    /// calling this while holding would deadlock.
    pub fn seal(&self) {
        if self.sealed.swap(true, Ordering::AcqRel) {
            return;
        }
        drop(self.inner.lock());
    }

    /// Whether locking has been disabled.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Returns a sealed mutex to its initial unlocked state. Intended only
    /// for pooling; returns `false` when the mutex was not sealed.
    pub fn reset(&self) -> bool {
        self.sealed
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for SealableMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Hold<'_> {
    /// Whether this hold bypassed a sealed mutex.
    #[must_use]
    pub fn is_bypass(&self) -> bool {
        self.guard.is_none()
    }

    /// Seals the mutex from the locked state: marks it sealed, then releases
    /// the guard. Waiters blocked on `lock` wake into bypass tokens.
    pub fn seal(mut self) {
        self.owner.sealed.store(true, Ordering::Release);
        drop(self.guard.take());
    }
}
