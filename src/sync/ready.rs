// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Edge-triggered, single-slot wake primitive.
//!
//! `ReadyWait` buffers at most one pending wake. Any number of concurrent
//! `notify` calls coalesce into a single outstanding signal, and a waiter
//! that has just been woken must re-check its condition -- classic
//! edge-triggered semantics. The value of this over a condvar is that
//! `wait()` is a plain future and composes with `tokio::select!`.
//!
//! Built on `tokio::sync::Notify`, whose `notify_one` stores exactly one
//! permit when no waiter is registered -- precisely the single-slot
//! coalescing contract.

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

struct ReadyInner {
    notify: Notify,
    closed: AtomicBool,
}

/// A single-slot, edge-triggered wake signal.
///
/// Cheaply cloneable; all clones share the same slot.
#[derive(Clone)]
pub struct ReadyWait {
    inner: Arc<ReadyInner>,
}

impl ReadyWait {
    /// Creates a new signal with no pending wake.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ReadyInner {
                notify: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Deposits a wake if none is pending; otherwise drops the signal.
    /// Never blocks.
    pub fn notify(&self) {
        if !self.is_closed() {
            self.inner.notify.notify_one();
        }
    }

    /// Waits for a pending or future wake. Consumes the pending wake if one
    /// is buffered. Returns immediately once the signal has been closed.
    pub async fn wait(&self) {
        if self.is_closed() {
            return;
        }
        let mut notified = pin!(self.inner.notify.notified());
        if notified.as_mut().enable() {
            // A buffered wake was consumed during registration.
            return;
        }
        if self.is_closed() {
            return;
        }
        notified.await;
    }

    /// Closes the signal, releasing all current and future waiters.
    /// Returns `false` if the signal was already closed.
    pub fn close(&self) -> bool {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner.notify.notify_waiters();
        true
    }

    /// Whether the signal has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl Default for ReadyWait {
    fn default() -> Self {
        Self::new()
    }
}
