// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Idempotent close with a broadcast completion signal.
//!
//! A `Closer` is closed exactly once; every clone observes the transition.
//! Unlike [`ReadyWait`](super::ReadyWait) the signal is level-triggered:
//! once closed, `closed().await` completes immediately for all current and
//! future callers, which makes it the cancellation arm of every
//! `tokio::select!` in the crate.
//!
//! An optional one-shot callback runs inside the winning `close` call, which
//! is how cursors deregister themselves from their topic.

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

type OnClose = Box<dyn FnOnce() + Send>;

struct CloserInner {
    closed: AtomicBool,
    notify: Notify,
    on_close: Mutex<Option<OnClose>>,
}

/// An idempotent close latch with broadcast completion.
///
/// Cheaply cloneable; all clones share the same latch.
#[derive(Clone)]
pub struct Closer {
    inner: Arc<CloserInner>,
}

impl Closer {
    /// Creates an open latch.
    #[must_use]
    pub fn new() -> Self {
        Self::make(None)
    }

    /// Creates an open latch whose callback runs inside the first `close`.
    pub fn with_callback(f: impl FnOnce() + Send + 'static) -> Self {
        Self::make(Some(Box::new(f)))
    }

    fn make(on_close: Option<OnClose>) -> Self {
        Self {
            inner: Arc::new(CloserInner {
                closed: AtomicBool::new(false),
                notify: Notify::new(),
                on_close: Mutex::new(on_close),
            }),
        }
    }

    /// Closes the latch. Only the first call runs the callback and returns
    /// `true`; every subsequent call is a no-op returning `false`.
    pub fn close(&self) -> bool {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(f) = self.inner.on_close.lock().take() {
            f();
        }
        self.inner.notify.notify_waiters();
        true
    }

    /// Whether the latch has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Completes once the latch is closed. Completes immediately if it
    /// already is.
    pub async fn closed(&self) {
        if self.is_closed() {
            return;
        }
        let mut notified = pin!(self.inner.notify.notified());
        notified.as_mut().enable();
        if self.is_closed() {
            return;
        }
        notified.await;
    }
}

impl Default for Closer {
    fn default() -> Self {
        Self::new()
    }
}
