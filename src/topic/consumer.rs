// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! The consumer endpoint.
//!
//! A consumer owns a cursor and drives it from inside `recv`:
//!
//! - On a **hit**, the entry is returned, the cursor advances, and the
//!   backoff sequence restarts.
//! - On a **miss**, the call races {close, backoff tick, cursor wakeup},
//!   where the wakeup is poked by every append, then re-polls. The backoff
//!   tick matters because a re-poll may find the cursor clamped forward by
//!   retention rather than a new message under it.
//!
//! Pulling from within `recv` (instead of bridging through a buffered
//! worker channel) means a message leaves the log only when the caller
//! actually claims it, so an offer that retention overtakes is quietly
//! revoked by the clamp on the next poll. `recv` is cancellation-safe: the
//! hit path has no await point, so a timed-out or abandoned call never
//! loses an entry.
//!
//! Dropping an unclosed consumer publishes a late-close diagnostic and then
//! closes.

use std::sync::Arc;
use std::time::Duration;

use super::backoff::{BackoffGenerator, BackoffSequence, next_delay};
use super::cursor::Cursor;
use crate::diag;
use crate::error::Error;

/// A receiving endpoint for a [`Topic`](super::Topic), tracking its own
/// position independently of every other consumer.
pub struct Consumer<T> {
    cursor: Arc<Cursor<T>>,
    backoff: BackoffGenerator,
    sequence: BackoffSequence,
}

impl<T> Consumer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(cursor: Arc<Cursor<T>>, backoff: BackoffGenerator) -> Self {
        let sequence = backoff.sequence();
        Self {
            cursor,
            backoff,
            sequence,
        }
    }

    /// Receives the next message, waiting for one to be appended if
    /// necessary. Returns `None` once the consumer is closed.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            if self.cursor.closer.is_closed() {
                return None;
            }
            if let Some(msg) = self.cursor.head() {
                self.cursor.advance();
                self.sequence = self.backoff.sequence();
                return Some(msg);
            }
            tokio::select! {
                _ = self.cursor.closer.closed() => return None,
                _ = tokio::time::sleep(next_delay(&mut self.sequence)) => {}
                _ = self.cursor.ready.wait() => {}
            }
        }
    }

    /// Waits up to `timeout` for a message. `Ok(None)` means the wait timed
    /// out with the consumer still open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReceiverClosed`] once the consumer is closed.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<T>, Error> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(Some(msg)) => Ok(Some(msg)),
            Ok(None) => Err(Error::ReceiverClosed),
            Err(_) => Ok(None),
        }
    }

    /// Closes the consumer, deregistering its cursor so retention no longer
    /// accounts for it. Subsequent calls are no-ops.
    pub fn close(&self) {
        let _ = self.cursor.closer.close();
    }

    /// Whether the consumer has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cursor.closer.is_closed()
    }

    /// Completes once the consumer has been closed.
    pub async fn closed(&self) {
        self.cursor.closer.closed().await;
    }
}

impl<T> Drop for Consumer<T> {
    fn drop(&mut self) {
        if !self.cursor.closer.is_closed() {
            tracing::debug!(consumer_id = self.cursor.id, "consumer not closed");
            diag::publish(Error::ConsumerNotClosed {
                id: self.cursor.id,
            });
            let _ = self.cursor.closer.close();
        }
    }
}
