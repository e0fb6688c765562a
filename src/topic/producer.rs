// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! The producer endpoint.
//!
//! A producer bridges an unbounded channel to the topic's log through a
//! dedicated worker task, which is what gives the topic its per-producer
//! FIFO guarantee -- every message a producer accepts is appended by the
//! same single-threaded worker, in order.
//!
//! Closing is idempotent and drains messages already accepted before the
//! worker exits. Dropping an unclosed producer publishes a late-close
//! diagnostic (and then closes), a hygiene signal for callers that leak
//! endpoints.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::topic::TopicCore;
use crate::diag;
use crate::error::Error;
use crate::sync::Closer;

/// A sending endpoint for a [`Topic`](super::Topic).
pub struct Producer<T> {
    id: u64,
    tx: mpsc::UnboundedSender<T>,
    closer: Closer,
}

impl<T> Producer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(core: &Arc<TopicCore<T>>) -> Self {
        let id = super::next_id();
        let closer = Closer::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();

        let worker_core = Arc::clone(core);
        let worker_closer = closer.clone();
        drop(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = worker_closer.closed() => {
                        // Drain whatever was accepted before the close.
                        rx.close();
                        while let Ok(msg) = rx.try_recv() {
                            worker_core.put(msg);
                        }
                        return;
                    }
                    msg = rx.recv() => match msg {
                        Some(msg) => worker_core.put(msg),
                        None => return,
                    },
                }
            }
        }));

        Self { id, tx, closer }
    }

    /// Hands a message to the producer's worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SenderClosed`] once the producer has been closed.
    pub fn send(&self, msg: T) -> Result<(), Error> {
        if self.closer.is_closed() {
            return Err(Error::SenderClosed);
        }
        self.tx.send(msg).map_err(|_| Error::SenderClosed)
    }

    /// Closes the producer. Messages already accepted are still appended.
    /// Subsequent calls are no-ops.
    pub fn close(&self) {
        let _ = self.closer.close();
    }

    /// Whether the producer has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closer.is_closed()
    }

    /// Completes once the producer has been closed.
    pub async fn closed(&self) {
        self.closer.closed().await;
    }
}

impl<T> Drop for Producer<T> {
    fn drop(&mut self) {
        if !self.closer.is_closed() {
            tracing::debug!(producer_id = self.id, "producer not closed");
            diag::publish(Error::ProducerNotClosed { id: self.id });
            let _ = self.closer.close();
        }
    }
}
