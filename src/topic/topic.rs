// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Topic internals: the shared core, the observer table, and the vacuum
//! loop.
//!
//! # Core ownership
//!
//! `Topic<T>` is a cheaply cloneable handle over an `Arc<TopicCore<T>>`.
//! Producers and consumers hold their own strong references, so the core
//! outlives the original handle for as long as any endpoint is live. The
//! vacuum task deliberately holds only a `Weak` plus a clone of the core's
//! closer: when the last strong reference drops, the core's `Drop` closes
//! the closer and the task exits on its next wakeup.
//!
//! # Wakeup plumbing
//!
//! Every append notifies the observer table -- one [`ReadyWait`] per cursor
//! plus one for the vacuum loop. Every read notifies the vacuum `ReadyWait`
//! as well, so consumption-driven policies run without waiting for the next
//! backoff tick.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

use super::backoff::{BackoffGenerator, next_delay};
use super::config::TopicBuilder;
use super::consumer::Consumer;
use super::cursor::{Cursor, CursorSet};
use super::log::Log;
use super::producer::Producer;
use super::retention::{RetentionPolicy, RetentionStats};
use crate::sync::{Closer, ReadyWait};

/// A multi-producer, multi-consumer in-process topic.
///
/// Messages are appended to a segmented log; each consumer tracks its own
/// cursor, so every consumer independently observes the full (retained)
/// message sequence in order. Retention is enforced by a background vacuum
/// task owned by the topic.
///
/// The handle is cheaply cloneable. Must be created inside a Tokio runtime.
pub struct Topic<T> {
    core: Arc<TopicCore<T>>,
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> Topic<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a topic with the default configuration: permanent retention,
    /// Fibonacci backoff, segment size 32.
    #[must_use]
    pub fn new() -> Self {
        TopicBuilder::new().build()
    }

    /// Starts building a topic with explicit options.
    #[must_use]
    pub fn builder() -> TopicBuilder<T> {
        TopicBuilder::new()
    }

    pub(crate) fn from_parts(
        retention: Box<dyn RetentionPolicy>,
        backoff: BackoffGenerator,
        segment_size: u32,
    ) -> Self {
        let core = Arc::new(TopicCore {
            log: Log::new(segment_size),
            cursors: CursorSet::new(),
            observers: Observers::new(),
            vacuum_ready: ReadyWait::new(),
            retention: Mutex::new(retention),
            backoff,
            closer: Closer::new(),
        });
        // The vacuum loop is an observer like any cursor: every append
        // wakes it.
        core.observers
            .add(super::next_id(), core.vacuum_ready.clone());
        start_vacuum(&core);
        Self { core }
    }

    /// The virtual size of the topic: the total number of messages ever
    /// appended, including those already vacuumed.
    #[must_use]
    pub fn length(&self) -> u64 {
        self.core.log.length()
    }

    /// Creates a producer endpoint for this topic.
    #[must_use]
    pub fn new_producer(&self) -> Producer<T> {
        Producer::new(&self.core)
    }

    /// Creates a consumer endpoint with a fresh cursor positioned at the
    /// oldest retained message.
    #[must_use]
    pub fn new_consumer(&self) -> Consumer<T> {
        let cursor = Cursor::new(&self.core);
        self.core.cursors.track(Arc::clone(&cursor));
        self.core.observers.add(cursor.id, cursor.ready.clone());
        Consumer::new(cursor, self.core.backoff.clone())
    }
}

impl<T> Default for Topic<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct TopicCore<T> {
    pub(crate) log: Log<T>,
    pub(crate) cursors: CursorSet<T>,
    pub(crate) observers: Observers,
    vacuum_ready: ReadyWait,
    retention: Mutex<Box<dyn RetentionPolicy>>,
    backoff: BackoffGenerator,
    closer: Closer,
}

impl<T> TopicCore<T> {
    /// Appends a message and wakes every observer.
    pub(crate) fn put(&self, msg: T) {
        self.log.put(msg);
        self.observers.notify_all();
    }

    /// Reads at `offset` (clamped) and pokes the vacuum loop so that
    /// consumption-driven retention reacts promptly.
    pub(crate) fn get(&self, offset: u64) -> (Option<T>, u64)
    where
        T: Clone,
    {
        let result = self.log.get(offset);
        self.vacuum_ready.notify();
        result
    }

    /// One vacuum pass: snapshot the log-wide statistics once, then let the
    /// policy judge candidates as the log walks its head forward.
    fn vacuum(&self)
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = Instant::now();
        let log_length = self.log.length();
        let cursor_offsets = self.cursors.offsets();
        let mut policy = self.retention.lock();
        self.log.vacuum(|segment| {
            let first_offset = self.log.start();
            let (first_at, last_at) = segment.time_range().unwrap_or((now, now));
            let stats = RetentionStats {
                now,
                log_length,
                cursor_offsets: &cursor_offsets,
                first_offset,
                last_offset: first_offset + u64::from(segment.length().saturating_sub(1)),
                first_at,
                last_at,
            };
            policy.retain(&stats)
        });
    }
}

impl<T> Drop for TopicCore<T> {
    fn drop(&mut self) {
        let _ = self.closer.close();
        let _ = self.vacuum_ready.close();
    }
}

/// Launches the vacuum task for a freshly built core. The task wakes on
/// {close, vacuum ReadyWait, backoff tick}, vacuums whenever the head
/// segment is full, and restarts its backoff sequence after a productive
/// pass.
fn start_vacuum<T>(core: &Arc<TopicCore<T>>)
where
    T: Clone + Send + Sync + 'static,
{
    let weak = Arc::downgrade(core);
    let ready = core.vacuum_ready.clone();
    let closer = core.closer.clone();
    let generator = core.backoff.clone();

    drop(tokio::spawn(async move {
        let mut sequence = generator.sequence();
        loop {
            let delay = next_delay(&mut sequence);
            tokio::select! {
                _ = closer.closed() => return,
                _ = tokio::time::sleep(delay) => {}
                _ = ready.wait() => {}
            }
            let Some(core) = weak.upgrade() else { return };
            if core.log.can_vacuum() {
                let before = core.log.start();
                core.vacuum();
                let reclaimed = core.log.start() - before;
                if reclaimed > 0 {
                    tracing::trace!(reclaimed, "vacuumed leading segments");
                    sequence = generator.sequence();
                }
            }
        }
    }));
}

/// Wake callbacks registered against a topic, keyed by cursor id (the
/// vacuum loop occupies one slot of its own).
pub(crate) struct Observers {
    table: RwLock<HashMap<u64, ReadyWait>>,
}

impl Observers {
    fn new() -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn add(&self, id: u64, ready: ReadyWait) {
        let _ = self.table.write().insert(id, ready);
    }

    pub(crate) fn remove(&self, id: u64) {
        let _ = self.table.write().remove(&id);
    }

    fn notify_all(&self) {
        let table = self.table.read();
        for ready in table.values() {
            ready.notify();
        }
    }
}
