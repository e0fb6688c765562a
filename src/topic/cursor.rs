// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Per-consumer read positions.
//!
//! A cursor is an atomic offset into the log plus the wiring that keeps its
//! consumer honest: a [`ReadyWait`] the topic pokes on every append, and a
//! [`Closer`] whose callback deregisters the cursor from the topic's cursor
//! set and observer table.
//!
//! Offsets are monotonically non-decreasing. A read below the log's start
//! offset is clamped forward and the clamped position written back, which is
//! how a consumer transparently skips over vacuumed segments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::topic::TopicCore;
use crate::sync::{Closer, ReadyWait};

pub(crate) struct Cursor<T> {
    pub(crate) id: u64,
    topic: Arc<TopicCore<T>>,
    offset: AtomicU64,
    pub(crate) ready: ReadyWait,
    pub(crate) closer: Closer,
}

impl<T> Cursor<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(topic: &Arc<TopicCore<T>>) -> Arc<Self> {
        let id = super::next_id();
        let ready = ReadyWait::new();
        if topic.log.length() != 0 {
            ready.notify();
        }

        let closer = {
            let weak: Weak<TopicCore<T>> = Arc::downgrade(topic);
            let ready = ready.clone();
            Closer::with_callback(move || {
                let _ = ready.close();
                if let Some(core) = weak.upgrade() {
                    core.cursors.remove(id);
                    core.observers.remove(id);
                }
            })
        };

        Arc::new(Self {
            id,
            topic: Arc::clone(topic),
            offset: AtomicU64::new(0),
            ready,
            closer,
        })
    }

    /// Reads the entry under the cursor without advancing. The stored offset
    /// is replaced by the clamped offset whenever the read hits.
    pub(crate) fn head(&self) -> Option<T> {
        let offset = self.offset.load(Ordering::Acquire);
        let (msg, clamped) = self.topic.get(offset);
        if msg.is_some() {
            self.offset.store(clamped, Ordering::Release);
        }
        msg
    }

    /// Moves the cursor past the entry just delivered.
    pub(crate) fn advance(&self) {
        let _ = self.offset.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset.load(Ordering::Acquire)
    }
}

/// The set of live cursors on a topic. Snapshot of their offsets feeds the
/// `Consumed` retention policy.
pub(crate) struct CursorSet<T> {
    cursors: RwLock<HashMap<u64, Arc<Cursor<T>>>>,
}

impl<T> CursorSet<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn track(&self, cursor: Arc<Cursor<T>>) {
        let mut cursors = self.cursors.write();
        let _ = cursors.entry(cursor.id).or_insert(cursor);
    }

    pub(crate) fn remove(&self, id: u64) {
        let _ = self.cursors.write().remove(&id);
    }

    pub(crate) fn offsets(&self) -> Vec<u64> {
        let cursors = self.cursors.read();
        cursors.values().map(|cursor| cursor.offset()).collect()
    }
}
