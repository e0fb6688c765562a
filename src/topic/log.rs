// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! The segmented append-only log backing a topic.
//!
//! # Layout
//!
//! The log is a singly-linked list of fixed-capacity segments anchored by
//! `head` (oldest live segment, behind a `RwLock`) and `tail` (the segment
//! accepting appends, behind a `Mutex`). Two cross-segment counters complete
//! the picture: `start_offset` is the global offset of the head's first
//! slot, `virtual_len` the total number of entries ever appended. Their
//! difference is the live entry count.
//!
//! # Lock-free reads of full segments
//!
//! Entry slots are `OnceLock`s and a segment's length is an atomic published
//! with `Release` after the slot write, so readers never need the segment's
//! internal lock. That lock (a [`SealableMutex`]) only serializes the append
//! path while the segment is active; the append that fills a segment links
//! its successor and seals the lock, making the segment immutable.
//!
//! # Vacuum protocol
//!
//! Reclamation walks from the head under the head write lock, consulting a
//! retention query per candidate. Only full segments are ever discarded --
//! the active tail is always retained. Readers that come in below the
//! advanced `start_offset` are clamped forward, which is how a consumer
//! transparently restarts after the segment under it has been dropped.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

use crate::sync::SealableMutex;

/// A single log entry: the message plus the instant it was appended,
/// consulted by time-based retention.
pub(crate) struct Entry<T> {
    pub(crate) msg: T,
    pub(crate) at: Instant,
}

/// A fixed-capacity run of log entries. Active until full, immutable
/// afterward, detached from the log by vacuum.
pub(crate) struct Segment<T> {
    slots: Box<[OnceLock<Entry<T>>]>,
    len: AtomicU32,
    next: OnceLock<Arc<Segment<T>>>,
    lock: SealableMutex,
}

impl<T> Segment<T> {
    fn new(capacity: u32) -> Arc<Self> {
        let slots = (0..capacity).map(|_| OnceLock::new()).collect::<Vec<_>>();
        Arc::new(Self {
            slots: slots.into_boxed_slice(),
            len: AtomicU32::new(0),
            next: OnceLock::new(),
            lock: SealableMutex::new(),
        })
    }

    pub(crate) fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    pub(crate) fn length(&self) -> u32 {
        self.len.load(Ordering::Acquire)
    }

    pub(crate) fn is_full(&self) -> bool {
        self.length() == self.capacity()
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.is_full()
    }

    fn next_segment(&self) -> Option<Arc<Segment<T>>> {
        self.next.get().cloned()
    }

    fn entry(&self, pos: usize) -> Option<&Entry<T>> {
        self.slots.get(pos).and_then(OnceLock::get)
    }

    /// First and last append instants of the occupied slots.
    pub(crate) fn time_range(&self) -> Option<(Instant, Instant)> {
        let len = self.length();
        if len == 0 {
            return None;
        }
        let first = self.entry(0)?;
        let last = self.entry(len as usize - 1)?;
        Some((first.at, last.at))
    }

    /// Appends under the segment lock, rolling over to a freshly linked
    /// successor when full. Returns the segment that received the entry,
    /// which becomes the new tail when it differs from `self`.
    ///
    /// Only ever called with the log's tail lock held, so at most one append
    /// is in flight and the rollover recursion is depth one.
    fn append(self: &Arc<Self>, capacity: u32, entry: Entry<T>) -> Arc<Segment<T>> {
        let hold = self.lock.lock();
        let len = self.len.load(Ordering::Relaxed);
        if len == self.capacity() {
            let next = Arc::clone(self.next.get_or_init(|| Segment::new(capacity)));
            hold.seal();
            return next.append(capacity, entry);
        }
        let _ = self.slots[len as usize].set(entry);
        self.len.store(len + 1, Ordering::Release);
        drop(hold);
        Arc::clone(self)
    }
}

/// The segmented log. See the module docs for the locking discipline.
pub(crate) struct Log<T> {
    head: RwLock<Option<Arc<Segment<T>>>>,
    tail: Mutex<Option<Arc<Segment<T>>>>,
    start_offset: AtomicU64,
    virtual_len: AtomicU64,
    segment_size: u32,
}

impl<T> Log<T> {
    pub(crate) fn new(segment_size: u32) -> Self {
        debug_assert!(segment_size > 0, "segment size must be non-zero");
        Self {
            head: RwLock::new(None),
            tail: Mutex::new(None),
            start_offset: AtomicU64::new(0),
            virtual_len: AtomicU64::new(0),
            segment_size: segment_size.max(1),
        }
    }

    /// Global offset of the first live slot.
    pub(crate) fn start(&self) -> u64 {
        self.start_offset.load(Ordering::Acquire)
    }

    /// Total number of entries ever appended.
    pub(crate) fn length(&self) -> u64 {
        self.virtual_len.load(Ordering::Acquire)
    }

    /// Appends a message at the current tail.
    pub(crate) fn put(&self, msg: T) {
        let entry = Entry {
            msg,
            at: Instant::now(),
        };
        let mut tail = self.tail.lock();
        let segment = match &*tail {
            Some(segment) => Arc::clone(segment),
            None => {
                let segment = Segment::new(self.segment_size);
                *self.head.write() = Some(Arc::clone(&segment));
                *tail = Some(Arc::clone(&segment));
                segment
            }
        };
        let target = segment.append(self.segment_size, entry);
        if !Arc::ptr_eq(&target, &segment) {
            *tail = Some(target);
        }
        let _ = self.virtual_len.fetch_add(1, Ordering::AcqRel);
    }

    /// Reads the entry at `offset`, clamped forward to the current start.
    /// Returns the message (if the slot has been written) and the clamped
    /// offset actually addressed.
    pub(crate) fn get(&self, offset: u64) -> (Option<T>, u64)
    where
        T: Clone,
    {
        let (clamped, mut pos, mut current) = {
            let head = self.head.read();
            let start = self.start_offset.load(Ordering::Acquire);
            let clamped = offset.max(start);
            (clamped, clamped - start, head.clone())
        };

        while let Some(segment) = current {
            let capacity = u64::from(segment.capacity());
            if pos >= capacity {
                pos -= capacity;
                current = segment.next_segment();
                continue;
            }
            if (pos as u32) < segment.length() {
                if let Some(entry) = segment.entry(pos as usize) {
                    return (Some(entry.msg.clone()), clamped);
                }
            }
            // The slot at the tail has not been written yet.
            return (None, clamped);
        }
        (None, clamped)
    }

    /// Whether a vacuum pass could make progress. Only a full head segment
    /// is a candidate -- full segments are immutable and can be evaluated
    /// without coordinating with appenders.
    pub(crate) fn can_vacuum(&self) -> bool {
        let head = self.head.read();
        head.as_ref().is_some_and(|segment| segment.is_full())
    }

    /// Walks from the head discarding whole segments until the retention
    /// query asks to stop or the active tail is reached. Holds the head
    /// write lock for the duration of the pass.
    pub(crate) fn vacuum(&self, mut retain: impl FnMut(&Segment<T>) -> bool) {
        let mut head = self.head.write();
        loop {
            let Some(current) = head.clone() else { return };
            if current.is_active() || retain(&current) {
                return;
            }
            let _ = self
                .start_offset
                .fetch_add(u64::from(current.capacity()), Ordering::AcqRel);
            if let Some(next) = current.next_segment() {
                *head = Some(next);
                continue;
            }
            // The walk ran off the end: the log looks empty. An append may
            // be linking a successor concurrently, so re-check under the
            // tail lock before clearing both anchors. The tail anchor is
            // left alone in the linked case -- the appender already moved
            // it, possibly further than one segment.
            let mut tail = self.tail.lock();
            match current.next_segment() {
                Some(next) => {
                    *head = Some(next);
                }
                None => {
                    *head = None;
                    *tail = None;
                }
            }
            return;
        }
    }
}
