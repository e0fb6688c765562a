// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Topics: multi-producer, multi-consumer append-only logs with independent
//! cursors and pluggable retention.

pub mod backoff;
mod config;
mod consumer;
mod cursor;
mod log;
mod producer;
pub mod retention;
#[allow(clippy::module_inception)] // topic/topic.rs holds the core topic internals.
mod topic;

#[cfg(test)]
mod tests;

pub use config::{DEFAULT_SEGMENT_SIZE, TopicBuilder};
pub use consumer::Consumer;
pub use producer::Producer;
pub use topic::Topic;

use std::sync::atomic::{AtomicU64, Ordering};

/// Mints process-unique identifiers for cursors, producers, consumers, and
/// the vacuum observer slot.
pub(crate) fn next_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}
