// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! The process-wide debug sink.
//!
//! A best-effort delivery path for protocol diagnostics: producers and
//! consumers dropped without being closed, and processor start functions
//! that failed to return promptly. The sink is disabled by default and
//! costs a single atomic load per publish while it stays that way.
//!
//! This is a hygiene signal, not a correctness mechanism -- diagnostics
//! published with no subscriber registered are simply dropped, and every
//! diagnostic is also emitted through `tracing` regardless of the sink
//! state.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::error::Error;

static ENABLED: AtomicBool = AtomicBool::new(false);
static SUBSCRIBERS: OnceLock<RwLock<Vec<mpsc::UnboundedSender<Error>>>> = OnceLock::new();

fn subscribers() -> &'static RwLock<Vec<mpsc::UnboundedSender<Error>>> {
    SUBSCRIBERS.get_or_init(|| RwLock::new(Vec::new()))
}

/// Enables diagnostic publication.
pub fn enable() {
    ENABLED.store(true, Ordering::Release);
}

/// Disables diagnostic publication. Registered subscribers stay registered.
pub fn disable() {
    ENABLED.store(false, Ordering::Release);
}

/// Whether diagnostics are currently published.
#[must_use]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Acquire)
}

/// Registers a diagnostic subscriber. Every diagnostic published while the
/// sink is enabled is delivered to all live subscribers; dropping the
/// receiver deregisters it.
#[must_use]
pub fn subscribe() -> mpsc::UnboundedReceiver<Error> {
    let (tx, rx) = mpsc::unbounded_channel();
    subscribers().write().push(tx);
    rx
}

/// Publishes a diagnostic to all live subscribers, pruning dead ones.
/// No-op while the sink is disabled.
pub(crate) fn publish(err: Error) {
    if !is_enabled() {
        return;
    }
    let mut subscribers = subscribers().write();
    subscribers.retain(|tx| tx.send(err.clone()).is_ok());
}

/// Serializes tests that flip the process-wide enable flag.
#[cfg(test)]
pub(crate) fn test_lock() -> parking_lot::MutexGuard<'static, ()> {
    static LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());
    LOCK.lock()
}
