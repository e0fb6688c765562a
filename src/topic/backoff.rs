// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Backoff sequences for idle consumers and the vacuum loop.
//!
//! A generator mints a fresh sequence of wait durations per polling session.
//! Consumers restart their sequence after every successful delivery and the
//! vacuum loop restarts after every productive pass, so the sequence shape
//! controls how quickly an idle worker winds down its polling rate.

use std::sync::Arc;
use std::time::Duration;

/// An endless-by-convention sequence of wait durations.
pub type BackoffSequence = Box<dyn Iterator<Item = Duration> + Send>;

/// Fallback delay used if a custom sequence runs dry.
pub(crate) const MAX_BACKOFF: Duration = Duration::from_millis(50);

/// A factory of backoff sequences.
///
/// Cheaply cloneable; every worker draws its own sequence.
#[derive(Clone)]
pub struct BackoffGenerator {
    make: Arc<dyn Fn() -> BackoffSequence + Send + Sync>,
}

impl BackoffGenerator {
    /// Wraps a custom sequence factory.
    pub fn new(make: impl Fn() -> BackoffSequence + Send + Sync + 'static) -> Self {
        Self {
            make: Arc::new(make),
        }
    }

    /// A constant sequence: every wait is `delay`.
    #[must_use]
    pub fn fixed(delay: Duration) -> Self {
        Self::new(move || Box::new(std::iter::repeat(delay)))
    }

    /// Fibonacci multiples of `base`, capped at `max`: `base, base, 2*base,
    /// 3*base, 5*base, ...`.
    #[must_use]
    pub fn fibonacci(base: Duration, max: Duration) -> Self {
        Self::new(move || {
            let mut previous = 0u32;
            let mut current = 1u32;
            Box::new(std::iter::from_fn(move || {
                let delay = base.saturating_mul(current).min(max);
                if delay < max {
                    let following = previous.saturating_add(current);
                    previous = current;
                    current = following;
                }
                Some(delay)
            }))
        })
    }

    /// Mints a fresh sequence.
    #[must_use]
    pub fn sequence(&self) -> BackoffSequence {
        (self.make)()
    }
}

impl Default for BackoffGenerator {
    /// Fibonacci milliseconds capped at 50ms.
    fn default() -> Self {
        Self::fibonacci(Duration::from_millis(1), MAX_BACKOFF)
    }
}

impl std::fmt::Debug for BackoffGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackoffGenerator").finish_non_exhaustive()
    }
}

/// Draws the next delay from a sequence, falling back to [`MAX_BACKOFF`]
/// when a custom sequence runs dry.
pub(crate) fn next_delay(sequence: &mut BackoffSequence) -> Duration {
    sequence.next().unwrap_or(MAX_BACKOFF)
}
