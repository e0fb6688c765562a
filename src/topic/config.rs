// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Topic configuration.
//!
//! Options are applied through a builder with fail-closed conflict checks:
//! at most one retention policy and at most one backoff generator may be
//! set, and a violation is recorded at the call that commits it. `build`
//! treats a conflicted builder as an unrecoverable construction failure and
//! panics; `try_build` surfaces the same condition as an `Error` for
//! callers that prefer to handle it.

use std::marker::PhantomData;
use std::time::Duration;

use super::backoff::BackoffGenerator;
use super::retention::{Consumed, Counted, Permanent, RetentionPolicy, Timed};
use super::topic::Topic;
use crate::error::Error;

/// Default number of entry slots per log segment.
pub const DEFAULT_SEGMENT_SIZE: u32 = 32;

/// Builder for [`Topic`] instances.
pub struct TopicBuilder<T> {
    retention: Option<Box<dyn RetentionPolicy>>,
    backoff: Option<BackoffGenerator>,
    segment_size: u32,
    conflict: Option<Error>,
    _msg: PhantomData<fn() -> T>,
}

impl<T> TopicBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            retention: None,
            backoff: None,
            segment_size: DEFAULT_SEGMENT_SIZE,
            conflict: None,
            _msg: PhantomData,
        }
    }

    /// Retains every message forever (the default).
    #[must_use]
    pub fn permanent(self) -> Self {
        self.retention_policy(Permanent)
    }

    /// Drops segments every live consumer has moved past.
    #[must_use]
    pub fn consumed(self) -> Self {
        self.retention_policy(Consumed)
    }

    /// Retains at least the most recent `count` messages.
    #[must_use]
    pub fn counted(self, count: u64) -> Self {
        self.retention_policy(Counted::new(count))
    }

    /// Retains messages for at least `duration`.
    #[must_use]
    pub fn timed(self, duration: Duration) -> Self {
        self.retention_policy(Timed::new(duration))
    }

    /// Installs a custom retention policy. Fails the builder if one has
    /// already been set.
    #[must_use]
    pub fn retention_policy(mut self, policy: impl RetentionPolicy + 'static) -> Self {
        if self.retention.is_some() {
            let _ = self.conflict.get_or_insert(Error::RetentionPolicySet);
        } else {
            self.retention = Some(Box::new(policy));
        }
        self
    }

    /// Polls with a constant delay.
    #[must_use]
    pub fn fixed_backoff(self, delay: Duration) -> Self {
        self.backoff_generator(BackoffGenerator::fixed(delay))
    }

    /// Polls with Fibonacci multiples of `base`, capped at `max`.
    #[must_use]
    pub fn fibonacci_backoff(self, base: Duration, max: Duration) -> Self {
        self.backoff_generator(BackoffGenerator::fibonacci(base, max))
    }

    /// Installs a custom backoff generator. Fails the builder if one has
    /// already been set.
    #[must_use]
    pub fn backoff_generator(mut self, generator: BackoffGenerator) -> Self {
        if self.backoff.is_some() {
            let _ = self.conflict.get_or_insert(Error::BackoffGeneratorSet);
        } else {
            self.backoff = Some(generator);
        }
        self
    }

    /// Overrides the per-segment slot count.
    #[must_use]
    pub fn segment_size(mut self, size: u32) -> Self {
        self.segment_size = size.max(1);
        self
    }

    /// Builds the topic, filling unset options with defaults.
    ///
    /// # Errors
    ///
    /// Returns the first recorded option conflict.
    pub fn try_build(self) -> Result<Topic<T>, Error> {
        if let Some(conflict) = self.conflict {
            return Err(conflict);
        }
        let retention = self.retention.unwrap_or_else(|| Box::new(Permanent));
        let backoff = self.backoff.unwrap_or_default();
        Ok(Topic::from_parts(retention, backoff, self.segment_size))
    }

    /// Builds the topic, filling unset options with defaults.
    ///
    /// # Panics
    ///
    /// Panics on a conflicted builder; configuration conflicts are
    /// programming errors.
    #[must_use]
    pub fn build(self) -> Topic<T> {
        match self.try_build() {
            Ok(topic) => topic,
            Err(conflict) => panic!("invalid topic configuration: {conflict}"),
        }
    }
}
