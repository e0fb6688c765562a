// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Pluggable retention policies.
//!
//! The vacuum loop asks the topic's policy, one full head segment at a time,
//! whether the candidate must be retained. Answering `false` discards the
//! segment and moves on to the next; answering `true` ends the pass. A
//! policy may accumulate state across calls through `&mut self`.

use std::time::Duration;
use tokio::time::Instant;

/// A snapshot of everything a policy may consult for one candidate segment.
#[derive(Debug, Clone, Copy)]
pub struct RetentionStats<'a> {
    /// Wall time at the start of the vacuum pass.
    pub now: Instant,
    /// Total number of entries ever appended to the log.
    pub log_length: u64,
    /// Offsets of every live cursor, in no particular order.
    pub cursor_offsets: &'a [u64],
    /// Global offset of the candidate segment's first entry.
    pub first_offset: u64,
    /// Global offset of the candidate segment's last entry.
    pub last_offset: u64,
    /// Append time of the candidate's first entry.
    pub first_at: Instant,
    /// Append time of the candidate's last entry.
    pub last_at: Instant,
}

/// Decides whether a full segment survives a vacuum pass.
pub trait RetentionPolicy: Send {
    /// Returns `true` to retain the candidate segment (ending the pass) or
    /// `false` to discard it.
    fn retain(&mut self, stats: &RetentionStats<'_>) -> bool;
}

/// Retains every segment forever.
#[derive(Debug, Default, Clone, Copy)]
pub struct Permanent;

impl RetentionPolicy for Permanent {
    fn retain(&mut self, _stats: &RetentionStats<'_>) -> bool {
        true
    }
}

/// Retains a segment while at least one cursor has yet to move past it.
/// A segment with no cursor at or behind its last entry is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct Consumed;

impl RetentionPolicy for Consumed {
    fn retain(&mut self, stats: &RetentionStats<'_>) -> bool {
        stats
            .cursor_offsets
            .iter()
            .any(|&offset| offset <= stats.last_offset)
    }
}

/// Retains the most recent `count` entries (rounded up to whole segments):
/// a segment is discarded only while doing so still leaves at least `count`
/// live entries behind it.
#[derive(Debug, Clone, Copy)]
pub struct Counted {
    count: u64,
}

impl Counted {
    /// Creates a policy retaining at least `count` entries.
    #[must_use]
    pub fn new(count: u64) -> Self {
        Self { count }
    }

    /// The configured entry count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl RetentionPolicy for Counted {
    fn retain(&mut self, stats: &RetentionStats<'_>) -> bool {
        let remaining_after_drop = stats.log_length.saturating_sub(stats.last_offset + 1);
        remaining_after_drop < self.count
    }
}

/// Retains a segment while its newest entry is younger than `duration`.
#[derive(Debug, Clone, Copy)]
pub struct Timed {
    duration: Duration,
}

impl Timed {
    /// Creates a policy retaining entries for `duration`.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// The configured retention window.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl RetentionPolicy for Timed {
    fn retain(&mut self, stats: &RetentionStats<'_>) -> bool {
        stats.now.duration_since(stats.last_at) <= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats<'a>(offsets: &'a [u64], length: u64, first: u64, last: u64) -> RetentionStats<'a> {
        let now = Instant::now();
        RetentionStats {
            now,
            log_length: length,
            cursor_offsets: offsets,
            first_offset: first,
            last_offset: last,
            first_at: now,
            last_at: now,
        }
    }

    #[tokio::test]
    async fn permanent_always_retains() {
        assert!(Permanent.retain(&stats(&[], 100, 0, 31)));
    }

    #[tokio::test]
    async fn consumed_retains_while_a_cursor_lags() {
        let mut policy = Consumed;
        assert!(policy.retain(&stats(&[10], 64, 0, 31)));
        assert!(policy.retain(&stats(&[31], 64, 0, 31)));
        assert!(!policy.retain(&stats(&[32], 64, 0, 31)));
        assert!(!policy.retain(&stats(&[], 64, 0, 31)));
    }

    #[tokio::test]
    async fn counted_drops_while_enough_remains() {
        // 256 appended, segment size 32: segments ending at 127 may go,
        // the one ending at 159 must stay (dropping it would leave 96).
        let mut policy = Counted::new(100);
        assert!(!policy.retain(&stats(&[], 256, 96, 127)));
        assert!(policy.retain(&stats(&[], 256, 128, 159)));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_retains_young_segments() {
        let mut policy = Timed::new(Duration::from_millis(50));
        let appended_at = Instant::now();

        tokio::time::advance(Duration::from_millis(20)).await;
        let mut s = stats(&[], 32, 0, 31);
        s.last_at = appended_at;
        s.now = Instant::now();
        assert!(policy.retain(&s));

        tokio::time::advance(Duration::from_millis(60)).await;
        s.now = Instant::now();
        assert!(!policy.retain(&s));
    }
}
