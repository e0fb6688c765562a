// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the topic subsystem: ordering, retention-driven
//! reclamation, endpoint lifecycle, and configuration conflicts.

use std::time::Duration;

use super::{DEFAULT_SEGMENT_SIZE, Topic};
use crate::error::Error;

// =========================================================================
// Ordering and delivery
// =========================================================================

// A consumer created after all messages were produced observes every
// message in order, and the virtual length counts them all.
#[tokio::test]
async fn permanent_delivers_everything_in_order() {
    let topic: Topic<u64> = Topic::builder().permanent().build();
    let producer = topic.new_producer();
    for i in 0..10_000u64 {
        producer.send(i).unwrap();
    }
    producer.close();

    let mut consumer = topic.new_consumer();
    for i in 0..10_000u64 {
        assert_eq!(consumer.recv().await, Some(i));
    }
    consumer.close();

    assert_eq!(topic.length(), 10_000);
}

// A consumer created before production keeps up with a live producer.
#[tokio::test]
async fn live_consumer_follows_a_live_producer() {
    let topic: Topic<u64> = Topic::builder().permanent().build();
    let mut consumer = topic.new_consumer();
    let producer = topic.new_producer();

    let feeder = tokio::spawn(async move {
        for i in 0..1_000u64 {
            producer.send(i).unwrap();
        }
        producer.close();
    });

    for i in 0..1_000u64 {
        assert_eq!(consumer.recv().await, Some(i));
    }
    feeder.await.unwrap();
    consumer.close();
}

// Every consumer gets its own cursor: two consumers each observe the full
// sequence.
#[tokio::test]
async fn consumers_are_independent() {
    let topic: Topic<u64> = Topic::new();
    let producer = topic.new_producer();
    for i in 0..100u64 {
        producer.send(i).unwrap();
    }
    producer.close();

    let mut first = topic.new_consumer();
    let mut second = topic.new_consumer();
    for i in 0..100u64 {
        assert_eq!(first.recv().await, Some(i));
        assert_eq!(second.recv().await, Some(i));
    }
    first.close();
    second.close();
}

// =========================================================================
// Retention
// =========================================================================

// Consumed retention: once the only consumer has read past the first
// segment, that segment is reclaimed, and the remaining messages still
// arrive without error.
#[tokio::test]
async fn consumed_reclaims_behind_the_cursor() {
    let segment = 256u64;
    let topic: Topic<u64> = Topic::builder()
        .consumed()
        .segment_size(segment as u32)
        .build();
    let producer = topic.new_producer();
    let mut consumer = topic.new_consumer();

    for i in 0..segment + 3 {
        producer.send(i).unwrap();
    }
    for i in 0..segment {
        assert_eq!(consumer.recv().await, Some(i));
    }

    tokio::time::sleep(Duration::from_millis(20)).await;

    for i in segment..segment + 3 {
        assert_eq!(consumer.recv().await, Some(i));
    }
    producer.close();
    consumer.close();
}

// Consumed retention: a late consumer starts at the oldest retained
// segment, not at the very first message.
#[tokio::test]
async fn consumed_clamps_late_consumers_forward() {
    let segment = u64::from(DEFAULT_SEGMENT_SIZE);
    let topic: Topic<u64> = Topic::builder().consumed().build();
    let producer = topic.new_producer();
    let mut first = topic.new_consumer();

    for i in 0..segment * 4 {
        producer.send(i).unwrap();
    }
    producer.close();

    for i in 0..segment + 11 {
        assert_eq!(first.recv().await, Some(i));
    }

    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut second = topic.new_consumer();
    assert_eq!(second.recv().await, Some(segment));
    first.close();
    second.close();
}

// Consumed retention with no lagging cursor drops everything, and a fresh
// append is still delivered.
#[tokio::test]
async fn consumed_drops_everything_once_read() {
    let segment = u64::from(DEFAULT_SEGMENT_SIZE);
    let topic: Topic<u64> = Topic::builder().consumed().build();
    let producer = topic.new_producer();
    let mut consumer = topic.new_consumer();

    for i in 0..segment {
        producer.send(i).unwrap();
    }
    for i in 0..segment {
        assert_eq!(consumer.recv().await, Some(i));
    }

    tokio::time::sleep(Duration::from_millis(20)).await;

    producer.send(segment).unwrap();
    assert_eq!(consumer.recv().await, Some(segment));
    producer.close();
    consumer.close();
}

// Counted retention: after quiescence a late consumer starts a whole number
// of segments back, retaining at least the configured count.
#[tokio::test]
async fn counted_keeps_the_most_recent_entries() {
    let topic: Topic<u64> = Topic::builder().counted(100).build();
    let producer = topic.new_producer();
    for i in 0..256u64 {
        producer.send(i).unwrap();
    }

    tokio::time::sleep(Duration::from_millis(150)).await;

    let mut consumer = topic.new_consumer();
    assert_eq!(consumer.recv().await, Some(128));
    producer.close();
    consumer.close();
}

// Timed retention: a segment older than the window is reclaimed even while
// a cursor is still behind it.
#[tokio::test]
async fn timed_expires_old_segments() {
    let segment = u64::from(DEFAULT_SEGMENT_SIZE);
    let topic: Topic<u64> = Topic::builder().timed(Duration::from_millis(50)).build();
    let producer = topic.new_producer();
    let mut consumer = topic.new_consumer();

    for i in 0..segment {
        producer.send(i).unwrap();
    }

    tokio::time::sleep(Duration::from_millis(120)).await;

    for i in segment..segment * 2 {
        producer.send(i).unwrap();
    }

    assert_eq!(consumer.recv().await, Some(segment));
    producer.close();
    consumer.close();
}

// =========================================================================
// Endpoint lifecycle
// =========================================================================

// Closing a producer is idempotent, and sends after close fail with the
// sender-closed error.
#[tokio::test]
async fn producer_close_is_idempotent() {
    let topic: Topic<String> = Topic::new();
    let producer = topic.new_producer();

    producer.close();
    assert!(producer.is_closed());
    assert_eq!(producer.send("blah".into()), Err(Error::SenderClosed));

    producer.close();
    assert!(producer.is_closed());
}

// Messages accepted before close are drained into the log.
#[tokio::test]
async fn producer_close_flushes_accepted_messages() {
    let topic: Topic<u64> = Topic::new();
    let producer = topic.new_producer();
    for i in 0..50u64 {
        producer.send(i).unwrap();
    }
    producer.close();

    let mut consumer = topic.new_consumer();
    for i in 0..50u64 {
        assert_eq!(consumer.recv().await, Some(i));
    }
    consumer.close();
}

#[tokio::test]
async fn consumer_close_is_idempotent() {
    let topic: Topic<u64> = Topic::new();
    let consumer = topic.new_consumer();

    consumer.close();
    assert!(consumer.is_closed());
    consumer.close();
    assert!(consumer.is_closed());
}

// A closed consumer's channel drains to None.
#[tokio::test]
async fn closed_consumer_stops_receiving() {
    let topic: Topic<u64> = Topic::new();
    let mut consumer = topic.new_consumer();
    consumer.close();
    assert_eq!(consumer.recv().await, None);
    assert_eq!(
        consumer.recv_timeout(Duration::from_millis(5)).await,
        Err(Error::ReceiverClosed)
    );
}

// recv_timeout on an idle topic times out with Ok(None).
#[tokio::test]
async fn empty_consumer_polls_out() {
    let topic: Topic<u64> = Topic::new();
    let mut consumer = topic.new_consumer();
    assert_eq!(
        consumer.recv_timeout(Duration::from_millis(5)).await,
        Ok(None)
    );
    consumer.close();
}

// =========================================================================
// Configuration
// =========================================================================

#[tokio::test]
async fn conflicting_retention_policies_fail_construction() {
    let result = Topic::<u64>::builder().permanent().consumed().try_build();
    assert_eq!(result.err(), Some(Error::RetentionPolicySet));
}

#[tokio::test]
#[should_panic(expected = "retention policy already set")]
async fn conflicting_retention_policies_panic_on_build() {
    let _: Topic<u64> = Topic::builder()
        .timed(Duration::from_millis(5))
        .counted(10)
        .build();
}

#[tokio::test]
async fn conflicting_backoff_generators_fail_construction() {
    let result = Topic::<u64>::builder()
        .fixed_backoff(Duration::from_millis(1))
        .fibonacci_backoff(Duration::from_micros(1), Duration::from_millis(1))
        .try_build();
    assert_eq!(result.err(), Some(Error::BackoffGeneratorSet));
}

// Redundant defaults and a single policy choice are accepted.
#[tokio::test]
async fn single_options_build_cleanly() {
    let _: Topic<u64> = Topic::builder().build();
    let _: Topic<u64> = Topic::builder().permanent().build();
    let _: Topic<u64> = Topic::builder().consumed().build();
    let _: Topic<u64> = Topic::builder()
        .counted(5)
        .fixed_backoff(Duration::from_millis(1))
        .build();
}

// =========================================================================
// Late-close diagnostics
// =========================================================================

#[tokio::test]
async fn dropped_endpoints_report_to_the_debug_sink() {
    let _guard = crate::diag::test_lock();
    crate::diag::enable();
    let mut diagnostics = crate::diag::subscribe();

    let topic: Topic<u64> = Topic::new();
    drop(topic.new_producer());
    drop(topic.new_consumer());

    // Unrelated tests may drop endpoints concurrently; scan until both of
    // ours have been seen.
    let (mut producer_seen, mut consumer_seen) = (false, false);
    while !(producer_seen && consumer_seen) {
        let err = diagnostics.recv().await.unwrap();
        let text = err.to_string();
        producer_seen |= text.contains("producer not closed");
        consumer_seen |= text.contains("consumer not closed");
    }
    crate::diag::disable();
}
