// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Stream tests: single operators driven through a bare context, composed
//! combinators, timing operators under a paused clock, and the stream
//! lifecycle end to end.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::context::Context;
use super::*;
use crate::sync::Closer;
use crate::table::{Column, Table, Updater};
use crate::topic::Topic;

/// Drives one processor over fresh channels, exposing its endpoints.
struct OpHarness<In, Out> {
    done: Closer,
    input: mpsc::Sender<In>,
    output: mpsc::Receiver<Out>,
    advice: mpsc::UnboundedReceiver<Advice>,
}

fn start_op<In, Out>(processor: Processor<In, Out>) -> OpHarness<In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
{
    let done = Closer::new();
    let (advice_tx, advice) = mpsc::unbounded_channel();
    let (input, in_rx) = mpsc::channel(64);
    let (out_tx, output) = mpsc::channel(64);
    processor.start(Context::new(done.clone(), advice_tx, in_rx, out_tx));
    OpHarness {
        done,
        input,
        output,
        advice,
    }
}

async fn feed_and_close<In, Out>(h: &mut OpHarness<In, Out>, inputs: Vec<In>) {
    for input in inputs {
        h.input.send(input).await.unwrap();
    }
    let (closed_input, _rx) = mpsc::channel(1);
    let _ = std::mem::replace(&mut h.input, closed_input);
}

async fn collect<In, Out>(h: &mut OpHarness<In, Out>) -> Vec<Out> {
    let mut outputs = Vec::new();
    while let Some(output) = h.output.recv().await {
        outputs.push(output);
    }
    outputs
}

/// A source that drains a vector, one element per token.
fn source_from<Msg>(items: Vec<Msg>) -> Processor<Source, Msg>
where
    Msg: Send + 'static,
{
    let mut items = items.into_iter();
    generate(move || items.next())
}

/// Feeds `Source` tokens into a bare-harness source processor until it
/// exits. Composed sources get their tokens from the stream runtime or a
/// combinator; a source started alone needs this stand-in.
fn pump_tokens<Out>(h: &OpHarness<Source, Out>) {
    let tokens = h.input.clone();
    drop(tokio::spawn(async move {
        while tokens.send(Source).await.is_ok() {}
    }));
}

// =========================================================================
// Element-wise operators
// =========================================================================

#[tokio::test]
async fn forward_passes_everything_through() {
    let mut h = start_op(forward::<u64>());
    feed_and_close(&mut h, vec![1, 2, 3]).await;
    assert_eq!(collect(&mut h).await, vec![1, 2, 3]);
}

#[tokio::test]
async fn filter_drops_failing_messages() {
    let mut h = start_op(filter(|n: &u64| n % 2 == 0));
    feed_and_close(&mut h, (0..10).collect()).await;
    assert_eq!(collect(&mut h).await, vec![0, 2, 4, 6, 8]);
}

#[tokio::test]
async fn map_transforms_each_message() {
    let mut h = start_op(map(|n: u64| n * 2));
    feed_and_close(&mut h, vec![1, 2, 3]).await;
    assert_eq!(collect(&mut h).await, vec![2, 4, 6]);
}

#[tokio::test]
async fn flat_map_expands_in_order() {
    let mut h = start_op(flat_map(|n: u64| vec![n, n * 10]));
    feed_and_close(&mut h, vec![1, 2]).await;
    assert_eq!(collect(&mut h).await, vec![1, 10, 2, 20]);
}

#[tokio::test]
async fn for_each_observes_then_forwards() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut h = start_op(for_each(move |n: &u64| sink.lock().push(*n)));
    feed_and_close(&mut h, vec![7, 8]).await;
    assert_eq!(collect(&mut h).await, vec![7, 8]);
    assert_eq!(*seen.lock(), vec![7, 8]);
}

// =========================================================================
// Folding
// =========================================================================

// reduce seeds from the first input, so its first emission covers two.
#[tokio::test]
async fn reduce_emits_from_the_second_input() {
    let mut h = start_op(reduce(|acc: i64, n: i64| acc + n));
    feed_and_close(&mut h, vec![1, 2, 3]).await;
    assert_eq!(collect(&mut h).await, vec![3, 6]);
}

#[tokio::test]
async fn reduce_from_emits_after_every_input() {
    let mut h = start_op(reduce_from(|acc: i64, n: i64| acc + n, 5));
    feed_and_close(&mut h, vec![1, 2, 3]).await;
    assert_eq!(collect(&mut h).await, vec![6, 8, 11]);
}

#[tokio::test]
async fn scan_emits_every_running_total() {
    let mut h = start_op(scan(|acc: i64, n: i64| acc + n));
    feed_and_close(&mut h, vec![1, 2, 3, 4, 5]).await;
    assert_eq!(collect(&mut h).await, vec![1, 3, 6, 10, 15]);
}

#[tokio::test]
async fn scan_from_starts_at_the_seed() {
    let mut h = start_op(scan_from(|acc: i64, n: i64| acc + n, 10));
    feed_and_close(&mut h, vec![1, 2, 3]).await;
    assert_eq!(collect(&mut h).await, vec![11, 13, 16]);
}

// =========================================================================
// Limiting and deduplication
// =========================================================================

#[tokio::test]
async fn take_forwards_only_the_prefix() {
    let mut h = start_op(take::<u64>(3));
    feed_and_close(&mut h, (0..10).collect()).await;
    assert_eq!(collect(&mut h).await, vec![0, 1, 2]);
}

#[tokio::test]
async fn take_while_stops_at_the_first_failure() {
    let mut h = start_op(take_while(|n: &u64| *n < 3));
    feed_and_close(&mut h, vec![0, 1, 2, 3, 1]).await;
    assert_eq!(collect(&mut h).await, vec![0, 1, 2]);
}

#[tokio::test]
async fn skip_drops_only_the_prefix() {
    let mut h = start_op(skip::<u64>(3));
    feed_and_close(&mut h, (0..6).collect()).await;
    assert_eq!(collect(&mut h).await, vec![3, 4, 5]);
}

#[tokio::test]
async fn skip_while_stops_skipping_permanently() {
    let mut h = start_op(skip_while(|n: &u64| *n < 3));
    feed_and_close(&mut h, vec![0, 1, 5, 2, 6]).await;
    assert_eq!(collect(&mut h).await, vec![5, 2, 6]);
}

// Consecutive suppression only: a value may reappear after an intervening
// one.
#[tokio::test]
async fn distinct_suppresses_consecutive_duplicates() {
    let mut h = start_op(distinct(|a: &u64, b: &u64| a == b));
    feed_and_close(&mut h, vec![1, 1, 2, 2, 2, 1, 3, 3]).await;
    assert_eq!(collect(&mut h).await, vec![1, 2, 1, 3]);
}

#[tokio::test]
async fn distinct_by_compares_extracted_keys() {
    let mut h = start_op(distinct_by(|s: &&str| s.len()));
    feed_and_close(&mut h, vec!["aa", "bb", "c", "dd"]).await;
    assert_eq!(collect(&mut h).await, vec!["aa", "c", "dd"]);
}

// =========================================================================
// Combinators
// =========================================================================

#[tokio::test]
async fn bind_chains_two_processors() {
    let mut h = start_op(map(|n: u64| n + 1).bind(map(|n: u64| n * 10)));
    feed_and_close(&mut h, vec![1, 2]).await;
    assert_eq!(collect(&mut h).await, vec![20, 30]);
}

#[tokio::test]
async fn subprocess_folds_stages_and_defaults_to_forward() {
    let mut h = start_op(subprocess(vec![
        map(|n: u64| n + 1),
        map(|n: u64| n * 2),
        filter(|n: &u64| *n > 4),
    ]));
    feed_and_close(&mut h, vec![1, 2, 3]).await;
    assert_eq!(collect(&mut h).await, vec![6, 8]);

    let mut empty = start_op(subprocess::<u64>(Vec::new()));
    feed_and_close(&mut empty, vec![9]).await;
    assert_eq!(collect(&mut empty).await, vec![9]);
}

#[tokio::test]
async fn merge_interleaves_all_sources() {
    let mut h = start_op(merge(vec![
        source_from(vec![1u64, 2, 3]),
        source_from(vec![10, 20, 30]),
    ]));
    let mut outputs = Vec::new();
    for _ in 0..6 {
        outputs.push(h.output.recv().await.unwrap());
    }
    outputs.sort_unstable();
    assert_eq!(outputs, vec![1, 2, 3, 10, 20, 30]);
    let _ = h.done.close();
}

#[tokio::test]
async fn split_multicasts_to_every_branch() {
    let (left_tx, mut left_rx) = mpsc::channel(16);
    let (right_tx, mut right_rx) = mpsc::channel(16);
    let mut h = start_op(split(vec![
        map(|n: u64| n + 1).bind(sink_into(left_tx)),
        map(|n: u64| n * 2).bind(sink_into(right_tx)),
    ]));
    feed_and_close(&mut h, vec![3, 10]).await;

    assert_eq!(left_rx.recv().await, Some(4));
    assert_eq!(left_rx.recv().await, Some(11));
    assert_eq!(right_rx.recv().await, Some(6));
    assert_eq!(right_rx.recv().await, Some(20));
    let _ = h.done.close();
}

// Strict pairing: one from each side per emission, closure ends the zip.
#[tokio::test]
async fn zip_pairs_strictly_in_order() {
    let mut h = start_op(zip(
        source_from(vec![1u64, 2, 3]),
        source_from(vec!["a", "b"]),
    ));
    assert_eq!(
        h.output.recv().await,
        Some(Pair {
            left: 1,
            right: "a"
        })
    );
    assert_eq!(
        h.output.recv().await,
        Some(Pair {
            left: 2,
            right: "b"
        })
    );
    assert_eq!(h.output.recv().await, None);
}

#[tokio::test]
async fn zip_with_applies_the_combiner() {
    let mut h = start_op(zip_with(
        source_from(vec![1u64, 2]),
        source_from(vec![10u64, 20]),
        |l, r| l + r,
    ));
    assert_eq!(h.output.recv().await, Some(11));
    assert_eq!(h.output.recv().await, Some(22));
    assert_eq!(h.output.recv().await, None);
}

// combine_latest emits on every arrival once both sides have produced.
#[tokio::test]
async fn combine_latest_tracks_both_sides() {
    let (left_tx, left_rx) = mpsc::channel(4);
    let (right_tx, right_rx) = mpsc::channel(4);
    let mut h = start_op(combine_latest(
        generate_from(left_rx),
        generate_from(right_rx),
        |l: &u64, r: &u64| l + r,
    ));

    left_tx.send(1).await.unwrap();
    right_tx.send(10).await.unwrap();
    assert_eq!(h.output.recv().await, Some(11));

    left_tx.send(2).await.unwrap();
    assert_eq!(h.output.recv().await, Some(12));

    right_tx.send(20).await.unwrap();
    assert_eq!(h.output.recv().await, Some(22));

    drop(left_tx);
    drop(right_tx);
    assert_eq!(h.output.recv().await, None);
}

// The join scenario: only predicate-passing pairs are combined.
#[tokio::test]
async fn join_combines_matching_pairs_only() {
    let mut h = start_op(join(
        source_from(vec![3i64, 5, 3, 12]),
        source_from(vec![10i64, 3, 4, 9]),
        |l, r| l > r,
        |l, r| l + r,
    ));
    assert_eq!(h.output.recv().await, Some(8));
    assert_eq!(h.output.recv().await, Some(21));
    assert_eq!(h.output.recv().await, None);
}

// =========================================================================
// Grouping
// =========================================================================

#[tokio::test]
async fn group_by_tags_messages_with_their_key() {
    let mut h = start_op(group_by(|n: &u64| n % 2));
    feed_and_close(&mut h, vec![1, 2, 3]).await;
    let groups = collect(&mut h).await;
    let tags: Vec<(u64, u64)> = groups.into_iter().map(Grouped::into_parts).collect();
    assert_eq!(tags, vec![(1, 1), (0, 2), (1, 3)]);
}

#[tokio::test]
async fn grouped_extractors_recover_key_and_message() {
    let mut h = start_op(group_by(|s: &&str| s.len()).bind(map(grouped_key)));
    feed_and_close(&mut h, vec!["a", "bb"]).await;
    assert_eq!(collect(&mut h).await, vec![1, 2]);

    let mut h = start_op(group_by(|s: &&str| s.len()).bind(map(grouped_message)));
    feed_and_close(&mut h, vec!["a", "bb"]).await;
    assert_eq!(collect(&mut h).await, vec!["a", "bb"]);
}

// =========================================================================
// Sources and sinks
// =========================================================================

#[tokio::test]
async fn generate_stops_when_the_generator_does() {
    let mut h = start_op(source_from(vec![1u64, 2, 3]));
    pump_tokens(&h);
    assert_eq!(h.output.recv().await, Some(1));
    assert_eq!(h.output.recv().await, Some(2));
    assert_eq!(h.output.recv().await, Some(3));
    assert_eq!(h.output.recv().await, None);
}

#[tokio::test]
async fn generate_from_drains_a_channel() {
    let (tx, rx) = mpsc::channel(4);
    let mut h = start_op(generate_from(rx));
    pump_tokens(&h);
    tx.send(42u64).await.unwrap();
    tx.send(96).await.unwrap();
    assert_eq!(h.output.recv().await, Some(42));
    assert_eq!(h.output.recv().await, Some(96));
    drop(tx);
    assert_eq!(h.output.recv().await, None);
}

#[tokio::test]
async fn sidechain_copies_and_forwards() {
    let (side_tx, mut side_rx) = mpsc::channel(16);
    let mut h = start_op(sidechain_to(side_tx));
    feed_and_close(&mut h, vec![1u64, 2]).await;
    assert_eq!(collect(&mut h).await, vec![1, 2]);
    assert_eq!(side_rx.recv().await, Some(1));
    assert_eq!(side_rx.recv().await, Some(2));
}

// =========================================================================
// Timing operators (paused clock)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn throttle_spaces_emissions_by_the_rate() {
    let start = Instant::now();
    let mut h = start_op(throttle::<u64>(Duration::from_millis(100)));
    feed_and_close(&mut h, vec![0, 1, 2]).await;
    assert_eq!(collect(&mut h).await, vec![0, 1, 2]);
    assert!(start.elapsed() >= Duration::from_millis(200));
}

// The debounce scenario: two bursts, one emission per quiescent gap.
#[tokio::test(start_paused = true)]
async fn debounce_emits_the_last_of_each_burst() {
    let mut h = start_op(debounce::<&str>(Duration::from_millis(50)));

    for msg in ["a", "b", "c"] {
        h.input.send(msg).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.output.recv().await, Some("c"));

    tokio::time::sleep(Duration::from_millis(100)).await;
    for msg in ["x", "y", "z"] {
        h.input.send(msg).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.output.recv().await, Some("z"));

    feed_and_close(&mut h, Vec::new()).await;
    assert_eq!(h.output.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn delay_holds_each_message() {
    let start = Instant::now();
    let mut h = start_op(delay::<u64>(Duration::from_millis(30)));
    feed_and_close(&mut h, vec![1, 2]).await;
    assert_eq!(collect(&mut h).await, vec![1, 2]);
    assert!(start.elapsed() >= Duration::from_millis(60));
}

// Sample keeps only the latest pending message per tick and flushes the
// pending one on input closure.
#[tokio::test(start_paused = true)]
async fn sample_emits_latest_and_flushes_on_close() {
    let mut h = start_op(sample::<u64>(Duration::from_millis(50)));
    h.input.send(1).await.unwrap();
    h.input.send(2).await.unwrap();
    h.input.send(3).await.unwrap();
    assert_eq!(h.output.recv().await, Some(3));

    h.input.send(4).await.unwrap();
    feed_and_close(&mut h, Vec::new()).await;
    assert_eq!(collect(&mut h).await, vec![4]);
}

// Buffer flushes on size, then on deadline, then on close.
#[tokio::test(start_paused = true)]
async fn buffer_flushes_on_size_deadline_and_close() {
    let mut h = start_op(buffer::<u64>(3, Duration::from_millis(100)));

    for n in [1, 2, 3] {
        h.input.send(n).await.unwrap();
    }
    assert_eq!(h.output.recv().await, Some(vec![1, 2, 3]));

    h.input.send(4).await.unwrap();
    assert_eq!(h.output.recv().await, Some(vec![4]));

    h.input.send(5).await.unwrap();
    h.input.send(6).await.unwrap();
    feed_and_close(&mut h, Vec::new()).await;
    assert_eq!(collect(&mut h).await, vec![vec![5, 6]]);
}

// Window ticks on the clock, suppressing empty windows.
#[tokio::test(start_paused = true)]
async fn window_batches_per_tick_and_suppresses_empties() {
    let mut h = start_op(window::<u64>(Duration::from_millis(50)));

    h.input.send(1).await.unwrap();
    h.input.send(2).await.unwrap();
    assert_eq!(h.output.recv().await, Some(vec![1, 2]));

    // A tick with nothing collected emits nothing.
    tokio::time::sleep(Duration::from_millis(120)).await;

    h.input.send(3).await.unwrap();
    feed_and_close(&mut h, Vec::new()).await;
    assert_eq!(collect(&mut h).await, vec![vec![3]]);
}

// The sliding-window scenario: size 3 over 0..=4.
#[tokio::test]
async fn sliding_window_slides_by_one() {
    let mut h = start_op(sliding_window::<u64>(3));
    feed_and_close(&mut h, vec![0, 1, 2, 3, 4]).await;
    assert_eq!(
        collect(&mut h).await,
        vec![vec![0, 1, 2], vec![1, 2, 3], vec![2, 3, 4]]
    );
}

// =========================================================================
// Retry
// =========================================================================

#[tokio::test(start_paused = true)]
async fn retry_succeeds_within_attempts() {
    let mut failures = 2;
    let mut h = start_op(retry(
        move |n: &u64| {
            if failures > 0 {
                failures -= 1;
                Err("not yet")
            } else {
                Ok(n * 10)
            }
        },
        5,
        Duration::from_millis(10),
    ));
    feed_and_close(&mut h, vec![4]).await;
    assert_eq!(collect(&mut h).await, vec![40]);
}

#[tokio::test(start_paused = true)]
async fn retry_drops_exhausted_messages() {
    let mut h = start_op(retry(
        |n: &u64| if *n == 1 { Err("always") } else { Ok(*n) },
        3,
        Duration::from_millis(1),
    ));
    feed_and_close(&mut h, vec![1, 2]).await;
    assert_eq!(collect(&mut h).await, vec![2]);
}

// =========================================================================
// Stream lifecycle
// =========================================================================

#[tokio::test]
async fn start_stop_and_double_stop() {
    let stream = Stream::with_stages(source_from(vec![1u64, 2, 3]), vec![map(|n: u64| n * 2)]);
    let running = stream.start();
    assert!(running.is_running());

    running.stop().await.unwrap();
    assert!(!running.is_running());
    assert_eq!(
        running.stop().await,
        Err(crate::error::Error::StreamNotRunning)
    );
}

// A full pipeline across two topics, matching the classic
// consume-transform-produce shape.
#[tokio::test]
async fn topic_to_topic_pipeline() {
    let input: Topic<u64> = Topic::new();
    let output: Topic<u64> = Topic::new();

    let running = Stream::new(
        topic_consumer(&input)
            .bind(filter(|n: &u64| n % 2 == 1))
            .bind(map(|n: u64| n * 10))
            .bind(topic_producer(&output)),
    )
    .start();

    let producer = input.new_producer();
    for n in 1..=6u64 {
        producer.send(n).unwrap();
    }
    producer.close();

    let mut consumer = output.new_consumer();
    assert_eq!(consumer.recv().await, Some(10));
    assert_eq!(consumer.recv().await, Some(30));
    assert_eq!(consumer.recv().await, Some(50));
    consumer.close();

    running.stop().await.unwrap();
}

// Advice raised by an operator reaches the start_with handler, and the
// handler's continuation applies default handling without tearing the
// stream down.
#[tokio::test]
async fn start_with_routes_advice_through_the_handler() {
    let table: Table<u64, i64> = Table::new(["score"]).unwrap();
    let set = table.setter(["score"]).unwrap();
    set.set(2, vec![20]).unwrap();

    let lookup = table_lookup(&table, "score", |n: &u64| *n).unwrap();
    let stream = Stream::new(source_from(vec![1u64, 2]).bind(lookup));

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<String>();
    let running = stream.start_with(move |advice, next| {
        let Advice::Error(err) = &advice;
        seen_tx.send(err.to_string()).unwrap();
        next(advice);
    });

    let notice = seen_rx.recv().await.unwrap();
    assert!(notice.contains("key not found in table"));
    running.stop().await.unwrap();
}

// =========================================================================
// Table operators
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
struct Event {
    user: String,
    value: i64,
}

fn events() -> Vec<Event> {
    vec![
        Event {
            user: "alice".into(),
            value: 3,
        },
        Event {
            user: "bob".into(),
            value: 5,
        },
        Event {
            user: "alice".into(),
            value: 4,
        },
    ]
}

#[tokio::test]
async fn table_updater_materializes_messages() {
    let table: Table<String, i64> = Table::new(["value"]).unwrap();
    let updater = Updater::new(
        &table,
        |e: &Event| e.user.clone(),
        vec![Column::new("value", |e: &Event| e.value)],
    )
    .unwrap();

    let mut h = start_op(table_updater(updater));
    feed_and_close(&mut h, events()).await;
    assert_eq!(collect(&mut h).await.len(), 3);

    let get = table.getter(["value"]).unwrap();
    assert_eq!(get.get(&"alice".into()).unwrap(), vec![4]);
    assert_eq!(get.get(&"bob".into()).unwrap(), vec![5]);
}

#[tokio::test]
async fn table_lookup_reports_misses_and_continues() {
    let table: Table<u64, i64> = Table::new(["score"]).unwrap();
    let set = table.setter(["score"]).unwrap();
    set.set(1, vec![10]).unwrap();
    set.set(3, vec![30]).unwrap();

    let mut h = start_op(table_lookup(&table, "score", |n: &u64| *n).unwrap());
    feed_and_close(&mut h, vec![1, 2, 3]).await;
    assert_eq!(collect(&mut h).await, vec![10, 30]);

    let advice = h.advice.recv().await.unwrap();
    let Advice::Error(err) = advice;
    assert!(err.to_string().contains("key not found in table"));
}

#[tokio::test]
async fn table_scan_emits_each_found_key() {
    let table: Table<u64, i64> = Table::new(["score"]).unwrap();
    let set = table.setter(["score"]).unwrap();
    set.set(1, vec![10]).unwrap();
    set.set(2, vec![20]).unwrap();

    let mut h = start_op(table_scan(&table, "score", |n: &u64| vec![*n, *n + 1]).unwrap());
    feed_and_close(&mut h, vec![1]).await;
    assert_eq!(collect(&mut h).await, vec![10, 20]);
}

#[tokio::test]
async fn table_batch_update_writes_whole_batches() {
    let table: Table<String, i64> = Table::new(["value"]).unwrap();
    let updater = Updater::new(
        &table,
        |e: &Event| e.user.clone(),
        vec![Column::new("value", |e: &Event| e.value)],
    )
    .unwrap();

    let mut h = start_op(table_batch_update(updater));
    feed_and_close(&mut h, vec![events()]).await;
    assert_eq!(collect(&mut h).await.len(), 1);
    assert_eq!(table.count(), 2);
}

#[tokio::test]
async fn table_aggregate_materializes_running_state() {
    let table: Table<String, i64> = Table::new(["total"]).unwrap();
    let setter = table.setter(["total"]).unwrap();

    let mut h = start_op(table_aggregate(
        0i64,
        |acc, e: Event| acc + e.value,
        |total| ("sum".to_owned(), vec![*total]),
        setter,
    ));
    feed_and_close(&mut h, events()).await;
    assert_eq!(collect(&mut h).await, vec![3, 8, 12]);

    let get = table.getter(["total"]).unwrap();
    assert_eq!(get.get(&"sum".into()).unwrap(), vec![12]);
}

#[tokio::test]
async fn table_filter_forwards_only_known_keys() {
    let table: Table<String, i64> = Table::new(["value"]).unwrap();
    let set = table.setter(["value"]).unwrap();
    set.set("alice".into(), vec![1]).unwrap();

    let mut h = start_op(table_filter(&table, |e: &Event| e.user.clone()));
    feed_and_close(&mut h, events()).await;
    let passed = collect(&mut h).await;
    assert_eq!(passed.len(), 2);
    assert!(passed.iter().all(|e| e.user == "alice"));
}

#[tokio::test]
async fn table_join_enriches_messages() {
    let table: Table<String, i64> = Table::new(["bonus"]).unwrap();
    let set = table.setter(["bonus"]).unwrap();
    set.set("alice".into(), vec![100]).unwrap();
    set.set("bob".into(), vec![200]).unwrap();

    let mut h = start_op(
        table_join(
            &table,
            ["bonus"],
            |e: &Event| e.user.clone(),
            |e, values| e.value + values[0],
        )
        .unwrap(),
    );
    feed_and_close(&mut h, events()).await;
    assert_eq!(collect(&mut h).await, vec![103, 205, 104]);
}

#[tokio::test]
async fn table_delete_removes_rows_and_reports_misses() {
    let table: Table<u64, i64> = Table::new(["v"]).unwrap();
    let set = table.setter(["v"]).unwrap();
    set.set(1, vec![1]).unwrap();

    let mut h = start_op(table_delete(&table, |n: &u64| *n));
    feed_and_close(&mut h, vec![1, 2]).await;
    assert_eq!(collect(&mut h).await, vec![1, 2]);
    assert_eq!(table.count(), 0);

    let Advice::Error(err) = h.advice.recv().await.unwrap();
    assert!(
        err.to_string()
            .contains("cannot delete key not found in table")
    );
}

#[tokio::test]
async fn table_watch_emits_rows_for_updated_keys() {
    let table: Table<u64, i64> = Table::new(["a", "b"]).unwrap();
    let set = table.setter(["a", "b"]).unwrap();
    set.set(7, vec![70, 71]).unwrap();

    let (update_tx, update_rx) = mpsc::channel(4);
    let mut h = start_op(table_watch(&table, update_rx, ["b", "a"]).unwrap());

    update_tx.send(7).await.unwrap();
    assert_eq!(h.output.recv().await, Some(vec![71, 70]));

    // Unknown keys are skipped.
    update_tx.send(8).await.unwrap();
    drop(update_tx);
    assert_eq!(h.output.recv().await, None);
}

// =========================================================================
// Protocol diagnostics
// =========================================================================

// A start function that blocks inline (instead of arranging its work on a
// task) trips the late-return diagnostic.
#[tokio::test]
async fn blocking_start_function_is_reported_late() {
    let _guard = crate::diag::test_lock();
    crate::diag::enable();
    let mut diagnostics = crate::diag::subscribe();

    let rogue: Processor<u64, u64> = Processor::new(|_ctx| {
        std::thread::sleep(Duration::from_millis(10));
    });
    let _h = start_op(rogue);

    loop {
        let err = diagnostics.recv().await.unwrap();
        if err == crate::error::Error::ProcessorReturnedLate {
            break;
        }
    }
    crate::diag::disable();
}
