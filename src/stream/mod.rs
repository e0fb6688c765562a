// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Streams: composable graphs of processors connected by typed edges, with
//! a start/stop lifecycle and a sideband advice channel.

mod aggregate;
mod combine;
mod context;
mod generate;
mod group;
mod limit;
mod processor;
mod retry;
#[allow(clippy::module_inception)] // stream/stream.rs holds the lifecycle types.
mod stream;
mod table;
mod timing;
mod topic;
mod transform;
mod window;

#[cfg(test)]
mod tests;

pub use aggregate::{reduce, reduce_from, scan, scan_from};
pub use combine::{Pair, bind, combine_latest, join, merge, split, subprocess, zip, zip_with};
pub use context::{Advice, Context, Sink, Source};
pub use generate::{generate, generate_from, sidechain_to, sink_into};
pub use group::{Grouped, group_by, grouped_key, grouped_message};
pub use limit::{distinct, distinct_by, skip, skip_while, take, take_while};
pub use processor::{Processor, forward};
pub use retry::retry;
pub use stream::{Running, Stream};
pub use table::{
    table_aggregate, table_batch_update, table_delete, table_filter, table_join, table_lookup,
    table_scan, table_updater, table_watch,
};
pub use timing::{debounce, delay, sample, throttle};
pub use topic::{topic_consumer, topic_producer};
pub use transform::{filter, flat_map, for_each, map};
pub use window::{buffer, sliding_window, window};
