// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! In-process reactive messaging: topics, streams, and tables.
//!
//! Three cooperating abstractions for building message-oriented pipelines
//! inside one process:
//!
//! - **[`Topic`]** -- a multi-producer, multi-consumer append-only log.
//!   Each consumer tracks an independent cursor, so every consumer observes
//!   the full retained sequence in order. Storage is reclaimed segment by
//!   segment under a pluggable retention policy (permanent, consumed,
//!   counted, timed) by a background vacuum task.
//! - **[`Stream`]** -- a composable graph of [`stream::Processor`] stages
//!   connected by typed channel edges, with combinators (bind, merge,
//!   split, zip, join), stateful operators (fold, limit, window, timing,
//!   retry), and a supervisor-style advice channel for per-message errors.
//! - **[`Table`]** -- a concurrent row store keyed by a comparable key with
//!   named typed columns, addressed through prepared getters/setters and
//!   message-schema-bound updaters.
//!
//! # Architecture
//!
//! ```text
//! Producer ──▶ ┌───────────────────────────┐ ──▶ Consumer
//! Producer ──▶ │ Topic (segmented log)     │ ──▶ Consumer
//!              │   cursors · vacuum · …    │
//!              └───────────────────────────┘
//!                     │ topic_consumer              │ topic_producer
//!                     ▼                             │
//!              ┌────────────────────────────────────┴───┐
//!              │ Stream: source ─▶ map ─▶ window ─▶ sink │
//!              │   done ──── broadcast cancellation      │
//!              │   advice ── sideband error channel      │
//!              └──────────────┬──────────────────────────┘
//!                             │ table_updater / table_join
//!                             ▼
//!              ┌───────────────────────────┐
//!              │ Table (keyed row store)   │
//!              └───────────────────────────┘
//! ```
//!
//! # Delivery contract
//!
//! Per-producer FIFO in, per-consumer FIFO out; no ordering across
//! producers or across consumers. Delivery is at-most-once per cursor with
//! no durability -- everything lives and dies with the process.
//!
//! All construction entry points expect a running Tokio runtime.

pub mod diag;
mod error;
pub mod stream;
pub mod sync;
pub mod table;
pub mod topic;

pub use error::{DynError, Error};
pub use stream::Stream;
pub use table::Table;
pub use topic::Topic;
