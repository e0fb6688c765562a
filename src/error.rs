// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Crate-wide error type.
//!
//! One enum covers the three error families of the library:
//!
//! - **Construction errors** (duplicate/unknown columns, conflicting topic
//!   options) surface synchronously from constructors and builders.
//! - **Operational per-message errors** (key misses, value-count mismatches)
//!   travel through the stream advice channel and never tear a pipeline down
//!   on their own.
//! - **Protocol diagnostics** (unclosed producers/consumers, late processor
//!   start returns) are best-effort hygiene signals published to the debug
//!   sink when it is enabled.

/// A type-erased error suitable for the stream advice channel.
pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by topics, streams, and tables.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A table lookup addressed a key with no row.
    #[error("key not found in table: {key}")]
    KeyNotFound {
        /// Rendered form of the missing key.
        key: String,
    },
    /// A table delete addressed a key with no row.
    #[error("cannot delete key not found in table: {key}")]
    DeleteKeyNotFound {
        /// Rendered form of the missing key.
        key: String,
    },
    /// A prepared accessor referenced a column the table does not define.
    #[error("column not found in table: {name}")]
    ColumnNotFound {
        /// The unknown column name.
        name: String,
    },
    /// A column name appeared more than once in a definition list.
    #[error("column name duplicated in table: {name}")]
    DuplicateColumn {
        /// The repeated column name.
        name: String,
    },
    /// A setter was invoked with the wrong number of values.
    #[error("{expected} values are required, you provided {got}")]
    ValueCount {
        /// Number of values the prepared setter binds.
        expected: usize,
        /// Number of values actually supplied.
        got: usize,
    },
    /// A receive was attempted against a closed consumer.
    #[error("receiver closed")]
    ReceiverClosed,
    /// A send was attempted against a closed producer.
    #[error("sender closed")]
    SenderClosed,
    /// A producer was dropped without being closed first.
    #[error("producer not closed: {id}")]
    ProducerNotClosed {
        /// Identifier of the offending producer.
        id: u64,
    },
    /// A consumer was dropped without being closed first.
    #[error("consumer not closed: {id}")]
    ConsumerNotClosed {
        /// Identifier of the offending consumer.
        id: u64,
    },
    /// More than one retention policy was supplied to a topic builder.
    #[error("retention policy already set")]
    RetentionPolicySet,
    /// More than one backoff generator was supplied to a topic builder.
    #[error("backoff generator already set")]
    BackoffGeneratorSet,
    /// `stop` was called on a stream that is not running.
    #[error("stream is not running")]
    StreamNotRunning,
    /// A processor start function performed blocking work instead of
    /// arranging it on its own task.
    #[error("processor start returned late")]
    ProcessorReturnedLate,
}
