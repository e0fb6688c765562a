// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Table-facing processors.
//!
//! Construction validates requested columns against the table's schema and
//! fails synchronously; per-message failures (key misses, setter errors)
//! are published on the advice channel, and the processor continues for as
//! long as the channel accepts them.

use std::fmt::Debug;
use std::hash::Hash;

use tokio::sync::mpsc;

use super::context::{Context, Source};
use super::processor::Processor;
use crate::error::Error;
use crate::table::{ColumnName, Setter, Table, Updater};

/// Looks up one column by the key extracted from each message, forwarding
/// the found value. Key misses are reported as advice and skipped.
///
/// # Errors
///
/// Returns [`Error::ColumnNotFound`] for an undeclared column.
pub fn table_lookup<Msg, K, V>(
    table: &Table<K, V>,
    column: impl Into<ColumnName>,
    mut key: impl FnMut(&Msg) -> K + Send + 'static,
) -> Result<Processor<Msg, V>, Error>
where
    Msg: Send + 'static,
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let get = table.getter([column.into()])?;
    Ok(Processor::spawn(move |mut ctx: Context<Msg, V>| async move {
        while let Some(msg) = ctx.fetch_message().await {
            match get.get(&key(&msg)) {
                Ok(mut values) => {
                    let value = values.remove(0);
                    if !ctx.forward_result(value).await {
                        return;
                    }
                }
                Err(err) => {
                    if !ctx.report_error(err).await {
                        return;
                    }
                }
            }
        }
    }))
}

/// Looks up one column for every key extracted from each message, emitting
/// each found value. Key misses are reported as advice and skipped.
///
/// # Errors
///
/// Returns [`Error::ColumnNotFound`] for an undeclared column.
pub fn table_scan<Msg, K, V>(
    table: &Table<K, V>,
    column: impl Into<ColumnName>,
    mut keys: impl FnMut(&Msg) -> Vec<K> + Send + 'static,
) -> Result<Processor<Msg, V>, Error>
where
    Msg: Send + 'static,
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let get = table.getter([column.into()])?;
    Ok(Processor::spawn(move |mut ctx: Context<Msg, V>| async move {
        while let Some(msg) = ctx.fetch_message().await {
            for key in keys(&msg) {
                match get.get(&key) {
                    Ok(mut values) => {
                        let value = values.remove(0);
                        if !ctx.forward_result(value).await {
                            return;
                        }
                    }
                    Err(err) => {
                        if !ctx.report_error(err).await {
                            return;
                        }
                    }
                }
            }
        }
    }))
}

/// Writes every message through the prepared updater, then forwards it.
/// Update failures are reported as advice.
#[must_use]
pub fn table_updater<Msg, K, V>(updater: Updater<Msg, K, V>) -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Default + Send + Sync + 'static,
{
    Processor::spawn(move |mut ctx: Context<Msg, Msg>| async move {
        while let Some(msg) = ctx.fetch_message().await {
            if let Err(err) = updater.update(&msg) {
                if !ctx.report_error(err).await {
                    return;
                }
                continue;
            }
            if !ctx.forward_result(msg).await {
                return;
            }
        }
    })
}

/// Writes each message of every batch through the prepared updater, then
/// forwards the batch. Per-message failures are reported as advice without
/// dropping the batch.
#[must_use]
pub fn table_batch_update<Msg, K, V>(updater: Updater<Msg, K, V>) -> Processor<Vec<Msg>, Vec<Msg>>
where
    Msg: Send + 'static,
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Default + Send + Sync + 'static,
{
    Processor::spawn(move |mut ctx: Context<Vec<Msg>, Vec<Msg>>| async move {
        while let Some(batch) = ctx.fetch_message().await {
            for i in 0..batch.len() {
                if let Err(err) = updater.update(&batch[i]) {
                    if !ctx.report_error(err).await {
                        return;
                    }
                }
            }
            if !ctx.forward_result(batch).await {
                return;
            }
        }
    })
}

/// Maintains a running aggregate, materializing each state into a table
/// row and forwarding it. Setter failures are reported as advice.
#[must_use]
pub fn table_aggregate<Msg, Agg, K, V>(
    init: Agg,
    mut fold: impl FnMut(Agg, Msg) -> Agg + Send + 'static,
    mut to_row: impl FnMut(&Agg) -> (K, Vec<V>) + Send + 'static,
    setter: Setter<K, V>,
) -> Processor<Msg, Agg>
where
    Msg: Send + 'static,
    Agg: Clone + Send + 'static,
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Default + Send + Sync + 'static,
{
    Processor::spawn(move |mut ctx: Context<Msg, Agg>| async move {
        let mut agg = init;
        while let Some(msg) = ctx.fetch_message().await {
            agg = fold(agg.clone(), msg);
            let (key, values) = to_row(&agg);
            if let Err(err) = setter.set(key, values) {
                if !ctx.report_error(err).await {
                    return;
                }
            }
            if !ctx.forward_result(agg.clone()).await {
                return;
            }
        }
    })
}

/// Forwards only the messages whose extracted key has a row in the table.
#[must_use]
pub fn table_filter<Msg, K, V>(
    table: &Table<K, V>,
    mut key: impl FnMut(&Msg) -> K + Send + 'static,
) -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let table = table.clone();
    Processor::spawn(move |mut ctx: Context<Msg, Msg>| async move {
        while let Some(msg) = ctx.fetch_message().await {
            if !table.contains_key(&key(&msg)) {
                continue;
            }
            if !ctx.forward_result(msg).await {
                return;
            }
        }
    })
}

/// Enriches each message with a projection of its row, combining the two
/// through `join`. Key misses are reported as advice and skipped.
///
/// # Errors
///
/// Returns [`Error::ColumnNotFound`] for an undeclared column.
pub fn table_join<Msg, K, V, Out>(
    table: &Table<K, V>,
    columns: impl IntoIterator<Item: Into<ColumnName>>,
    mut key: impl FnMut(&Msg) -> K + Send + 'static,
    mut join: impl FnMut(Msg, Vec<V>) -> Out + Send + 'static,
) -> Result<Processor<Msg, Out>, Error>
where
    Msg: Send + 'static,
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    Out: Send + 'static,
{
    let get = table.getter(columns.into_iter().map(Into::into).collect::<Vec<_>>())?;
    Ok(Processor::spawn(
        move |mut ctx: Context<Msg, Out>| async move {
            while let Some(msg) = ctx.fetch_message().await {
                match get.get(&key(&msg)) {
                    Ok(values) => {
                        let joined = join(msg, values);
                        if !ctx.forward_result(joined).await {
                            return;
                        }
                    }
                    Err(err) => {
                        if !ctx.report_error(err).await {
                            return;
                        }
                    }
                }
            }
        },
    ))
}

/// Deletes the row addressed by each message's key, then forwards the
/// message. Missing keys are reported as advice.
#[must_use]
pub fn table_delete<Msg, K, V>(
    table: &Table<K, V>,
    mut key: impl FnMut(&Msg) -> K + Send + 'static,
) -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let table = table.clone();
    Processor::spawn(move |mut ctx: Context<Msg, Msg>| async move {
        while let Some(msg) = ctx.fetch_message().await {
            if let Err(err) = table.delete(&key(&msg)) {
                if !ctx.report_error(err).await {
                    return;
                }
            }
            if !ctx.forward_result(msg).await {
                return;
            }
        }
    })
}

/// Sources row projections from an update-key channel: each key received
/// on `updates` is looked up and the projected values emitted. Keys with
/// no row are silently skipped.
///
/// # Errors
///
/// Returns [`Error::ColumnNotFound`] for an undeclared column.
pub fn table_watch<K, V>(
    table: &Table<K, V>,
    mut updates: mpsc::Receiver<K>,
    columns: impl IntoIterator<Item: Into<ColumnName>>,
) -> Result<Processor<Source, Vec<V>>, Error>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let get = table.getter(columns.into_iter().map(Into::into).collect::<Vec<_>>())?;
    Ok(Processor::spawn(
        move |mut ctx: Context<Source, Vec<V>>| async move {
            loop {
                let key = tokio::select! {
                    _ = ctx.done().closed() => return,
                    key = updates.recv() => match key {
                        Some(key) => key,
                        None => return,
                    },
                };
                if let Ok(values) = get.get(&key) {
                    if !ctx.forward_result(values).await {
                        return;
                    }
                }
            }
        },
    ))
}
