// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Schema-bound writers from messages to table rows.
//!
//! An updater is prepared once from a key selector and a set of
//! [`Column`] bindings; `update` then extracts the key and every bound
//! column value from a message and writes them through a prepared setter in
//! one call. Column validation happens at construction, not per message.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use super::column::Column;
use super::table::{Setter, Table};
use crate::error::Error;

/// A prepared, schema-bound writer from messages to rows of a [`Table`].
pub struct Updater<Msg, K, V> {
    key: Arc<dyn Fn(&Msg) -> K + Send + Sync>,
    columns: Vec<Column<Msg, V>>,
    setter: Setter<K, V>,
}

impl<Msg, K, V> Clone for Updater<Msg, K, V> {
    fn clone(&self) -> Self {
        Self {
            key: Arc::clone(&self.key),
            columns: self.columns.clone(),
            setter: self.setter.clone(),
        }
    }
}

impl<Msg, K, V> Debug for Updater<Msg, K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Default + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("columns", &self.columns.len())
            .field("setter", &self.setter)
            .finish_non_exhaustive()
    }
}

impl<Msg, K, V> Updater<Msg, K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Default,
{
    /// Prepares an updater against `table`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] or [`Error::DuplicateColumn`] when
    /// the bindings do not match the table's schema.
    pub fn new(
        table: &Table<K, V>,
        key: impl Fn(&Msg) -> K + Send + Sync + 'static,
        columns: Vec<Column<Msg, V>>,
    ) -> Result<Self, Error> {
        let setter = table.setter(columns.iter().map(Column::name))?;
        Ok(Self {
            key: Arc::new(key),
            columns,
            setter,
        })
    }

    /// Writes one message's key and column values into the table.
    ///
    /// # Errors
    ///
    /// Propagates setter failures.
    pub fn update(&self, msg: &Msg) -> Result<(), Error> {
        let key = (self.key)(msg);
        let values = self
            .columns
            .iter()
            .map(|column| column.select(msg))
            .collect();
        self.setter.set(key, values)
    }
}
