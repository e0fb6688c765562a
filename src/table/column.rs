// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Message-to-column bindings used by updaters.

use std::sync::Arc;

use super::table::ColumnName;

/// Binds a column name to a selector that extracts the column's value from
/// a message.
pub struct Column<Msg, V> {
    name: ColumnName,
    select: Arc<dyn Fn(&Msg) -> V + Send + Sync>,
}

impl<Msg, V> Clone for Column<Msg, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            select: Arc::clone(&self.select),
        }
    }
}

impl<Msg, V> Column<Msg, V> {
    /// Creates a column binding.
    pub fn new(
        name: impl Into<ColumnName>,
        select: impl Fn(&Msg) -> V + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            select: Arc::new(select),
        }
    }

    /// The bound column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extracts this column's value from a message.
    pub fn select(&self, msg: &Msg) -> V {
        (self.select)(msg)
    }
}
