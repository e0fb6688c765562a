// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! The row store.
//!
//! A table maps a comparable key to one slot per declared column. Column
//! positions are fixed at construction; getters and setters are *prepared*
//! against a table, binding their column-index projection once so the
//! per-row work is a plain indexed copy under the row lock.
//!
//! One `RwLock` guards the row map. Accessors hold it only for the indexed
//! copy -- never across user code.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Error;

/// The name of a table column.
pub type ColumnName = String;

#[derive(Debug)]
struct TableInner<K, V> {
    names: Vec<ColumnName>,
    indexes: HashMap<ColumnName, usize>,
    rows: RwLock<HashMap<K, Vec<V>>>,
}

/// A concurrent row store keyed by `K` with one `V` slot per column.
///
/// Cheaply cloneable; all clones share the same rows.
#[derive(Debug)]
pub struct Table<K, V> {
    inner: Arc<TableInner<K, V>>,
}

impl<K, V> Clone for Table<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Table<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    /// Creates a table with the given column names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateColumn`] when a name repeats.
    pub fn new<I, N>(columns: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = N>,
        N: Into<ColumnName>,
    {
        let names: Vec<ColumnName> = columns.into_iter().map(Into::into).collect();
        let mut indexes = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            if indexes.insert(name.clone(), index).is_some() {
                return Err(Error::DuplicateColumn { name: name.clone() });
            }
        }
        Ok(Self {
            inner: Arc::new(TableInner {
                names,
                indexes,
                rows: RwLock::new(HashMap::new()),
            }),
        })
    }

    /// The column names, in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnName] {
        &self.inner.names
    }

    /// Prepares a getter projecting the given columns, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] for an undeclared column.
    pub fn getter<I, N>(&self, columns: I) -> Result<Getter<K, V>, Error>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        Ok(Getter {
            inner: Arc::clone(&self.inner),
            indexes: self.column_indexes(columns)?,
        })
    }

    /// Prepares a setter writing the given columns, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] for an undeclared column and
    /// [`Error::DuplicateColumn`] when a target column repeats.
    pub fn setter<I, N>(&self, columns: I) -> Result<Setter<K, V>, Error>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let indexes = self.column_indexes(columns)?;
        let mut seen = vec![false; self.inner.names.len()];
        for &index in &indexes {
            if seen[index] {
                return Err(Error::DuplicateColumn {
                    name: self.inner.names[index].clone(),
                });
            }
            seen[index] = true;
        }
        Ok(Setter {
            inner: Arc::clone(&self.inner),
            indexes,
        })
    }

    fn column_indexes<I, N>(&self, columns: I) -> Result<Vec<usize>, Error>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        columns
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                self.inner
                    .indexes
                    .get(name)
                    .copied()
                    .ok_or_else(|| Error::ColumnNotFound {
                        name: name.to_owned(),
                    })
            })
            .collect()
    }

    /// Removes a row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeleteKeyNotFound`] when no row exists for `key`.
    pub fn delete(&self, key: &K) -> Result<(), Error> {
        let mut rows = self.inner.rows.write();
        if rows.remove(key).is_none() {
            return Err(Error::DeleteKeyNotFound {
                key: format!("{key:?}"),
            });
        }
        Ok(())
    }

    /// All keys currently in the table, in no particular order.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.inner.rows.read().keys().cloned().collect()
    }

    /// Number of rows.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.rows.read().len()
    }

    /// Whether a row exists for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.rows.read().contains_key(key)
    }

    /// Visits every row. Returning `false` from the visitor stops the walk.
    /// Rows are copied out before the visitor runs, so the row lock is
    /// never held across user code.
    pub fn for_each_row(&self, mut visit: impl FnMut(&K, &[V]) -> bool) {
        let snapshot: Vec<(K, Vec<V>)> = {
            let rows = self.inner.rows.read();
            rows.iter()
                .map(|(key, row)| (key.clone(), row.clone()))
                .collect()
        };
        for (key, row) in &snapshot {
            if !visit(key, row) {
                return;
            }
        }
    }
}

/// A prepared read of a fixed column projection.
#[derive(Debug)]
pub struct Getter<K, V> {
    inner: Arc<TableInner<K, V>>,
    indexes: Vec<usize>,
}

impl<K, V> Clone for Getter<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            indexes: self.indexes.clone(),
        }
    }
}

impl<K, V> Getter<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    /// Reads the bound columns of the row at `key`, in preparation order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] when no row exists.
    pub fn get(&self, key: &K) -> Result<Vec<V>, Error> {
        let rows = self.inner.rows.read();
        let row = rows.get(key).ok_or_else(|| Error::KeyNotFound {
            key: format!("{key:?}"),
        })?;
        Ok(self.indexes.iter().map(|&index| row[index].clone()).collect())
    }
}

/// A prepared write of a fixed column projection. The first write for a key
/// creates its row; unbound columns keep their previous values.
#[derive(Debug)]
pub struct Setter<K, V> {
    inner: Arc<TableInner<K, V>>,
    indexes: Vec<usize>,
}

impl<K, V> Clone for Setter<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            indexes: self.indexes.clone(),
        }
    }
}

impl<K, V> Setter<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Default,
{
    /// Writes `values` into the bound columns of the row at `key`, creating
    /// the row on first write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueCount`] unless exactly one value per bound
    /// column is supplied.
    pub fn set(&self, key: K, values: Vec<V>) -> Result<(), Error> {
        if values.len() != self.indexes.len() {
            return Err(Error::ValueCount {
                expected: self.indexes.len(),
                got: values.len(),
            });
        }
        let mut rows = self.inner.rows.write();
        let row = rows
            .entry(key)
            .or_insert_with(|| vec![V::default(); self.inner.names.len()]);
        for (&index, value) in self.indexes.iter().zip(values) {
            row[index] = value;
        }
        Ok(())
    }
}
