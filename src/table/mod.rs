// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Tables: concurrent keyed row stores with named, typed columns addressed
//! through prepared getters and setters.

mod column;
#[allow(clippy::module_inception)] // table/table.rs holds the row-store internals.
mod table;
mod updater;

pub use column::Column;
pub use table::{ColumnName, Getter, Setter, Table};
pub use updater::Updater;
