// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Low-level synchronization primitives shared by the topic and stream
//! subsystems.

mod closer;
mod ready;
mod seal;

pub use closer::Closer;
pub use ready::ReadyWait;
pub use seal::{Hold, SealableMutex};
