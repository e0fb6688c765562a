// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Key-tagging for downstream grouping.

use super::processor::Processor;
use super::transform::map;

/// A message tagged with the key extracted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grouped<Msg, Key> {
    key: Key,
    message: Msg,
}

impl<Msg, Key> Grouped<Msg, Key> {
    /// The extracted key.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// The original message.
    pub fn message(&self) -> &Msg {
        &self.message
    }

    /// Unwraps back into the original message.
    pub fn into_message(self) -> Msg {
        self.message
    }

    /// Splits into key and message.
    pub fn into_parts(self) -> (Key, Msg) {
        (self.key, self.message)
    }
}

/// Wraps each message in a [`Grouped`] tagged with `key(msg)`.
#[must_use]
pub fn group_by<Msg, Key>(
    mut key: impl FnMut(&Msg) -> Key + Send + 'static,
) -> Processor<Msg, Grouped<Msg, Key>>
where
    Msg: Send + 'static,
    Key: Send + 'static,
{
    map(move |message: Msg| {
        let key = key(&message);
        Grouped { key, message }
    })
}

/// Extracts the key from a [`Grouped`]; shaped for use with
/// [`map`](super::map).
pub fn grouped_key<Msg, Key>(grouped: Grouped<Msg, Key>) -> Key {
    grouped.key
}

/// Extracts the original message from a [`Grouped`]; shaped for use with
/// [`map`](super::map).
pub fn grouped_message<Msg, Key>(grouped: Grouped<Msg, Key>) -> Msg {
    grouped.message
}
