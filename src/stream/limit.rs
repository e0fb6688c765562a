// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Prefix/suffix and duplicate-suppression operators.

use super::processor::Processor;

/// Forwards only the first `n` messages.
#[must_use]
pub fn take<Msg>(n: usize) -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
{
    let mut count = 0usize;
    take_while(move |_| {
        if count < n {
            count += 1;
            true
        } else {
            false
        }
    })
}

/// Forwards messages until `pred` returns `false`, then stops.
#[must_use]
pub fn take_while<Msg>(mut pred: impl FnMut(&Msg) -> bool + Send + 'static) -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
{
    Processor::spawn(move |mut ctx| async move {
        while let Some(msg) = ctx.fetch_message().await {
            if !pred(&msg) || !ctx.forward_result(msg).await {
                return;
            }
        }
    })
}

/// Skips the first `n` messages.
#[must_use]
pub fn skip<Msg>(n: usize) -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
{
    let mut count = 0usize;
    skip_while(move |_| {
        if count < n {
            count += 1;
            true
        } else {
            false
        }
    })
}

/// Skips messages while `pred` returns `true`; once it first returns
/// `false`, everything is forwarded.
#[must_use]
pub fn skip_while<Msg>(mut pred: impl FnMut(&Msg) -> bool + Send + 'static) -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
{
    Processor::spawn(move |mut ctx| async move {
        let mut skipping = true;
        while let Some(msg) = ctx.fetch_message().await {
            if skipping && pred(&msg) {
                continue;
            }
            skipping = false;
            if !ctx.forward_result(msg).await {
                return;
            }
        }
    })
}

/// Suppresses *consecutive* duplicates under `eq`. This is not a global
/// dedup: a value may reappear once another value has intervened.
#[must_use]
pub fn distinct<Msg>(mut eq: impl FnMut(&Msg, &Msg) -> bool + Send + 'static) -> Processor<Msg, Msg>
where
    Msg: Clone + Send + 'static,
{
    Processor::spawn(move |mut ctx| async move {
        let mut last: Option<Msg> = None;
        while let Some(msg) = ctx.fetch_message().await {
            if let Some(previous) = &last {
                if eq(previous, &msg) {
                    continue;
                }
            }
            last = Some(msg.clone());
            if !ctx.forward_result(msg).await {
                return;
            }
        }
    })
}

/// Suppresses consecutive duplicates by comparing extracted keys.
#[must_use]
pub fn distinct_by<Msg, Key>(
    mut key: impl FnMut(&Msg) -> Key + Send + 'static,
) -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
    Key: PartialEq + Send + 'static,
{
    Processor::spawn(move |mut ctx| async move {
        let mut last: Option<Key> = None;
        while let Some(msg) = ctx.fetch_message().await {
            let current = key(&msg);
            if last.as_ref() == Some(&current) {
                continue;
            }
            last = Some(current);
            if !ctx.forward_result(msg).await {
                return;
            }
        }
    })
}
