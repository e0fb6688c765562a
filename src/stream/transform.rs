// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Element-wise operators: filter, map, flat-map, and side effects.

use super::processor::Processor;

/// Forwards only the messages for which `pred` returns `true`.
#[must_use]
pub fn filter<Msg>(mut pred: impl FnMut(&Msg) -> bool + Send + 'static) -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
{
    Processor::spawn(move |mut ctx| async move {
        while let Some(msg) = ctx.fetch_message().await {
            if !pred(&msg) {
                continue;
            }
            if !ctx.forward_result(msg).await {
                return;
            }
        }
    })
}

/// Transforms each message with `f` and forwards the result.
#[must_use]
pub fn map<From, To>(mut f: impl FnMut(From) -> To + Send + 'static) -> Processor<From, To>
where
    From: Send + 'static,
    To: Send + 'static,
{
    Processor::spawn(move |mut ctx| async move {
        while let Some(msg) = ctx.fetch_message().await {
            if !ctx.forward_result(f(msg)).await {
                return;
            }
        }
    })
}

/// Maps each message to zero or more messages, forwarding them in order.
#[must_use]
pub fn flat_map<From, To>(
    mut f: impl FnMut(From) -> Vec<To> + Send + 'static,
) -> Processor<From, To>
where
    From: Send + 'static,
    To: Send + 'static,
{
    Processor::spawn(move |mut ctx| async move {
        while let Some(msg) = ctx.fetch_message().await {
            for result in f(msg) {
                if !ctx.forward_result(result).await {
                    return;
                }
            }
        }
    })
}

/// Runs `action` on each message, then forwards it unchanged.
#[must_use]
pub fn for_each<Msg>(mut action: impl FnMut(&Msg) + Send + 'static) -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
{
    Processor::spawn(move |mut ctx| async move {
        while let Some(msg) = ctx.fetch_message().await {
            action(&msg);
            if !ctx.forward_result(msg).await {
                return;
            }
        }
    })
}
