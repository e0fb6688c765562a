// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Folding operators.
//!
//! The four variants share one loop and differ only in how the accumulator
//! is seeded:
//!
//! - [`reduce`] folds the zero value with the *first* input before the
//!   emitting loop begins, so its first emission covers two inputs.
//! - [`reduce_from`] and [`scan_from`] seed with a caller value.
//! - [`scan`] seeds with the zero value directly, emitting after every
//!   input including the first.

use super::context::Context;
use super::processor::Processor;

/// Folds messages with `f`, seeded by the first message folded into the
/// zero value. Emits the running fold from the second input onward.
#[must_use]
pub fn reduce<In, Out>(mut f: impl FnMut(Out, In) -> Out + Send + 'static) -> Processor<In, Out>
where
    In: Send + 'static,
    Out: Clone + Default + Send + 'static,
{
    Processor::spawn(move |mut ctx| async move {
        let Some(first) = ctx.fetch_message().await else {
            return;
        };
        let seed = f(Out::default(), first);
        fold_loop(ctx, seed, f).await;
    })
}

/// Folds messages with `f` from an explicit seed, emitting after every
/// input.
#[must_use]
pub fn reduce_from<In, Out>(
    f: impl FnMut(Out, In) -> Out + Send + 'static,
    init: Out,
) -> Processor<In, Out>
where
    In: Send + 'static,
    Out: Clone + Send + 'static,
{
    Processor::spawn(move |ctx| fold_loop(ctx, init, f))
}

/// Emits the running fold after every input, seeded with the zero value.
#[must_use]
pub fn scan<In, Out>(f: impl FnMut(Out, In) -> Out + Send + 'static) -> Processor<In, Out>
where
    In: Send + 'static,
    Out: Clone + Default + Send + 'static,
{
    Processor::spawn(move |ctx| fold_loop(ctx, Out::default(), f))
}

/// Emits the running fold after every input, seeded with `init`.
#[must_use]
pub fn scan_from<In, Out>(
    f: impl FnMut(Out, In) -> Out + Send + 'static,
    init: Out,
) -> Processor<In, Out>
where
    In: Send + 'static,
    Out: Clone + Send + 'static,
{
    Processor::spawn(move |ctx| fold_loop(ctx, init, f))
}

async fn fold_loop<In, Out>(
    mut ctx: Context<In, Out>,
    mut acc: Out,
    mut f: impl FnMut(Out, In) -> Out + Send,
) where
    Out: Clone,
{
    while let Some(msg) = ctx.fetch_message().await {
        acc = f(acc.clone(), msg);
        if !ctx.forward_result(acc.clone()).await {
            return;
        }
    }
}
