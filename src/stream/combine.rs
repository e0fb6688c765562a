// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Processor combinators: sequencing, fan-in, fan-out, and pairing.
//!
//! Combinators are wiring functions: when started they allocate
//! intermediate edges, derive child contexts sharing the parent's done and
//! advice, and start their children. None of them runs a loop of its own
//! except where the combination itself demands one (fan-out forwarding,
//! pairing).
//!
//! Source-shaped children (`Processor<Source, T>`) are started with a
//! private token pump: a task that feeds `Source` tokens until done, each
//! token granting one generation step.

use tokio::sync::mpsc;

use super::context::{Context, EDGE_CAPACITY, Sink, Source, deliver};
use super::processor::{Processor, forward};
use crate::sync::Closer;

/// A paired result from two streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair<L, R> {
    /// The value drawn from the left stream.
    pub left: L,
    /// The value drawn from the right stream.
    pub right: R,
}

/// Binds the output of `left` to the input of `right` through a fresh
/// intermediate edge.
#[must_use]
pub fn bind<In, Mid, Out>(
    left: Processor<In, Mid>,
    right: Processor<Mid, Out>,
) -> Processor<In, Out>
where
    In: Send + 'static,
    Mid: Send + 'static,
    Out: Send + 'static,
{
    Processor::new(move |ctx: Context<In, Out>| {
        let (left_ctx, right_ctx) = ctx.pipe();
        left.start(left_ctx);
        right.start(right_ctx);
    })
}

/// Right-associative n-ary [`bind`] over homogeneous stages. An empty list
/// degenerates to [`forward`].
#[must_use]
pub fn subprocess<Msg>(stages: Vec<Processor<Msg, Msg>>) -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
{
    let mut stages = stages.into_iter().rev();
    match stages.next() {
        None => forward(),
        Some(last) => stages.fold(last, |chain, stage| bind(stage, chain)),
    }
}

/// Starts every source against the same output edge; their emissions
/// interleave in arrival order.
#[must_use]
pub fn merge<Out>(sources: Vec<Processor<Source, Out>>) -> Processor<Source, Out>
where
    Out: Send + 'static,
{
    Processor::new(move |ctx: Context<Source, Out>| {
        for source in sources {
            start_source_with_output(source, &ctx, ctx.output_sender());
        }
    })
}

/// Multicasts each input message to every branch. Each branch receives its
/// own copy over its own edge; a branch that falls behind blocks the
/// fan-out, a branch that exits is skipped thereafter.
#[must_use]
pub fn split<Msg>(branches: Vec<Processor<Msg, Sink>>) -> Processor<Msg, Sink>
where
    Msg: Clone + Send + 'static,
{
    Processor::new(move |ctx: Context<Msg, Sink>| {
        let mut edges = Vec::with_capacity(branches.len());
        for branch in branches {
            let (tx, rx) = mpsc::channel(EDGE_CAPACITY);
            branch.start(Context::new(
                ctx.done().clone(),
                ctx.advice_sender(),
                rx,
                ctx.output_sender(),
            ));
            edges.push(tx);
        }
        drop(tokio::spawn(async move {
            let mut ctx = ctx;
            while let Some(msg) = ctx.fetch_message().await {
                for edge in &edges {
                    let _ = deliver(ctx.done(), edge, msg.clone()).await;
                }
                if ctx.done().is_closed() {
                    return;
                }
            }
        }));
    })
}

/// Strictly pairs the two sources: awaits one value from each, in order,
/// and emits the [`Pair`]. Either source closing ends the pairing.
#[must_use]
pub fn zip<L, R>(
    left: Processor<Source, L>,
    right: Processor<Source, R>,
) -> Processor<Source, Pair<L, R>>
where
    L: Send + 'static,
    R: Send + 'static,
{
    zip_with(left, right, |left, right| Pair { left, right })
}

/// As [`zip`], but emits `combine(l, r)` instead of the pair.
#[must_use]
pub fn zip_with<L, R, Out>(
    left: Processor<Source, L>,
    right: Processor<Source, R>,
    mut combine: impl FnMut(L, R) -> Out + Send + 'static,
) -> Processor<Source, Out>
where
    L: Send + 'static,
    R: Send + 'static,
    Out: Send + 'static,
{
    Processor::new(move |ctx: Context<Source, Out>| {
        let mut left_rx = start_source(left, &ctx);
        let mut right_rx = start_source(right, &ctx);
        drop(tokio::spawn(async move {
            let mut ctx = ctx;
            loop {
                let left = tokio::select! {
                    _ = ctx.done().closed() => return,
                    msg = left_rx.recv() => match msg {
                        Some(msg) => msg,
                        None => return,
                    },
                };
                let right = tokio::select! {
                    _ = ctx.done().closed() => return,
                    msg = right_rx.recv() => match msg {
                        Some(msg) => msg,
                        None => return,
                    },
                };
                if !ctx.forward_result(combine(left, right)).await {
                    return;
                }
            }
        }));
    })
}

/// Emits `combine(latest_left, latest_right)` on every arrival from either
/// side once both sides have produced at least one value. Ends when both
/// sides have closed.
#[must_use]
pub fn combine_latest<L, R, Out>(
    left: Processor<Source, L>,
    right: Processor<Source, R>,
    mut combine: impl FnMut(&L, &R) -> Out + Send + 'static,
) -> Processor<Source, Out>
where
    L: Send + 'static,
    R: Send + 'static,
    Out: Send + 'static,
{
    Processor::new(move |ctx: Context<Source, Out>| {
        let mut left_rx = start_source(left, &ctx);
        let mut right_rx = start_source(right, &ctx);
        drop(tokio::spawn(async move {
            let mut ctx = ctx;
            let mut latest_left: Option<L> = None;
            let mut latest_right: Option<R> = None;
            let (mut left_open, mut right_open) = (true, true);
            while left_open || right_open {
                tokio::select! {
                    _ = ctx.done().closed() => return,
                    msg = left_rx.recv(), if left_open => match msg {
                        Some(msg) => {
                            latest_left = Some(msg);
                            if let (Some(l), Some(r)) = (&latest_left, &latest_right) {
                                let out = combine(l, r);
                                if !ctx.forward_result(out).await {
                                    return;
                                }
                            }
                        }
                        None => left_open = false,
                    },
                    msg = right_rx.recv(), if right_open => match msg {
                        Some(msg) => {
                            latest_right = Some(msg);
                            if let (Some(l), Some(r)) = (&latest_left, &latest_right) {
                                let out = combine(l, r);
                                if !ctx.forward_result(out).await {
                                    return;
                                }
                            }
                        }
                        None => right_open = false,
                    },
                }
            }
        }));
    })
}

/// Awaits one value from each side in arrival order; pairs satisfying
/// `pred` are combined and emitted, others are dropped.
#[must_use]
pub fn join<L, R, Out>(
    left: Processor<Source, L>,
    right: Processor<Source, R>,
    mut pred: impl FnMut(&L, &R) -> bool + Send + 'static,
    mut combine: impl FnMut(L, R) -> Out + Send + 'static,
) -> Processor<Source, Out>
where
    L: Send + 'static,
    R: Send + 'static,
    Out: Send + 'static,
{
    Processor::new(move |ctx: Context<Source, Out>| {
        let mut left_rx = start_source(left, &ctx);
        let mut right_rx = start_source(right, &ctx);
        drop(tokio::spawn(async move {
            let mut ctx = ctx;
            loop {
                let (left, right) = tokio::select! {
                    _ = ctx.done().closed() => return,
                    msg = left_rx.recv() => {
                        let Some(left) = msg else { return };
                        tokio::select! {
                            _ = ctx.done().closed() => return,
                            msg = right_rx.recv() => match msg {
                                Some(right) => (left, right),
                                None => return,
                            },
                        }
                    }
                    msg = right_rx.recv() => {
                        let Some(right) = msg else { return };
                        tokio::select! {
                            _ = ctx.done().closed() => return,
                            msg = left_rx.recv() => match msg {
                                Some(left) => (left, right),
                                None => return,
                            },
                        }
                    }
                };
                if !pred(&left, &right) {
                    continue;
                }
                if !ctx.forward_result(combine(left, right)).await {
                    return;
                }
            }
        }));
    })
}

/// Feeds `Source` tokens into `tx` until done. Each token grants one
/// generation step to a source processor.
pub(crate) fn spawn_token_pump(done: Closer, tx: mpsc::Sender<Source>) {
    drop(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = done.closed() => return,
                permit = tx.reserve() => match permit {
                    Ok(permit) => permit.send(Source),
                    Err(_) => return,
                },
            }
        }
    }));
}

/// Starts a source-shaped processor with a private token pump and a fresh
/// output edge, returning the edge's receiver.
fn start_source<T, Out>(source: Processor<Source, T>, ctx: &Context<Source, Out>) -> mpsc::Receiver<T>
where
    T: Send + 'static,
{
    let (tx, rx) = mpsc::channel(EDGE_CAPACITY);
    start_source_with_output(source, ctx, tx);
    rx
}

/// Starts a source-shaped processor with a private token pump against the
/// given output edge.
fn start_source_with_output<T, Out>(
    source: Processor<Source, T>,
    ctx: &Context<Source, Out>,
    output: mpsc::Sender<T>,
) where
    T: Send + 'static,
{
    let (token_tx, token_rx) = mpsc::channel(1);
    spawn_token_pump(ctx.done().clone(), token_tx);
    source.start(Context::new(
        ctx.done().clone(),
        ctx.advice_sender(),
        token_rx,
        output,
    ));
}
