// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Channel-facing sources and sinks.
//!
//! Sources consume one `Source` token per generation step, so they pace
//! themselves against the stream's token pump and observe done between
//! steps. Sinks drain their input into a caller-provided channel.

use tokio::sync::mpsc;

use super::context::{Context, Sink, Source, deliver};
use super::processor::Processor;

/// Emits `f()` once per token until it returns `None`.
#[must_use]
pub fn generate<Msg>(
    mut f: impl FnMut() -> Option<Msg> + Send + 'static,
) -> Processor<Source, Msg>
where
    Msg: Send + 'static,
{
    Processor::spawn(move |mut ctx: Context<Source, Msg>| async move {
        loop {
            if ctx.fetch_message().await.is_none() {
                return;
            }
            let Some(msg) = f() else { return };
            if !ctx.forward_result(msg).await {
                return;
            }
        }
    })
}

/// Emits messages drawn from a caller-provided channel until it closes.
#[must_use]
pub fn generate_from<Msg>(mut source: mpsc::Receiver<Msg>) -> Processor<Source, Msg>
where
    Msg: Send + 'static,
{
    Processor::spawn(move |mut ctx: Context<Source, Msg>| async move {
        loop {
            if ctx.fetch_message().await.is_none() {
                return;
            }
            let msg = tokio::select! {
                _ = ctx.done().closed() => return,
                msg = source.recv() => match msg {
                    Some(msg) => msg,
                    None => return,
                },
            };
            if !ctx.forward_result(msg).await {
                return;
            }
        }
    })
}

/// Drains the stream into a caller-provided channel.
#[must_use]
pub fn sink_into<Msg>(sink: mpsc::Sender<Msg>) -> Processor<Msg, Sink>
where
    Msg: Send + 'static,
{
    Processor::spawn(move |mut ctx: Context<Msg, Sink>| async move {
        while let Some(msg) = ctx.fetch_message().await {
            if !deliver(ctx.done(), &sink, msg).await {
                return;
            }
        }
    })
}

/// Copies each message into a side channel, then forwards it downstream
/// unchanged.
#[must_use]
pub fn sidechain_to<Msg>(side: mpsc::Sender<Msg>) -> Processor<Msg, Msg>
where
    Msg: Clone + Send + 'static,
{
    Processor::spawn(move |mut ctx: Context<Msg, Msg>| async move {
        while let Some(msg) = ctx.fetch_message().await {
            if !deliver(ctx.done(), &side, msg.clone()).await {
                return;
            }
            if !ctx.forward_result(msg).await {
                return;
            }
        }
    })
}
