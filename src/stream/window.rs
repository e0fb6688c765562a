// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Batching operators: size/deadline buffers and windows.

use std::time::Duration;

use tokio::time::Instant;

use super::context::{Context, deliver};
use super::processor::Processor;

/// Collects messages into batches, emitting when `size` is reached or when
/// `max_wait` has elapsed since the last flush, whichever comes first.
/// Input closure flushes any partial batch.
#[must_use]
pub fn buffer<Msg>(size: usize, max_wait: Duration) -> Processor<Msg, Vec<Msg>>
where
    Msg: Send + 'static,
{
    Processor::spawn(move |ctx: Context<Msg, Vec<Msg>>| async move {
        let (done, _advice, mut input, output) = ctx.into_parts();
        let mut batch: Vec<Msg> = Vec::with_capacity(size);
        let mut deadline = Instant::now() + max_wait;
        loop {
            tokio::select! {
                _ = done.closed() => return,
                _ = tokio::time::sleep_until(deadline) => {
                    if !batch.is_empty() {
                        let full = std::mem::replace(&mut batch, Vec::with_capacity(size));
                        if !deliver(&done, &output, full).await {
                            return;
                        }
                    }
                    deadline = Instant::now() + max_wait;
                }
                msg = input.recv() => match msg {
                    Some(msg) => {
                        batch.push(msg);
                        if batch.len() >= size {
                            let full = std::mem::replace(&mut batch, Vec::with_capacity(size));
                            if !deliver(&done, &output, full).await {
                                return;
                            }
                            deadline = Instant::now() + max_wait;
                        }
                    }
                    None => {
                        if !batch.is_empty() {
                            let _ = deliver(&done, &output, batch).await;
                        }
                        return;
                    }
                },
            }
        }
    })
}

/// Tick-driven batching: emits the collected window every `duration`,
/// suppressing empty windows. Input closure flushes the final non-empty
/// window.
#[must_use]
pub fn window<Msg>(duration: Duration) -> Processor<Msg, Vec<Msg>>
where
    Msg: Send + 'static,
{
    Processor::spawn(move |ctx: Context<Msg, Vec<Msg>>| async move {
        let (done, _advice, mut input, output) = ctx.into_parts();
        let mut ticker = tokio::time::interval_at(Instant::now() + duration, duration);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut window: Vec<Msg> = Vec::new();
        loop {
            tokio::select! {
                _ = done.closed() => return,
                _ = ticker.tick() => {
                    if !window.is_empty() {
                        let full = std::mem::take(&mut window);
                        if !deliver(&done, &output, full).await {
                            return;
                        }
                    }
                }
                msg = input.recv() => match msg {
                    Some(msg) => window.push(msg),
                    None => {
                        if !window.is_empty() {
                            let _ = deliver(&done, &output, window).await;
                        }
                        return;
                    }
                },
            }
        }
    })
}

/// Emits a full `size`-length window after every message once the first
/// `size` messages have arrived, sliding by one each time.
#[must_use]
pub fn sliding_window<Msg>(size: usize) -> Processor<Msg, Vec<Msg>>
where
    Msg: Clone + Send + 'static,
{
    Processor::spawn(move |mut ctx: Context<Msg, Vec<Msg>>| async move {
        let mut window: Vec<Msg> = Vec::with_capacity(size + 1);
        while let Some(msg) = ctx.fetch_message().await {
            window.push(msg);
            if window.len() > size {
                let _ = window.remove(0);
            }
            if window.len() == size && !ctx.forward_result(window.clone()).await {
                return;
            }
        }
    })
}
