// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Time-gated operators.
//!
//! Every blocking step here -- timer waits included -- races the done
//! signal, so a stream stop lands within one suspension point regardless
//! of configured durations.

use std::time::Duration;

use tokio::time::Instant;

use super::context::{Context, deliver};
use super::processor::Processor;

/// Gates forwarding on a fixed-rate ticker: at most one message per `rate`,
/// the first after one full tick. Input backs up while the gate is shut.
#[must_use]
pub fn throttle<Msg>(rate: Duration) -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
{
    Processor::spawn(move |ctx: Context<Msg, Msg>| async move {
        let (done, _advice, mut input, output) = ctx.into_parts();
        let mut ticker = tokio::time::interval_at(Instant::now() + rate, rate);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            let msg = tokio::select! {
                _ = done.closed() => return,
                msg = input.recv() => match msg {
                    Some(msg) => msg,
                    None => return,
                },
            };
            tokio::select! {
                _ = done.closed() => return,
                _ = ticker.tick() => {}
            }
            if !deliver(&done, &output, msg).await {
                return;
            }
        }
    })
}

/// Emits only the last message seen in a quiescent interval of `wait`.
/// Every arrival replaces the pending message and resets the timer.
#[must_use]
pub fn debounce<Msg>(wait: Duration) -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
{
    Processor::spawn(move |ctx: Context<Msg, Msg>| async move {
        let (done, _advice, mut input, output) = ctx.into_parts();
        let mut pending: Option<Msg> = None;
        let mut deadline = Instant::now();
        loop {
            tokio::select! {
                _ = done.closed() => return,
                msg = input.recv() => match msg {
                    Some(msg) => {
                        pending = Some(msg);
                        deadline = Instant::now() + wait;
                    }
                    None => return,
                },
                _ = tokio::time::sleep_until(deadline), if pending.is_some() => {
                    if let Some(msg) = pending.take() {
                        if !deliver(&done, &output, msg).await {
                            return;
                        }
                    }
                }
            }
        }
    })
}

/// Holds each message for `wait` between receipt and forwarding.
#[must_use]
pub fn delay<Msg>(wait: Duration) -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
{
    Processor::spawn(move |ctx: Context<Msg, Msg>| async move {
        let (done, _advice, mut input, output) = ctx.into_parts();
        loop {
            let msg = tokio::select! {
                _ = done.closed() => return,
                msg = input.recv() => match msg {
                    Some(msg) => msg,
                    None => return,
                },
            };
            tokio::select! {
                _ = done.closed() => return,
                _ = tokio::time::sleep(wait) => {}
            }
            if !deliver(&done, &output, msg).await {
                return;
            }
        }
    })
}

/// Emits at most the latest pending message each `period` tick, dropping
/// the intermediates. Done or input closure flushes the pending message.
#[must_use]
pub fn sample<Msg>(period: Duration) -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
{
    Processor::spawn(move |ctx: Context<Msg, Msg>| async move {
        let (done, _advice, mut input, output) = ctx.into_parts();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut pending: Option<Msg> = None;
        loop {
            tokio::select! {
                _ = done.closed() => {
                    // Best-effort flush: after done, in-flight drops are
                    // permitted, so a full edge loses the sample.
                    if let Some(msg) = pending.take() {
                        let _ = output.try_send(msg);
                    }
                    return;
                }
                _ = ticker.tick() => {
                    if let Some(msg) = pending.take() {
                        if !deliver(&done, &output, msg).await {
                            return;
                        }
                    }
                }
                msg = input.recv() => match msg {
                    Some(msg) => pending = Some(msg),
                    None => {
                        if let Some(msg) = pending.take() {
                            let _ = deliver(&done, &output, msg).await;
                        }
                        return;
                    }
                },
            }
        }
    })
}
