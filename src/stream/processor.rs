// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! The processor abstraction.
//!
//! A `Processor<In, Out>` is a one-shot start function over a
//! [`Context<In, Out>`]. The protocol: `start` must return promptly, with
//! all real work arranged on an independent task. The two construction
//! paths both guarantee this by shape:
//!
//! - [`Processor::spawn`] wraps an async loop and launches it with
//!   `tokio::spawn` -- the path every leaf operator takes.
//! - [`Processor::new`] wraps a synchronous wiring function -- the path
//!   combinators take to allocate edges and start children.
//!
//! A start function that blocks anyway is a protocol violation; `start`
//! times the synchronous call and publishes a late-return diagnostic when
//! it exceeds the threshold.

use std::time::Duration;

use tokio::time::Instant;

use super::context::Context;
use crate::diag;
use crate::error::Error;

/// How long a start function may run before it is considered to have
/// returned late.
const LATE_START: Duration = Duration::from_millis(1);

/// A composable unit of stream computation from `In` to `Out`.
pub struct Processor<In, Out> {
    start_fn: Box<dyn FnOnce(Context<In, Out>) + Send>,
}

impl<In, Out> Processor<In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
{
    /// Wraps a synchronous wiring function. The function must only
    /// allocate channels and start other processors or tasks.
    pub fn new(start: impl FnOnce(Context<In, Out>) + Send + 'static) -> Self {
        Self {
            start_fn: Box::new(start),
        }
    }

    /// Wraps an async processing loop, to be launched on its own task when
    /// the processor starts.
    pub fn spawn<F, Fut>(run: F) -> Self
    where
        F: FnOnce(Context<In, Out>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::new(move |ctx| {
            drop(tokio::spawn(run(ctx)));
        })
    }

    /// Starts the processor against `ctx`. Returns promptly; the
    /// processor's work continues on its own task.
    pub fn start(self, ctx: Context<In, Out>) {
        let began = Instant::now();
        (self.start_fn)(ctx);
        let elapsed = began.elapsed();
        if elapsed > LATE_START {
            tracing::debug!(
                elapsed_us = elapsed.as_micros() as u64,
                "processor start returned late"
            );
            diag::publish(Error::ProcessorReturnedLate);
        }
    }

    /// Feeds this processor's output into `right`, yielding the composed
    /// processor.
    #[must_use]
    pub fn bind<Next>(self, right: Processor<Out, Next>) -> Processor<In, Next>
    where
        Next: Send + 'static,
    {
        super::combine::bind(self, right)
    }
}

/// A processor that forwards every message unchanged.
#[must_use]
pub fn forward<Msg>() -> Processor<Msg, Msg>
where
    Msg: Send + 'static,
{
    Processor::spawn(|mut ctx| async move {
        while let Some(msg) = ctx.fetch_message().await {
            if !ctx.forward_result(msg).await {
                return;
            }
        }
    })
}
