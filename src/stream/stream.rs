// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Stream lifecycle: start, advice monitoring, and cooperative stop.
//!
//! # Runtime shape
//!
//! Starting a stream launches three support tasks around the top-level
//! processor:
//!
//! - a **token pump** feeding `Source` tokens into the pipeline's input
//!   edge until done;
//! - a **drain** consuming the terminal output edge, which doubles as the
//!   settlement detector -- when every upstream sender is gone the drain
//!   observes the closed edge and marks the stream settled;
//! - an **advice monitor** delivering notices to the configured handler.
//!
//! # Stopping
//!
//! `stop` closes the shared done signal and waits for settlement. Because
//! every operator races done at each suspension point, settlement is
//! bounded by the slowest single blocking step in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use super::combine::{spawn_token_pump, subprocess};
use super::context::{Advice, Context, EDGE_CAPACITY, Source};
use super::processor::Processor;
use crate::error::Error;
use crate::sync::Closer;

/// A handler invoked per advice notice. Call the provided continuation to
/// apply the default handling as well.
type AdviceHandler = Box<dyn FnMut(Advice, &mut dyn FnMut(Advice)) + Send>;

/// A composed pipeline, ready to start. `M` is the terminal output type,
/// drained by the stream runtime.
pub struct Stream<M> {
    processor: Processor<Source, M>,
}

impl<M> Stream<M>
where
    M: Send + 'static,
{
    /// Wraps a fully composed pipeline.
    #[must_use]
    pub fn new(processor: Processor<Source, M>) -> Self {
        Self { processor }
    }

    /// Composes a source with a chain of homogeneous stages, mirroring the
    /// common source-then-stages pipeline shape.
    #[must_use]
    pub fn with_stages(source: Processor<Source, M>, stages: Vec<Processor<M, M>>) -> Self {
        Self::new(source.bind(subprocess(stages)))
    }

    /// Starts the stream with the default advice handling (log and
    /// continue).
    #[must_use]
    pub fn start(self) -> Running {
        self.start_inner(Box::new(|advice, next| next(advice)))
    }

    /// Starts the stream, routing every advice notice through `handler`.
    /// The handler receives the notice and a continuation applying the
    /// default handling; not invoking the continuation suppresses it.
    #[must_use]
    pub fn start_with(
        self,
        handler: impl FnMut(Advice, &mut dyn FnMut(Advice)) + Send + 'static,
    ) -> Running {
        self.start_inner(Box::new(handler))
    }

    fn start_inner(self, mut handler: AdviceHandler) -> Running {
        let done = Closer::new();
        let settled = Closer::new();
        let running = Arc::new(AtomicBool::new(true));

        let (advice_tx, mut advice_rx) = mpsc::unbounded_channel::<Advice>();
        let (token_tx, token_rx) = mpsc::channel::<Source>(1);
        let (out_tx, mut out_rx) = mpsc::channel::<M>(EDGE_CAPACITY);

        spawn_token_pump(done.clone(), token_tx);

        {
            let done = done.clone();
            let settled = settled.clone();
            let running = Arc::clone(&running);
            drop(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = done.closed() => break,
                        msg = out_rx.recv() => {
                            if msg.is_none() {
                                break;
                            }
                        }
                    }
                }
                running.store(false, Ordering::Release);
                let _ = settled.close();
            }));
        }

        drop(tokio::spawn(async move {
            let mut default = default_advice_handling;
            while let Some(advice) = advice_rx.recv().await {
                handler(advice, &mut default);
            }
        }));

        self.processor
            .start(Context::new(done.clone(), advice_tx, token_rx, out_tx));

        Running {
            done,
            settled,
            running,
        }
    }
}

fn default_advice_handling(advice: Advice) {
    match advice {
        Advice::Error(err) => tracing::debug!(error = %err, "stream advice"),
    }
}

/// A handle over a started stream.
pub struct Running {
    done: Closer,
    settled: Closer,
    running: Arc<AtomicBool>,
}

impl Running {
    /// Whether the pipeline is still executing.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Signals done and waits for the pipeline to settle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StreamNotRunning`] when the stream was already
    /// stopped.
    pub async fn stop(&self) -> Result<(), Error> {
        if !self.done.close() {
            return Err(Error::StreamNotRunning);
        }
        self.settled.closed().await;
        Ok(())
    }
}
