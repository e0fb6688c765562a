// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! The per-processor context: input, output, done, and advice.
//!
//! A context bundles the four endpoints a processor may touch. Every
//! blocking operation races the done signal, which is what makes stream
//! shutdown a single broadcast: close done and every processor unwinds at
//! its next suspension point.
//!
//! Child contexts derived by splitting a parent share done and advice with
//! it but substitute one channel endpoint -- this is how combinators rewire
//! processors without the parent noticing.

use tokio::sync::mpsc;

use crate::error::DynError;
use crate::sync::Closer;

/// A sideband notice raised by a processor while a stream runs.
#[derive(Debug)]
pub enum Advice {
    /// An operational error published through [`Context::report_error`].
    Error(DynError),
}

/// Token type marking the input of a source processor. Each token fetched
/// from a source's input grants one generation step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Source;

/// Token type marking the output of a sink processor. Sink outputs carry no
/// data; the type exists so pipelines terminate in a well-formed edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sink;

/// Capacity of the channel edges created between processors.
pub(crate) const EDGE_CAPACITY: usize = 1;

/// The endpoints available to one processor: typed input and output plus
/// the shared done and advice channels.
pub struct Context<In, Out> {
    done: Closer,
    advice: mpsc::UnboundedSender<Advice>,
    input: mpsc::Receiver<In>,
    output: mpsc::Sender<Out>,
}

impl<In, Out> Context<In, Out> {
    /// Assembles a context from raw endpoints. Mostly useful for driving a
    /// single processor in tests; composed pipelines are wired by the
    /// stream lifecycle and the combinators.
    #[must_use]
    pub fn new(
        done: Closer,
        advice: mpsc::UnboundedSender<Advice>,
        input: mpsc::Receiver<In>,
        output: mpsc::Sender<Out>,
    ) -> Self {
        Self {
            done,
            advice,
            input,
            output,
        }
    }

    /// Receives the next input message, respecting done. Returns `None`
    /// once done is signaled or the input edge has closed.
    pub async fn fetch_message(&mut self) -> Option<In> {
        tokio::select! {
            _ = self.done.closed() => None,
            msg = self.input.recv() => msg,
        }
    }

    /// Sends a result downstream, respecting done. Returns `false` once
    /// done is signaled or the output edge has closed; the message is
    /// dropped in either case.
    pub async fn forward_result(&mut self, msg: Out) -> bool {
        deliver(&self.done, &self.output, msg).await
    }

    /// Publishes an error on the advice channel. Returns `true` when the
    /// notice was accepted and the processor should continue, `false` once
    /// done is signaled.
    ///
    /// Anything convertible into a boxed error works, including a
    /// `format!`ed `String` for ad-hoc notices.
    pub async fn report_error(&self, err: impl Into<DynError>) -> bool {
        if self.done.is_closed() {
            return false;
        }
        self.advice.send(Advice::Error(err.into())).is_ok()
    }

    /// The stream's done signal.
    #[must_use]
    pub fn done(&self) -> &Closer {
        &self.done
    }

    /// Splits this context around a fresh intermediate edge: the left child
    /// keeps the input, the right child keeps the output, and both share
    /// done and advice.
    pub(crate) fn pipe<Mid>(self) -> (Context<In, Mid>, Context<Mid, Out>) {
        let (tx, rx) = mpsc::channel(EDGE_CAPACITY);
        (
            Context {
                done: self.done.clone(),
                advice: self.advice.clone(),
                input: self.input,
                output: tx,
            },
            Context {
                done: self.done,
                advice: self.advice,
                input: rx,
                output: self.output,
            },
        )
    }

    pub(crate) fn advice_sender(&self) -> mpsc::UnboundedSender<Advice> {
        self.advice.clone()
    }

    pub(crate) fn output_sender(&self) -> mpsc::Sender<Out> {
        self.output.clone()
    }

    /// Disassembles the context for operators that need a three-way select
    /// over done, input, and a timer.
    pub(crate) fn into_parts(
        self,
    ) -> (
        Closer,
        mpsc::UnboundedSender<Advice>,
        mpsc::Receiver<In>,
        mpsc::Sender<Out>,
    ) {
        (self.done, self.advice, self.input, self.output)
    }
}

/// Sends on an edge while racing done. Returns `false` (dropping `msg`)
/// once done is signaled or the edge has closed.
///
/// Uses `reserve` so a cancelled send never consumes the message.
pub(crate) async fn deliver<T>(done: &Closer, output: &mpsc::Sender<T>, msg: T) -> bool {
    tokio::select! {
        _ = done.closed() => false,
        permit = output.reserve() => match permit {
            Ok(permit) => {
                permit.send(msg);
                true
            }
            Err(_) => false,
        },
    }
}
