// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Topic-facing processors: pipelines sourced from and sinking into
//! topics.
//!
//! Both processors create their endpoint when started and close it on
//! every exit path, so a stopped stream never leaves cursors pinning
//! retention.

use super::context::{Context, Source};
use super::processor::Processor;
use crate::error::Error;
use crate::topic::Topic;

/// Sources a pipeline from a topic: a dedicated consumer is created at
/// start and every retained message is emitted in cursor order.
#[must_use]
pub fn topic_consumer<Msg>(topic: &Topic<Msg>) -> Processor<Source, Msg>
where
    Msg: Clone + Send + Sync + 'static,
{
    let topic = topic.clone();
    Processor::spawn(move |mut ctx: Context<Source, Msg>| async move {
        let mut consumer = topic.new_consumer();
        loop {
            if ctx.fetch_message().await.is_none() {
                break;
            }
            let msg = tokio::select! {
                _ = ctx.done().closed() => break,
                msg = consumer.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };
            if !ctx.forward_result(msg).await {
                break;
            }
        }
        consumer.close();
    })
}

/// Publishes each message to a topic through a dedicated producer, then
/// forwards it downstream unchanged.
#[must_use]
pub fn topic_producer<Msg>(topic: &Topic<Msg>) -> Processor<Msg, Msg>
where
    Msg: Clone + Send + Sync + 'static,
{
    let topic = topic.clone();
    Processor::spawn(move |mut ctx: Context<Msg, Msg>| async move {
        let producer = topic.new_producer();
        while let Some(msg) = ctx.fetch_message().await {
            if producer.send(msg.clone()).is_err() {
                if !ctx.report_error(Error::SenderClosed).await {
                    break;
                }
                continue;
            }
            if !ctx.forward_result(msg).await {
                break;
            }
        }
        producer.close();
    })
}
