// Copyright The Convoy Authors
// SPDX-License-Identifier: Apache-2.0

//! Retrying transformation.

use std::time::Duration;

use super::context::Context;
use super::processor::Processor;

const BACKOFF_MULTIPLIER: u32 = 2;

/// Applies a fallible transformation with up to `max_attempts` tries per
/// message and exponential backoff between them. A message that exhausts
/// its attempts is silently dropped.
#[must_use]
pub fn retry<From, To, E>(
    mut f: impl FnMut(&From) -> Result<To, E> + Send + 'static,
    max_attempts: u32,
    initial_backoff: Duration,
) -> Processor<From, To>
where
    From: Send + 'static,
    To: Send + 'static,
    E: Send + 'static,
{
    Processor::spawn(move |mut ctx: Context<From, To>| async move {
        while let Some(msg) = ctx.fetch_message().await {
            let mut backoff = initial_backoff;
            let mut outcome = None;
            for attempt in 0..max_attempts {
                match f(&msg) {
                    Ok(result) => {
                        outcome = Some(result);
                        break;
                    }
                    Err(_) if attempt + 1 < max_attempts => {
                        tokio::select! {
                            _ = ctx.done().closed() => return,
                            _ = tokio::time::sleep(backoff) => {}
                        }
                        backoff = backoff.saturating_mul(BACKOFF_MULTIPLIER);
                    }
                    Err(_) => {}
                }
            }
            if let Some(result) = outcome {
                if !ctx.forward_result(result).await {
                    return;
                }
            }
        }
    })
}
