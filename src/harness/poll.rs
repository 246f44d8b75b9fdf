// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Polling assertions.

use super::HarnessError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Poll `check` every `interval` until it succeeds or `timeout` elapses.
///
/// An `Err` from `check` counts as "not yet". The last one is reported on
/// timeout.
///
/// # Errors
///
/// Returns [`HarnessError::Timeout`] if `check` never succeeds.
pub async fn eventually<T, F, Fut>(
    scenario: &str,
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<T, HarnessError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        let last_error = match check().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if Instant::now() >= deadline {
            return Err(HarnessError::Timeout {
                scenario: scenario.to_string(),
                what: what.to_string(),
                timeout,
                last_error: format!("{last_error:#}"),
            });
        }
        sleep(interval).await;
    }
}

/// Poll `check` every `interval` for `window`, failing on the first `Err`.
///
/// # Errors
///
/// Returns [`HarnessError::NotConsistent`] if any check fails.
pub async fn consistently<F, Fut>(
    scenario: &str,
    what: &str,
    window: Duration,
    interval: Duration,
    mut check: F,
) -> Result<(), HarnessError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let deadline = Instant::now() + window;
    loop {
        if let Err(e) = check().await {
            return Err(HarnessError::NotConsistent {
                scenario: scenario.to_string(),
                what: what.to_string(),
                error: format!("{e:#}"),
            });
        }
        if Instant::now() >= deadline {
            return Ok(());
        }
        sleep(interval).await;
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod poll_tests;
