// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with exponential backoff for Kubernetes API reads.
//!
//! Reconcile passes are themselves retried by the controller, so only short, idempotent
//! reads (fetching the `MariaDB` at the start of a pass) go through here. Rate
//! limiting, server errors and dropped connections are retried with jittered
//! exponential backoff; everything else fails immediately.

use crate::errors::{is_transient_kube_error, Result};
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Initial retry interval (100ms)
const INITIAL_INTERVAL_MILLIS: u64 = 100;

/// Maximum interval between retries (5 seconds)
const MAX_INTERVAL_SECS: u64 = 5;

/// Give up after this long and let the controller requeue instead (30 seconds)
const MAX_ELAPSED_TIME_SECS: u64 = 30;

/// Backoff multiplier
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Jitter applied to each interval (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Jittered exponential backoff schedule.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    pub current_interval: Duration,
    pub max_interval: Duration,
    pub max_elapsed_time: Duration,
    pub multiplier: f64,
    pub randomization_factor: f64,
    started: Instant,
}

impl ExponentialBackoff {
    /// Next sleep, or `None` once the elapsed budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.started.elapsed() >= self.max_elapsed_time {
            return None;
        }

        let interval = self.current_interval;
        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        Some(self.jitter(interval))
    }

    fn jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor <= 0.0 {
            return interval;
        }
        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let jittered = rand::rng().random_range((secs - delta)..=(secs + delta));
        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Backoff used for API reads: 100ms doubling up to 5s, for at most 30s.
#[must_use]
pub fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        current_interval: Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
        max_elapsed_time: Duration::from_secs(MAX_ELAPSED_TIME_SECS),
        multiplier: BACKOFF_MULTIPLIER,
        randomization_factor: RANDOMIZATION_FACTOR,
        started: Instant::now(),
    }
}

/// Retry a Kubernetes API call while it fails with a transient error.
///
/// # Errors
///
/// Returns the first non-transient error, or the last transient one once the
/// backoff budget is exhausted.
///
/// # Example
///
/// ```rust,no_run
/// use kube::{Api, Client};
/// use mariadb_operator::crd::MariaDB;
/// use mariadb_operator::reconcilers::retry::retry_api_call;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = Client::try_default().await?;
/// let api: Api<MariaDB> = Api::namespaced(client, "openstack");
///
/// let db = retry_api_call(|| api.get_opt("openstack"), "get mariadb openstack").await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_api_call<T, F, Fut>(mut operation: F, operation_name: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, kube::Error>>,
{
    let mut backoff = default_backoff();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt, "Kubernetes API call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) if is_transient_kube_error(&e) => match backoff.next_backoff() {
                Some(delay) => {
                    warn!(
                        operation = operation_name,
                        attempt,
                        retry_after = ?delay,
                        error = %e,
                        "Transient Kubernetes API error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!(
                        operation = operation_name,
                        attempt,
                        error = %e,
                        "Backoff exhausted, giving up"
                    );
                    return Err(e.into());
                }
            },
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
