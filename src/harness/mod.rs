// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Black-box test suites for controllers that consume `MariaDBAccount`s.
//!
//! A consumer controller (anything that logs in to a database through an
//! account) must create, finalize and migrate accounts the same way. The
//! suites here drive a consumer through that lifecycle and assert on what ends
//! up in its [`AccountStore`]. The consumer supplies a [`PopulateHarness`] that
//! builds a fresh store and consumer for each scenario.
//!
//! # Example
//!
//! ```rust,no_run
//! use mariadb_operator::harness::{MariaDBTestHarness, PopulateHarness};
//! use std::time::Duration;
//!
//! # async fn example<P: PopulateHarness>(populate: P) -> Result<(), mariadb_operator::harness::HarnessError> {
//! let harness = MariaDBTestHarness {
//!     description: "keystone api".to_string(),
//!     namespace: "openstack".to_string(),
//!     database_name: "keystone".to_string(),
//!     finalizer_name: "openstack.org/keystone".to_string(),
//!     timeout: Duration::from_secs(10),
//!     interval: Duration::from_millis(100),
//!     populate,
//! };
//! harness.run_basic_suite().await?;
//! # Ok(())
//! # }
//! ```

pub mod poll;
pub mod suites;

use crate::accounts::AccountStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use poll::{consistently, eventually};

/// Account present before the consumer is created.
pub const EXISTING_ACCOUNT_NAME: &str = "some-mariadb-account";

/// Account the consumer is switched away from.
pub const OLD_ACCOUNT_NAME: &str = "some-old-account";

/// Account the consumer is switched to.
pub const NEW_ACCOUNT_NAME: &str = "some-new-account";

/// A consumer CR under test.
#[async_trait]
pub trait AccountConsumer: Send + Sync {
    /// Create the consumer CR referencing `account_name`.
    async fn setup_cr(&self, account_name: &str) -> anyhow::Result<()>;

    /// Point the existing consumer CR at `account_name`.
    async fn update_account(&self, account_name: &str) -> anyhow::Result<()>;

    /// Delete the consumer CR.
    async fn delete_cr(&self) -> anyhow::Result<()>;
}

/// Consumers that render a connection URL from account credentials.
#[async_trait]
pub trait UrlAsserter: Send + Sync {
    /// Succeeds once the consumer's URL is built from these credentials.
    async fn assert_url(
        &self,
        account_name: &str,
        user_name: &str,
        password: &str,
    ) -> anyhow::Result<()>;
}

/// Consumers that fold account credentials into a config hash.
#[async_trait]
pub trait ConfigHashSource: Send + Sync {
    async fn config_hash(&self) -> anyhow::Result<String>;
}

/// Store and consumer for one scenario.
pub struct Scenario<C> {
    pub store: Arc<dyn AccountStore>,
    pub consumer: Arc<C>,
}

/// Builds a fresh [`Scenario`] for every suite scenario.
#[async_trait]
pub trait PopulateHarness: Send + Sync {
    type Consumer: AccountConsumer + 'static;

    async fn populate(
        &self,
        namespace: &str,
        database_name: &str,
        finalizer_name: &str,
    ) -> anyhow::Result<Scenario<Self::Consumer>>;
}

/// Suite configuration for one consumer.
pub struct MariaDBTestHarness<P> {
    pub description: String,
    pub namespace: String,
    pub database_name: String,
    pub finalizer_name: String,

    /// Upper bound for every `eventually` wait and the `consistently` window.
    pub timeout: Duration,

    /// Polling interval.
    pub interval: Duration,

    pub populate: P,
}

/// A failed scenario.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("{scenario}: timed out after {timeout:?} waiting for {what}: {last_error}")]
    Timeout {
        scenario: String,
        what: String,
        timeout: Duration,
        last_error: String,
    },

    #[error("{scenario}: {what} stopped holding: {error}")]
    NotConsistent {
        scenario: String,
        what: String,
        error: String,
    },

    #[error("{scenario}: {step} failed")]
    Step {
        scenario: String,
        step: String,
        #[source]
        source: anyhow::Error,
    },
}

impl HarnessError {
    /// The scenario that failed.
    #[must_use]
    pub fn scenario(&self) -> &str {
        match self {
            Self::Timeout { scenario, .. }
            | Self::NotConsistent { scenario, .. }
            | Self::Step { scenario, .. } => scenario,
        }
    }

    pub(crate) fn step(scenario: &str, step: &str, source: anyhow::Error) -> Self {
        Self::Step {
            scenario: scenario.to_string(),
            step: step.to_string(),
            source,
        }
    }
}
