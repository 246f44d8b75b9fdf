// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `MariaDB` controller.
//!
//! The controller receives an `Arc<Context>` holding the Kubernetes client and the
//! operator configuration. Nothing in it is mutated after startup, so reconcile
//! passes for different `MariaDB` objects can run concurrently without locking.

use crate::config::OperatorConfig;
use kube::Client;

/// Shared, read-only state passed to every reconcile pass.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Operator configuration (default image, field manager, namespace scope)
    pub config: OperatorConfig,
}

impl Context {
    #[must_use]
    pub fn new(client: Client, config: OperatorConfig) -> Self {
        Self { client, config }
    }

    /// Field manager name used for server-side apply.
    #[must_use]
    pub fn field_manager(&self) -> &str {
        &self.config.field_manager
    }

    /// Image used when a `MariaDB` does not pin one.
    #[must_use]
    pub fn default_image(&self) -> &str {
        &self.config.default_image
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
