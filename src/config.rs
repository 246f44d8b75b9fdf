// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator command-line and environment configuration.
//!
//! Every flag can also be supplied through an environment variable so the
//! operator can be configured from its `Deployment` manifest alone.

use crate::constants::{
    DEFAULT_FIELD_MANAGER, DEFAULT_IMAGE_ENV, DEFAULT_MARIADB_IMAGE, METRICS_SERVER_BIND_ADDRESS,
};
use clap::Parser;

/// Runtime configuration for the operator binary.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "mariadb-operator", version, about = "Kubernetes operator for MariaDB")]
pub struct OperatorConfig {
    /// Image used when a `MariaDB` leaves `containerImage` empty.
    #[arg(long, env = DEFAULT_IMAGE_ENV, default_value = DEFAULT_MARIADB_IMAGE)]
    pub default_image: String,

    /// Address the `/metrics` and `/healthz` server listens on.
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = METRICS_SERVER_BIND_ADDRESS)]
    pub metrics_bind_address: String,

    /// Restrict watches to one namespace. Empty watches all namespaces.
    #[arg(long, env = "WATCH_NAMESPACE", default_value = "")]
    pub watch_namespace: String,

    /// Field manager used for server-side apply.
    #[arg(long, env = "FIELD_MANAGER", default_value = DEFAULT_FIELD_MANAGER)]
    pub field_manager: String,
}

impl OperatorConfig {
    /// The namespace to watch, or `None` for cluster-wide.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        let ns = self.watch_namespace.trim();
        (!ns.is_empty()).then_some(ns)
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            default_image: DEFAULT_MARIADB_IMAGE.to_string(),
            metrics_bind_address: METRICS_SERVER_BIND_ADDRESS.to_string(),
            watch_namespace: String::new(),
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
