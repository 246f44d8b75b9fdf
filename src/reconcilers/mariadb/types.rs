// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared types and imports for `MariaDB` reconciliation.
//!
//! This module provides common type re-exports and the step outcome type used
//! across the mariadb reconciliation modules.

#![allow(clippy::wildcard_imports)]

// Re-export commonly used types from parent modules
pub use crate::context::Context;
pub use crate::crd::MariaDB;
pub use crate::errors::{MariaDbError, Result};
pub use crate::reconcilers::resources::{create_or_patch, delete_if_exists, OperationResult};
pub use crate::reconcilers::status::MariaDBStatusUpdater;
pub use crate::status_reasons::{
    error_message, REASON_ERROR, REASON_REQUESTED, SEVERITY_ERROR, SEVERITY_INFO,
    SEVERITY_WARNING,
};

// Re-export commonly used Kubernetes types
pub use k8s_openapi::api::core::v1::{ConfigMap, Endpoints, Pod, Secret, Service};

// Re-export kube-rs types
pub use kube::{
    api::{Patch, PatchParams},
    client::Client,
    runtime::controller::Action,
    Api, ResourceExt,
};

// Re-export common utilities
pub use serde_json::json;
pub use std::collections::BTreeMap;
pub use std::time::Duration;
pub use tracing::{debug, error, info, warn};

/// An early end to a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requeue {
    pub after: Duration,
    /// Metric label
    pub reason: &'static str,
}

/// What a reconcile step tells the pass to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome<T = ()> {
    /// Carry on with the next step, handing it the step's result
    Continue(T),
    /// Stop this pass and come back later
    Requeue(Requeue),
}

impl StepOutcome<()> {
    /// Continue with no payload.
    #[must_use]
    pub fn next() -> Self {
        Self::Continue(())
    }
}

/// Requeue after `secs` seconds, labeled with `reason`.
#[must_use]
pub fn requeue_secs<T>(secs: u64, reason: &'static str) -> StepOutcome<T> {
    StepOutcome::Requeue(Requeue {
        after: Duration::from_secs(secs),
        reason,
    })
}
