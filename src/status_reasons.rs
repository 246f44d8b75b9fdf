// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard status condition vocabulary for MariaDB resources.
//!
//! This module defines the condition types, reasons, severities and messages that
//! the reconciler writes into `status.conditions`. Reasons are programmatic
//! identifiers in CamelCase that explain why a condition has a particular status.
//!
//! # Condition Types
//!
//! ## Primary Condition
//!
//! Every resource has a single encompassing `type: Ready` condition. It is `True`
//! only when every other condition is `True`, and is always sorted first so that
//! `kubectl get mariadb` can print `.status.conditions[0]`.
//!
//! ## Constituent Conditions
//!
//! One condition per reconcile step: input validation, the three RBAC objects,
//! service exposure, configuration, database initialization and the pod itself.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   dbInitHash: 2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae
//!   conditions:
//!     - type: Ready
//!       status: "False"
//!       reason: Requested
//!       severity: Info
//!       message: "Deployment in progress"
//!     - type: DeploymentReady
//!       status: "False"
//!       reason: Requested
//!       severity: Info
//!       message: "Deployment in progress"
//!     - type: ExposeServiceReady
//!       status: "True"
//!       reason: Ready
//!       message: "Exposing service completed"
//! ```

// ============================================================================
// Condition Status Values
// ============================================================================

/// Condition status `True`
pub const STATUS_TRUE: &str = "True";

/// Condition status `False`
pub const STATUS_FALSE: &str = "False";

/// Condition status `Unknown`
pub const STATUS_UNKNOWN: &str = "Unknown";

// ============================================================================
// Condition Types
// ============================================================================

/// Overall readiness, aggregated from all other conditions
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Spec validated and inputs resolved
pub const CONDITION_TYPE_INPUT_READY: &str = "InputReady";

/// `ServiceAccount` ensured
pub const CONDITION_TYPE_SERVICE_ACCOUNT_READY: &str = "ServiceAccountReady";

/// `Role` ensured
pub const CONDITION_TYPE_ROLE_READY: &str = "RoleReady";

/// `RoleBinding` ensured
pub const CONDITION_TYPE_ROLE_BINDING_READY: &str = "RoleBindingReady";

/// `Service` (and `Endpoints`) ensured
pub const CONDITION_TYPE_EXPOSE_SERVICE_READY: &str = "ExposeServiceReady";

/// Scripts `ConfigMap` rendered and referenced secrets resolved
pub const CONDITION_TYPE_SERVICE_CONFIG_READY: &str = "ServiceConfigReady";

/// db-init job completed for the current job hash
pub const CONDITION_TYPE_MARIADB_INITIALIZED: &str = "MariaDBInitialized";

/// Workload pod running
pub const CONDITION_TYPE_DEPLOYMENT_READY: &str = "DeploymentReady";

/// Account provisioned in the database server (written by the account controller)
pub const CONDITION_TYPE_MARIADB_ACCOUNT_READY: &str = "MariaDBAccountReady";

/// All constituent condition types of a `MariaDB`, in reconcile order.
pub const MARIADB_CONDITION_TYPES: [&str; 8] = [
    CONDITION_TYPE_INPUT_READY,
    CONDITION_TYPE_SERVICE_ACCOUNT_READY,
    CONDITION_TYPE_ROLE_READY,
    CONDITION_TYPE_ROLE_BINDING_READY,
    CONDITION_TYPE_EXPOSE_SERVICE_READY,
    CONDITION_TYPE_SERVICE_CONFIG_READY,
    CONDITION_TYPE_MARIADB_INITIALIZED,
    CONDITION_TYPE_DEPLOYMENT_READY,
];

// ============================================================================
// Reasons
// ============================================================================

/// Condition has not been evaluated yet.
///
/// **Usage:** every condition on first observation.
pub const REASON_INIT: &str = "Init";

/// Work has been requested and is in progress.
///
/// **Usage:** job running, pod starting, pod being recreated.
pub const REASON_REQUESTED: &str = "Requested";

/// The step failed.
///
/// **Usage:** API failures, missing secrets, invalid input, failed jobs.
pub const REASON_ERROR: &str = "Error";

/// The step completed.
pub const REASON_READY: &str = "Ready";

// ============================================================================
// Severities
// ============================================================================

/// Failure that needs operator attention
pub const SEVERITY_ERROR: &str = "Error";

/// Recoverable failure, usually retried
pub const SEVERITY_WARNING: &str = "Warning";

/// Progress report, not a failure
pub const SEVERITY_INFO: &str = "Info";

/// Rank used to pick the condition that `Ready` mirrors. Higher is more severe.
#[must_use]
pub fn severity_rank(severity: Option<&str>) -> u8 {
    match severity {
        Some(SEVERITY_ERROR) => 3,
        Some(SEVERITY_WARNING) => 2,
        Some(SEVERITY_INFO) => 1,
        _ => 0,
    }
}

// ============================================================================
// Messages
// ============================================================================

pub const MESSAGE_READY: &str = "Setup complete";
pub const MESSAGE_READY_INIT: &str = "Setup started";

pub const MESSAGE_INPUT_READY_INIT: &str = "Input data not started";
pub const MESSAGE_INPUT_READY: &str = "Input data complete";

pub const MESSAGE_SERVICE_ACCOUNT_READY_INIT: &str = "ServiceAccount create not started";
pub const MESSAGE_SERVICE_ACCOUNT_READY: &str = "ServiceAccount created";

pub const MESSAGE_ROLE_READY_INIT: &str = "Role create not started";
pub const MESSAGE_ROLE_READY: &str = "Role created";

pub const MESSAGE_ROLE_BINDING_READY_INIT: &str = "RoleBinding create not started";
pub const MESSAGE_ROLE_BINDING_READY: &str = "RoleBinding created";

pub const MESSAGE_EXPOSE_SERVICE_READY_INIT: &str = "Exposing service not started";
pub const MESSAGE_EXPOSE_SERVICE_READY: &str = "Exposing service completed";

pub const MESSAGE_SERVICE_CONFIG_READY_INIT: &str = "Service config create not started";
pub const MESSAGE_SERVICE_CONFIG_READY: &str = "Service config create completed";

pub const MESSAGE_MARIADB_INITIALIZED_INIT: &str = "MariaDB dbinit not started";
pub const MESSAGE_MARIADB_INITIALIZED_RUNNING: &str = "MariaDB dbinit in progress";
pub const MESSAGE_MARIADB_INITIALIZED: &str = "MariaDB dbinit completed";

pub const MESSAGE_DEPLOYMENT_READY_INIT: &str = "Deployment not started";
pub const MESSAGE_DEPLOYMENT_READY_RUNNING: &str = "Deployment in progress";
pub const MESSAGE_DEPLOYMENT_READY: &str = "Deployment completed";

pub const MESSAGE_MARIADB_ACCOUNT_READY: &str = "MariaDBAccount creation complete";

/// Formats the error message for a failed step, e.g.
/// `"Exposing service error occurred: <err>"`.
#[must_use]
pub fn error_message(step: &str, err: &dyn std::fmt::Display) -> String {
    format!("{step} error occurred: {err}")
}

/// Initial message for a constituent condition type.
#[must_use]
pub fn init_message(condition_type: &str) -> &'static str {
    match condition_type {
        CONDITION_TYPE_INPUT_READY => MESSAGE_INPUT_READY_INIT,
        CONDITION_TYPE_SERVICE_ACCOUNT_READY => MESSAGE_SERVICE_ACCOUNT_READY_INIT,
        CONDITION_TYPE_ROLE_READY => MESSAGE_ROLE_READY_INIT,
        CONDITION_TYPE_ROLE_BINDING_READY => MESSAGE_ROLE_BINDING_READY_INIT,
        CONDITION_TYPE_EXPOSE_SERVICE_READY => MESSAGE_EXPOSE_SERVICE_READY_INIT,
        CONDITION_TYPE_SERVICE_CONFIG_READY => MESSAGE_SERVICE_CONFIG_READY_INIT,
        CONDITION_TYPE_MARIADB_INITIALIZED => MESSAGE_MARIADB_INITIALIZED_INIT,
        CONDITION_TYPE_DEPLOYMENT_READY => MESSAGE_DEPLOYMENT_READY_INIT,
        _ => MESSAGE_READY_INIT,
    }
}

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
