// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and MariaDB-specific labels/annotations
//! to ensure consistency across all resources created by the controller.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture (e.g., "database")
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application (e.g., "mariadb")
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Application name for MariaDB workloads
pub const APP_NAME_MARIADB: &str = "mariadb";

/// Component value for database servers
pub const COMPONENT_DATABASE: &str = "database";

/// Value for `app.kubernetes.io/managed-by`
pub const MANAGED_BY_MARIADB_OPERATOR: &str = "mariadb-operator";

// ============================================================================
// Selector Labels
// ============================================================================

/// Application selector label
pub const APP_LABEL: &str = "app";

/// Per-instance selector label, value `mariadb-<name>`
pub const CR_LABEL: &str = "cr";

/// Owner label, value `mariadb-operator`
pub const OWNER_LABEL: &str = "owner";

// ============================================================================
// Reverse-index Labels
// ============================================================================

/// Back-reference placed on TLS/CA secrets naming the `MariaDB` that consumes them.
/// Changes to a labeled secret re-trigger that `MariaDB`.
pub const MARIADB_REF_LABEL: &str = "mariadb-ref";

/// Label on a `MariaDBAccount` naming the logical database it serves
pub const MARIADB_DATABASE_NAME_LABEL: &str = "mariaDBDatabaseName";

// ============================================================================
// Annotations
// ============================================================================

/// Annotation on the db-init `Job` recording the hash of its definition
pub const JOB_HASH_ANNOTATION: &str = "mariadb.openstack.org/job-hash";

// ============================================================================
// Finalizers
// ============================================================================

/// Prefix for finalizers that consumer operators place on accounts
pub const ACCOUNT_FINALIZER_PREFIX: &str = "openstack.org/";

/// Builds the finalizer a consumer places on the accounts it uses,
/// e.g. `openstack.org/keystone`.
#[must_use]
pub fn account_finalizer(consumer: &str) -> String {
    format!("{ACCOUNT_FINALIZER_PREFIX}{consumer}")
}
