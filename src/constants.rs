// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the MariaDB operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all MariaDB CRDs
pub const API_GROUP: &str = "mariadb.openstack.org";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "mariadb.openstack.org/v1beta1";

/// Kind name for `MariaDB` resource
pub const KIND_MARIADB: &str = "MariaDB";

// ============================================================================
// Database Protocol Constants
// ============================================================================

/// Standard MySQL/MariaDB port
pub const MARIADB_PORT: i32 = 3306;

/// Name of the service port
pub const MARIADB_PORT_NAME: &str = "database";

/// Maximum time the bootstrap and probe scripts wait for the server (seconds)
pub const DB_MAX_TIMEOUT_SECS: u32 = 60;

/// MySQL user names are limited to 32 characters
pub const MAX_DATABASE_USER_NAME_LEN: usize = 32;

/// Length of generated account passwords
pub const GENERATED_PASSWORD_LEN: usize = 32;

/// Length of the random suffix appended to generated user names
pub const GENERATED_USER_SUFFIX_LEN: usize = 4;

// ============================================================================
// Secret Keys
// ============================================================================

/// Key in the root secret holding the root password
pub const ROOT_PASSWORD_SELECTOR: &str = "DbRootPassword";

/// Key in an account secret holding the account password
pub const DATABASE_PASSWORD_SELECTOR: &str = "DatabasePassword";

// ============================================================================
// Container Constants
// ============================================================================

/// Default MariaDB container image, used when neither the spec nor the
/// environment names one
pub const DEFAULT_MARIADB_IMAGE: &str =
    "quay.io/podified-antelope-centos9/openstack-mariadb:current-podified";

/// Environment variable carrying the default image
pub const DEFAULT_IMAGE_ENV: &str = "RELATED_IMAGE_MARIADB_IMAGE_URL_DEFAULT";

/// Name of the database container in the workload pod
pub const MARIADB_CONTAINER_NAME: &str = "mariadb";

/// Name of the init container in the db-init job
pub const DB_INIT_CONTAINER_NAME: &str = "mariadb-init";

/// Env var telling kolla to copy configuration on every start
pub const ENV_KOLLA_CONFIG_STRATEGY: &str = "KOLLA_CONFIG_STRATEGY";

/// Value for `KOLLA_CONFIG_STRATEGY`
pub const KOLLA_CONFIG_STRATEGY_COPY_ALWAYS: &str = "COPY_ALWAYS";

/// Env var enabling the kolla bootstrap path in the init job
pub const ENV_KOLLA_BOOTSTRAP: &str = "KOLLA_BOOTSTRAP";

/// Env var carrying the combined configuration hash
pub const ENV_CONFIG_HASH: &str = "CONFIG_HASH";

/// Env var carrying the root password into the init job
pub const ENV_DB_ROOT_PASSWORD: &str = "DB_ROOT_PASSWORD";

/// Env var carrying the server wait timeout into the scripts
pub const ENV_DB_MAX_TIMEOUT: &str = "DB_MAX_TIMEOUT";

// ============================================================================
// Storage Constants
// ============================================================================

/// Default PVC size when `storageRequest` is omitted
pub const DEFAULT_STORAGE_REQUEST: &str = "500M";

// ============================================================================
// Controller Requeue Constants
// ============================================================================

/// Requeue after the PVC was created or changed
pub const PVC_CHANGED_REQUEUE_SECS: u64 = 5;

/// Requeue while a referenced secret does not exist yet
pub const SECRET_MISSING_REQUEUE_SECS: u64 = 10;

/// Requeue while the db-init job is running
pub const JOB_RUNNING_REQUEUE_SECS: u64 = 5;

/// Requeue after deleting a drifted pod
pub const POD_RECREATE_REQUEUE_SECS: u64 = 5;

/// Requeue for a converged resource
pub const READY_REQUEUE_SECS: u64 = 300;

/// Requeue for a resource that is progressing
pub const NOT_READY_REQUEUE_SECS: u64 = 30;

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue duration for transient API errors
pub const TRANSIENT_ERROR_REQUEUE_SECS: u64 = 5;

/// Requeue for invalid specs (only an edit can fix them)
pub const INVALID_SPEC_REQUEUE_SECS: u64 = 300;

// ============================================================================
// Requeue Reasons (metric labels)
// ============================================================================

/// The PVC was created or changed
pub const REQUEUE_REASON_PVC_CHANGED: &str = "pvc_changed";

/// A referenced secret does not exist yet
pub const REQUEUE_REASON_SECRET_MISSING: &str = "secret_missing";

/// A watched object moved underneath the pass
pub const REQUEUE_REASON_TRANSIENT: &str = "transient_error";

/// The db-init job has not finished
pub const REQUEUE_REASON_JOB_RUNNING: &str = "job_running";

/// The db-init hash could not be recorded on the status
pub const REQUEUE_REASON_STATUS_CONFLICT: &str = "status_conflict";

/// The server pod is terminating or being recreated
pub const REQUEUE_REASON_POD_RECREATE: &str = "pod_recreate";

// ============================================================================
// Kubernetes API Constants
// ============================================================================

/// Page size for list calls against the API server
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Default field manager for server-side apply
pub const DEFAULT_FIELD_MANAGER: &str = "mariadb-operator";

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint
pub const HEALTH_SERVER_PATH: &str = "/healthz";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0:8080";
