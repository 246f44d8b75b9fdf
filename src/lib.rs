// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # mariadb-operator - MariaDB Operator for Kubernetes
//!
//! A Kubernetes operator that runs single-instance MariaDB servers declared
//! through the `MariaDB` custom resource, and the account rotation protocol
//! shared by services that consume `MariaDBAccount`s.
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types (`MariaDB`, `MariaDBAccount`)
//! - [`reconcilers`] - The ordered `MariaDB` reconcile steps
//! - [`mariadb_resources`] - Builders for every child object
//! - [`accounts`] - Account provisioning and finalizer rotation
//! - [`harness`] - Reusable account rotation test suites for consumer controllers
//! - [`context`] - Shared controller context
//! - [`config`] - Command-line and environment configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use mariadb_operator::crd::{MariaDB, MariaDBSpec};
//!
//! let db = MariaDB::new(
//!     "openstack",
//!     MariaDBSpec {
//!         secret: Some("osp-secret".to_string()),
//!         storage_class: Some("local-storage".to_string()),
//!         storage_request: "10G".to_string(),
//!         container_image: String::new(),
//!         adoption_redirect: None,
//!         tls: None,
//!     },
//! );
//! ```
//!
//! ## Features
//!
//! - **Declarative** - Service account, RBAC, storage, service, config, init job and pod
//! - **Status Tracking** - One condition per step plus an aggregate `Ready`
//! - **Credential Rotation** - Finalizer hand-off between old and new accounts

pub mod accounts;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod harness;
pub mod labels;
pub mod mariadb_resources;
pub mod metrics;
pub mod reconcilers;
pub mod status_reasons;
