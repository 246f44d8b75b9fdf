// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for MariaDB management.
//!
//! This module defines the Kubernetes Custom Resource Definitions used by the
//! operator to manage MariaDB database servers declaratively.
//!
//! # Resource Types
//!
//! - [`MariaDB`] - A single MariaDB server with its storage, service and init job
//! - [`MariaDBAccount`] - A database account bound to a generated credentials secret,
//!   consumed by sibling operators
//!
//! # Example: Creating a MariaDB
//!
//! ```rust,no_run
//! use mariadb_operator::crd::{MariaDBSpec, TlsSpec};
//!
//! let spec = MariaDBSpec {
//!     secret: Some("osp-secret".to_string()),
//!     storage_class: Some("local-storage".to_string()),
//!     storage_request: "10G".to_string(),
//!     container_image: String::new(),
//!     adoption_redirect: None,
//!     tls: Some(TlsSpec {
//!         secret_name: Some("cert-mariadb-svc".to_string()),
//!         ca_secret_name: Some("combined-ca-bundle".to_string()),
//!     }),
//! };
//! ```

use crate::constants::DEFAULT_STORAGE_REQUEST;
use crate::status_reasons::{CONDITION_TYPE_MARIADB_ACCOUNT_READY, STATUS_TRUE};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition, e.g. Ready, `DeploymentReady`, `ServiceConfigReady`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Severity of a False condition: Error, Warning or Info.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Redirect target used while adopting an existing database server.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdoptionRedirectSpec {
    /// Hostname or IP address of the external server. An IP produces a
    /// selector-less `Service` with `Endpoints`, a hostname an `ExternalName` `Service`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// TLS material mounted into the database pod.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TlsSpec {
    /// Secret containing `tls.crt` and `tls.key` for the service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,

    /// Secret containing the CA bundle (`tls-ca-bundle.pem`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_secret_name: Option<String>,
}

/// `MariaDB` defines the desired state of a MariaDB server.
///
/// # Example
///
/// ```yaml
/// apiVersion: mariadb.openstack.org/v1beta1
/// kind: MariaDB
/// metadata:
///   name: openstack
///   namespace: openstack
/// spec:
///   secret: osp-secret
///   storageClass: local-storage
///   storageRequest: 500M
///   containerImage: quay.io/podified-antelope-centos9/openstack-mariadb:current-podified
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "mariadb.openstack.org",
    version = "v1beta1",
    kind = "MariaDB",
    namespaced,
    doc = "MariaDB is a single MariaDB server with its persistent storage, service, configuration and db-init job.",
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.conditions[0].status","description":"Status"}"#,
    printcolumn = r#"{"name":"Message","type":"string","jsonPath":".status.conditions[0].message","description":"Message"}"#
)]
#[kube(status = "MariaDBStatus")]
#[serde(rename_all = "camelCase")]
pub struct MariaDBSpec {
    /// Name of the secret holding the root password under `DbRootPassword`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Storage class for the data volume. Uses the cluster default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    /// Size of the data volume as a Kubernetes quantity (e.g. `500M`, `10Gi`).
    #[serde(default = "default_storage_request")]
    pub storage_request: String,

    /// Container image. The operator default is used when empty.
    #[serde(default)]
    pub container_image: String,

    /// Redirect used while adopting an external database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adoption_redirect: Option<AdoptionRedirectSpec>,

    /// TLS secrets mounted into the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsSpec>,
}

fn default_storage_request() -> String {
    DEFAULT_STORAGE_REQUEST.to_string()
}

impl Default for MariaDBSpec {
    fn default() -> Self {
        Self {
            secret: None,
            storage_class: None,
            storage_request: default_storage_request(),
            container_image: String::new(),
            adoption_redirect: None,
            tls: None,
        }
    }
}

/// `MariaDB` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MariaDBStatus {
    /// Hash of the db-init job definition that last completed.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub db_init_hash: String,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl MariaDB {
    /// Name shared by the `ServiceAccount`, `Role` and `RoleBinding`.
    #[must_use]
    pub fn rbac_resource_name(&self) -> String {
        format!("mariadb-{}", self.name_any())
    }
}

/// `MariaDBAccount` is a database user provisioned in a `MariaDB` server on behalf
/// of a consumer operator.
///
/// The password lives in the referenced secret under `DatabasePassword`. The
/// `mariaDBDatabaseName` label records which logical database the account serves.
///
/// # Example
///
/// ```yaml
/// apiVersion: mariadb.openstack.org/v1beta1
/// kind: MariaDBAccount
/// metadata:
///   name: keystone
///   labels:
///     mariaDBDatabaseName: keystone
///   finalizers:
///     - openstack.org/keystone
/// spec:
///   userName: keystone_a9x2
///   secret: keystone-db-secret
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "mariadb.openstack.org",
    version = "v1beta1",
    kind = "MariaDBAccount",
    namespaced,
    doc = "MariaDBAccount is a database account whose password lives in a generated secret.",
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.conditions[0].status","description":"Status"}"#,
    printcolumn = r#"{"name":"Message","type":"string","jsonPath":".status.conditions[0].message","description":"Message"}"#
)]
#[kube(status = "MariaDBAccountStatus")]
#[serde(rename_all = "camelCase")]
pub struct MariaDBAccountSpec {
    /// Database user name.
    pub user_name: String,

    /// Name of the secret holding the password.
    pub secret: String,
}

/// `MariaDBAccount` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MariaDBAccountStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl MariaDBAccount {
    /// True once the account controller has reported the account as provisioned.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().is_some_and(|s| {
            condition_is_true(&s.conditions, CONDITION_TYPE_MARIADB_ACCOUNT_READY)
        })
    }

    /// The finalizers currently on the account.
    #[must_use]
    pub fn finalizer_list(&self) -> Vec<String> {
        self.metadata.finalizers.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|x| x == finalizer))
    }
}

fn condition_is_true(conditions: &[Condition], condition_type: &str) -> bool {
    conditions
        .iter()
        .any(|c| c.r#type == condition_type && c.status == STATUS_TRUE)
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
