// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes resource builders for MariaDB servers.
//!
//! This module provides pure functions to build the Kubernetes objects owned by a
//! `MariaDB`: the data PVC, `Service`, `Endpoints`, scripts `ConfigMap`, db-init
//! `Job`, workload `Pod` and the RBAC objects its service account needs. Every
//! builder is a deterministic function of the `MariaDB` and its inputs, so a
//! second reconcile of an unchanged resource produces identical objects.

use crate::constants::{
    API_GROUP_VERSION, DB_INIT_CONTAINER_NAME, DB_MAX_TIMEOUT_SECS, ENV_CONFIG_HASH,
    ENV_DB_MAX_TIMEOUT, ENV_DB_ROOT_PASSWORD, ENV_KOLLA_BOOTSTRAP, ENV_KOLLA_CONFIG_STRATEGY,
    KIND_MARIADB, KOLLA_CONFIG_STRATEGY_COPY_ALWAYS, MARIADB_CONTAINER_NAME, MARIADB_PORT,
    MARIADB_PORT_NAME, ROOT_PASSWORD_SELECTOR,
};
use crate::crd::MariaDB;
use crate::labels::{
    APP_LABEL, APP_NAME_MARIADB, COMPONENT_DATABASE, CR_LABEL, K8S_COMPONENT, K8S_INSTANCE,
    K8S_MANAGED_BY, K8S_NAME, MANAGED_BY_MARIADB_OPERATOR, OWNER_LABEL,
};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, EndpointAddress, EndpointPort,
    EndpointSubset, Endpoints, EnvVar, EnvVarSource, KeyToPath, PersistentVolumeClaim,
    PersistentVolumeClaimSpec, PersistentVolumeClaimVolumeSource, Pod, PodSpec, PodTemplateSpec,
    SecretKeySelector, SecretVolumeSource, Service, ServiceAccount, ServicePort, ServiceSpec,
    Volume, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::net::IpAddr;

// Container paths
const KOLLA_CONFIG_PATH: &str = "/var/lib/kolla/config_files";
const CONFIG_DATA_PATH: &str = "/var/lib/config-data";
const SCRIPTS_PATH: &str = "/usr/local/bin/container-scripts";
const MYSQL_DATA_PATH: &str = "/var/lib/mysql";
/// Mount point of the service certificate and key
pub const TLS_CERT_PATH: &str = "/var/lib/config-data/tls";
/// Mount point of the CA bundle
pub const TLS_CA_PATH: &str = "/var/lib/config-data/ca";

/// Script run by the db-init job
pub const BOOTSTRAP_SCRIPT: &str = "mysql_bootstrap.sh";
/// Kolla start configuration
pub const KOLLA_CONFIG_FILE: &str = "config.json";
/// Server configuration
pub const MY_CNF_FILE: &str = "my.cnf";
/// CA bundle key in the CA secret
pub const CA_BUNDLE_KEY: &str = "tls-ca-bundle.pem";

// Volume names
const VOLUME_KOLLA_CONFIG: &str = "kolla-config";
const VOLUME_CONFIG_DATA: &str = "config-data";
const VOLUME_OPERATOR_SCRIPTS: &str = "operator-scripts";
const VOLUME_MYSQL_DB: &str = "mysql-db";
const VOLUME_TLS: &str = "secret-tls";
const VOLUME_CA: &str = "ca-bundle";

// Mode for mounted scripts (rwxr-xr-x)
const SCRIPT_MODE: i32 = 0o755;

/// OpenShift SCC the server runs under
const SCC_ANYUID: &str = "anyuid";

// ============================================================================
// Names
// ============================================================================

/// `mariadb-<name>`: pod, configmap and RBAC objects
#[must_use]
pub fn mariadb_object_name(db: &MariaDB) -> String {
    db.rbac_resource_name()
}

/// `mysql-db-<name>`
#[must_use]
pub fn pvc_name(db: &MariaDB) -> String {
    format!("mysql-db-{}", db.name_any())
}

/// `<name>-db-init`
#[must_use]
pub fn db_init_job_name(db: &MariaDB) -> String {
    format!("{}-db-init", db.name_any())
}

/// The service shares the resource name so clients connect to `<name>.<ns>.svc`.
#[must_use]
pub fn service_name(db: &MariaDB) -> String {
    db.name_any()
}

// ============================================================================
// Labels and ownership
// ============================================================================

/// Labels used to select the pod of a `MariaDB`.
#[must_use]
pub fn build_selector_labels(name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(APP_LABEL.into(), APP_NAME_MARIADB.into());
    labels.insert(CR_LABEL.into(), format!("mariadb-{name}"));
    labels
}

/// Full label set placed on every owned object.
#[must_use]
pub fn build_labels(name: &str) -> BTreeMap<String, String> {
    let mut labels = build_selector_labels(name);
    labels.insert(OWNER_LABEL.into(), MANAGED_BY_MARIADB_OPERATOR.into());
    labels.insert(K8S_NAME.into(), APP_NAME_MARIADB.into());
    labels.insert(K8S_INSTANCE.into(), name.into());
    labels.insert(K8S_COMPONENT.into(), COMPONENT_DATABASE.into());
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_MARIADB_OPERATOR.into());
    labels
}

/// Controller owner reference so the object is garbage collected with its `MariaDB`.
#[must_use]
pub fn build_owner_references(db: &MariaDB) -> Vec<OwnerReference> {
    vec![OwnerReference {
        api_version: API_GROUP_VERSION.to_string(),
        kind: KIND_MARIADB.to_string(),
        name: db.name_any(),
        uid: db.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }]
}

fn build_object_meta(db: &MariaDB, name: String) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: db.namespace(),
        labels: Some(build_labels(&db.name_any())),
        owner_references: Some(build_owner_references(db)),
        ..Default::default()
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Builds the data volume claim. `storage` has already been validated.
#[must_use]
pub fn build_pvc(db: &MariaDB, storage: Quantity) -> PersistentVolumeClaim {
    let mut requests = BTreeMap::new();
    requests.insert("storage".to_string(), storage);

    PersistentVolumeClaim {
        metadata: build_object_meta(db, pvc_name(db)),
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(requests),
                ..Default::default()
            }),
            storage_class_name: db.spec.storage_class.clone(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

// ============================================================================
// Network exposure
// ============================================================================

/// Where the database service points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceTarget {
    /// The pod managed by this operator
    Pod,
    /// An external server reachable by DNS name
    ExternalName(String),
    /// An external server by address, served through manual `Endpoints`
    ExternalIp(IpAddr),
}

/// Resolves the adoption redirect into a service target.
#[must_use]
pub fn service_target(db: &MariaDB) -> ServiceTarget {
    let host = db
        .spec
        .adoption_redirect
        .as_ref()
        .and_then(|r| r.host.as_deref())
        .map(str::trim)
        .filter(|h| !h.is_empty());

    match host {
        None => ServiceTarget::Pod,
        Some(host) => match host.parse::<IpAddr>() {
            Ok(ip) => ServiceTarget::ExternalIp(ip),
            Err(_) => ServiceTarget::ExternalName(host.to_string()),
        },
    }
}

fn database_service_port() -> ServicePort {
    ServicePort {
        name: Some(MARIADB_PORT_NAME.to_string()),
        port: MARIADB_PORT,
        protocol: Some("TCP".to_string()),
        target_port: Some(IntOrString::Int(MARIADB_PORT)),
        ..Default::default()
    }
}

/// Builds the database `Service` for the current redirect mode.
#[must_use]
pub fn build_service(db: &MariaDB) -> Service {
    let spec = match service_target(db) {
        ServiceTarget::Pod => ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(build_selector_labels(&db.name_any())),
            ports: Some(vec![database_service_port()]),
            ..Default::default()
        },
        ServiceTarget::ExternalName(host) => ServiceSpec {
            type_: Some("ExternalName".to_string()),
            external_name: Some(host),
            ports: Some(vec![database_service_port()]),
            ..Default::default()
        },
        ServiceTarget::ExternalIp(_) => ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            ports: Some(vec![database_service_port()]),
            ..Default::default()
        },
    };

    Service {
        metadata: build_object_meta(db, service_name(db)),
        spec: Some(spec),
        ..Default::default()
    }
}

/// Builds manual `Endpoints`, only when redirecting to an IP address.
#[must_use]
pub fn build_endpoints(db: &MariaDB) -> Option<Endpoints> {
    let ServiceTarget::ExternalIp(ip) = service_target(db) else {
        return None;
    };

    Some(Endpoints {
        metadata: build_object_meta(db, service_name(db)),
        subsets: Some(vec![EndpointSubset {
            addresses: Some(vec![EndpointAddress {
                ip: ip.to_string(),
                ..Default::default()
            }]),
            ports: Some(vec![EndpointPort {
                name: Some(MARIADB_PORT_NAME.to_string()),
                port: MARIADB_PORT,
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }]),
    })
}

// ============================================================================
// Configuration
// ============================================================================

/// Wraps rendered script and config files into the scripts `ConfigMap`.
#[must_use]
pub fn build_configmap(db: &MariaDB, data: BTreeMap<String, String>) -> ConfigMap {
    ConfigMap {
        metadata: build_object_meta(db, mariadb_object_name(db)),
        data: Some(data),
        ..Default::default()
    }
}

fn tls_secret_name(db: &MariaDB) -> Option<&str> {
    db.spec.tls.as_ref().and_then(|t| t.secret_name.as_deref())
}

fn ca_secret_name(db: &MariaDB) -> Option<&str> {
    db.spec.tls.as_ref().and_then(|t| t.ca_secret_name.as_deref())
}

fn config_map_volume(name: &str, volume: &str, items: &[(&str, &str)], mode: Option<i32>) -> Volume {
    Volume {
        name: volume.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: name.to_string(),
            items: Some(
                items
                    .iter()
                    .map(|(key, path)| KeyToPath {
                        key: (*key).to_string(),
                        path: (*path).to_string(),
                        mode,
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn secret_volume(secret: &str, volume: &str) -> Volume {
    Volume {
        name: volume.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Volumes shared by the pod and the db-init job.
#[must_use]
pub fn build_volumes(db: &MariaDB) -> Vec<Volume> {
    let configmap = mariadb_object_name(db);
    let mut volumes = vec![
        config_map_volume(
            &configmap,
            VOLUME_KOLLA_CONFIG,
            &[(KOLLA_CONFIG_FILE, KOLLA_CONFIG_FILE)],
            None,
        ),
        config_map_volume(
            &configmap,
            VOLUME_CONFIG_DATA,
            &[(MY_CNF_FILE, MY_CNF_FILE)],
            None,
        ),
        config_map_volume(
            &configmap,
            VOLUME_OPERATOR_SCRIPTS,
            &[(BOOTSTRAP_SCRIPT, BOOTSTRAP_SCRIPT)],
            Some(SCRIPT_MODE),
        ),
        Volume {
            name: VOLUME_MYSQL_DB.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: pvc_name(db),
                read_only: None,
            }),
            ..Default::default()
        },
    ];

    if let Some(secret) = tls_secret_name(db) {
        volumes.push(secret_volume(secret, VOLUME_TLS));
    }
    if let Some(secret) = ca_secret_name(db) {
        volumes.push(secret_volume(secret, VOLUME_CA));
    }

    volumes
}

fn mount(volume: &str, path: &str, read_only: bool) -> VolumeMount {
    VolumeMount {
        name: volume.to_string(),
        mount_path: path.to_string(),
        read_only: Some(read_only),
        ..Default::default()
    }
}

/// Mounts matching [`build_volumes`].
#[must_use]
pub fn build_volume_mounts(db: &MariaDB) -> Vec<VolumeMount> {
    let mut mounts = vec![
        mount(VOLUME_KOLLA_CONFIG, KOLLA_CONFIG_PATH, true),
        mount(VOLUME_CONFIG_DATA, CONFIG_DATA_PATH, true),
        mount(VOLUME_OPERATOR_SCRIPTS, SCRIPTS_PATH, true),
        mount(VOLUME_MYSQL_DB, MYSQL_DATA_PATH, false),
    ];

    if tls_secret_name(db).is_some() {
        mounts.push(mount(VOLUME_TLS, TLS_CERT_PATH, true));
    }
    if ca_secret_name(db).is_some() {
        mounts.push(mount(VOLUME_CA, TLS_CA_PATH, true));
    }

    mounts
}

fn env_value(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

// ============================================================================
// Init job
// ============================================================================

/// Builds the db-init job. The root password secret has already been validated.
#[must_use]
pub fn build_db_init_job(db: &MariaDB, image: &str, root_secret: &str) -> Job {
    let env = vec![
        env_value(ENV_KOLLA_CONFIG_STRATEGY, KOLLA_CONFIG_STRATEGY_COPY_ALWAYS),
        env_value(ENV_KOLLA_BOOTSTRAP, "True"),
        env_value(ENV_DB_MAX_TIMEOUT, &DB_MAX_TIMEOUT_SECS.to_string()),
        EnvVar {
            name: ENV_DB_ROOT_PASSWORD.to_string(),
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    name: root_secret.to_string(),
                    key: ROOT_PASSWORD_SELECTOR.to_string(),
                    optional: Some(false),
                }),
                ..Default::default()
            }),
            ..Default::default()
        },
    ];

    let container = Container {
        name: DB_INIT_CONTAINER_NAME.to_string(),
        image: Some(image.to_string()),
        command: Some(vec![format!("{SCRIPTS_PATH}/{BOOTSTRAP_SCRIPT}")]),
        env: Some(env),
        volume_mounts: Some(build_volume_mounts(db)),
        ..Default::default()
    };

    Job {
        metadata: build_object_meta(db, db_init_job_name(db)),
        spec: Some(JobSpec {
            backoff_limit: Some(6),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(build_labels(&db.name_any())),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    restart_policy: Some("OnFailure".to_string()),
                    service_account_name: Some(db.rbac_resource_name()),
                    containers: vec![container],
                    volumes: Some(build_volumes(db)),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

// ============================================================================
// Workload pod
// ============================================================================

/// Builds the server pod. `config_hash` lands in `CONFIG_HASH` so any
/// configuration change produces a different pod spec.
#[must_use]
pub fn build_pod(db: &MariaDB, image: &str, config_hash: &str) -> Pod {
    let container = Container {
        name: MARIADB_CONTAINER_NAME.to_string(),
        image: Some(image.to_string()),
        env: Some(vec![
            env_value(ENV_KOLLA_CONFIG_STRATEGY, KOLLA_CONFIG_STRATEGY_COPY_ALWAYS),
            env_value(ENV_CONFIG_HASH, config_hash),
        ]),
        ports: Some(vec![ContainerPort {
            name: Some(MARIADB_PORT_NAME.to_string()),
            container_port: MARIADB_PORT,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        volume_mounts: Some(build_volume_mounts(db)),
        ..Default::default()
    };

    Pod {
        metadata: build_object_meta(db, mariadb_object_name(db)),
        spec: Some(PodSpec {
            service_account_name: Some(db.rbac_resource_name()),
            containers: vec![container],
            volumes: Some(build_volumes(db)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

// ============================================================================
// RBAC
// ============================================================================

/// Builds the `ServiceAccount` the pod and job run as.
#[must_use]
pub fn build_service_account(db: &MariaDB) -> ServiceAccount {
    ServiceAccount {
        metadata: build_object_meta(db, db.rbac_resource_name()),
        ..Default::default()
    }
}

/// Rules granted to the server's service account.
#[must_use]
pub fn build_policy_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule {
            api_groups: Some(vec!["security.openshift.io".to_string()]),
            resources: Some(vec!["securitycontextconstraints".to_string()]),
            resource_names: Some(vec![SCC_ANYUID.to_string()]),
            verbs: vec!["use".to_string()],
            ..Default::default()
        },
        PolicyRule {
            api_groups: Some(vec![String::new()]),
            resources: Some(vec!["pods".to_string()]),
            verbs: ["create", "get", "list", "watch", "update", "patch", "delete"]
                .iter()
                .map(|v| (*v).to_string())
                .collect(),
            ..Default::default()
        },
    ]
}

#[must_use]
pub fn build_role(db: &MariaDB) -> Role {
    Role {
        metadata: build_object_meta(db, db.rbac_resource_name()),
        rules: Some(build_policy_rules()),
    }
}

#[must_use]
pub fn build_role_binding(db: &MariaDB) -> RoleBinding {
    let name = db.rbac_resource_name();
    RoleBinding {
        metadata: build_object_meta(db, name.clone()),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "Role".to_string(),
            name: name.clone(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name,
            namespace: db.namespace(),
            ..Default::default()
        }]),
    }
}

#[cfg(test)]
#[path = "mariadb_resources_tests.rs"]
mod mariadb_resources_tests;
