// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Integration tests against a live cluster with the CRDs installed and the
//! operator running.
//!
//! Run with: cargo test --test simple_integration -- --ignored

use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret, Service, ServiceAccount};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::client::Client;
use mariadb_operator::accounts::{AccountRotation, AccountStore, KubeAccountStore};
use mariadb_operator::constants::{API_GROUP, ROOT_PASSWORD_SELECTOR};
use mariadb_operator::crd::{MariaDB, MariaDBSpec};
use mariadb_operator::status_reasons::CONDITION_TYPE_EXPOSE_SERVICE_READY;
use std::collections::BTreeMap;
use std::time::Duration;

// ============================================================================
// Helper Functions
// ============================================================================

/// Test helper to check if running in a Kubernetes cluster
async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => {
            println!("✓ Successfully connected to Kubernetes cluster");
            Some(client)
        }
        Err(e) => {
            eprintln!("⊘ Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

/// Create a test namespace
async fn create_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    let mut labels = BTreeMap::new();
    labels.insert("test".to_string(), "integration".to_string());
    labels.insert("managed-by".to_string(), "mariadb-operator-test".to_string());

    let test_ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    };

    match namespaces.create(&PostParams::default(), &test_ns).await {
        Ok(_) => {
            println!("✓ Created test namespace: {name}");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            println!("  Test namespace already exists: {name}");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Delete a test namespace
async fn delete_test_namespace(client: &Client, name: &str) {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    match namespaces.delete(name, &DeleteParams::default()).await {
        Ok(_) => println!("✓ Deleted test namespace: {name}"),
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            println!("  Test namespace already deleted: {name}");
        }
        Err(e) => eprintln!("⚠ Failed to delete test namespace {name}: {e}"),
    }
}

/// Poll `get_opt` until the object exists.
async fn wait_for<K>(api: &Api<K>, name: &str, timeout: Duration) -> Option<K>
where
    K: Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if let Ok(Some(obj)) = api.get_opt(name).await {
            return Some(obj);
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    None
}

// ============================================================================
// Basic Connectivity Tests
// ============================================================================

#[tokio::test]
#[ignore] // Run with: cargo test --test simple_integration -- --ignored
async fn test_kubernetes_connectivity() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };

    let namespaces: Api<Namespace> = Api::all(client);
    let ns_list = namespaces
        .list(&ListParams::default().limit(5))
        .await
        .expect("Failed to list namespaces");
    assert!(!ns_list.items.is_empty(), "Expected at least one namespace");
}

#[tokio::test]
#[ignore]
async fn test_crds_installed() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };

    let crds: Api<CustomResourceDefinition> = Api::all(client);
    let crd_list = crds.list(&ListParams::default()).await.unwrap();
    let mut names: Vec<String> = crd_list
        .items
        .iter()
        .filter(|crd| crd.spec.group == API_GROUP)
        .map(|crd| crd.spec.names.plural.clone())
        .collect();
    names.sort();

    assert!(names.contains(&"mariadbs".to_string()), "mariadbs CRD missing");
    assert!(
        names.contains(&"mariadbaccounts".to_string()),
        "mariadbaccounts CRD missing"
    );
}

// ============================================================================
// MariaDB Tests
// ============================================================================

#[tokio::test]
#[ignore]
async fn test_mariadb_creates_children() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    let namespace = "mariadb-it-children";
    create_test_namespace(&client, namespace).await.unwrap();

    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let mut root = BTreeMap::new();
    root.insert(ROOT_PASSWORD_SELECTOR.to_string(), "integration".to_string());
    secrets
        .create(
            &PostParams::default(),
            &Secret {
                metadata: ObjectMeta {
                    name: Some("osp-secret".to_string()),
                    ..Default::default()
                },
                string_data: Some(root),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let mariadbs: Api<MariaDB> = Api::namespaced(client.clone(), namespace);
    let db = MariaDB::new(
        "openstack",
        MariaDBSpec {
            secret: Some("osp-secret".to_string()),
            ..MariaDBSpec::default()
        },
    );
    mariadbs.create(&PostParams::default(), &db).await.unwrap();

    let timeout = Duration::from_secs(60);
    let sa: Api<ServiceAccount> = Api::namespaced(client.clone(), namespace);
    assert!(wait_for(&sa, "mariadb-openstack", timeout).await.is_some());
    let services: Api<Service> = Api::namespaced(client.clone(), namespace);
    assert!(wait_for(&services, "openstack", timeout).await.is_some());
    let config_maps: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    assert!(wait_for(&config_maps, "mariadb-openstack", timeout)
        .await
        .is_some());

    let db = mariadbs.get("openstack").await.unwrap();
    let conditions = db.status.map(|s| s.conditions).unwrap_or_default();
    assert!(conditions
        .iter()
        .any(|c| c.r#type == CONDITION_TYPE_EXPOSE_SERVICE_READY && c.status == "True"));

    delete_test_namespace(&client, namespace).await;
}

// ============================================================================
// Account Rotation Tests
// ============================================================================

#[tokio::test]
#[ignore]
async fn test_account_rotation_against_api_server() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    let namespace = "mariadb-it-accounts";
    create_test_namespace(&client, namespace).await.unwrap();

    let finalizer = "openstack.org/integration";
    let store = KubeAccountStore::new(client.clone());
    let rotation = AccountRotation::new(&store, namespace, "integration", finalizer);

    let status = rotation.reconcile("it-old", "integration").await.unwrap();
    assert!(status.account.has_finalizer(finalizer));
    store.mark_ready(namespace, "it-old").await.unwrap();

    rotation.reconcile("it-new", "integration").await.unwrap();
    let old = store.get_account(namespace, "it-old").await.unwrap().unwrap();
    assert!(old.has_finalizer(finalizer), "old account released too early");

    store.mark_ready(namespace, "it-new").await.unwrap();
    assert!(rotation.reconcile("it-new", "integration").await.unwrap().ready);
    let old = store.get_account(namespace, "it-old").await.unwrap().unwrap();
    assert!(!old.has_finalizer(finalizer));

    rotation.release_all(Some("it-new")).await.unwrap();
    let new = store.get_account(namespace, "it-new").await.unwrap().unwrap();
    assert!(!new.has_finalizer(finalizer));

    delete_test_namespace(&client, namespace).await;
}
