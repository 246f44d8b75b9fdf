// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic finalizer management for Kubernetes resources.
//!
//! This module provides reusable functions for adding and removing finalizers on
//! namespaced resources. The account rotation protocol uses them to mark accounts
//! as "in use" by a consumer.
//!
//! The finalizer list is written with a JSON merge patch that carries the
//! `resourceVersion` the list was computed from, so two writers racing on the same
//! object cannot silently drop each other's finalizers: the loser gets a 409 and
//! retries on its next pass.
//!
//! # Example
//!
//! ```rust,no_run
//! use mariadb_operator::crd::MariaDBAccount;
//! use mariadb_operator::reconcilers::finalizers::ensure_finalizer;
//! use kube::Client;
//!
//! async fn example(client: &Client, account: &MariaDBAccount) -> anyhow::Result<()> {
//!     ensure_finalizer(client, account, "openstack.org/keystone").await?;
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::info;

/// Finalizer list with `finalizer` added, or `None` if it is already present.
#[must_use]
pub fn with_finalizer(current: &[String], finalizer: &str) -> Option<Vec<String>> {
    if current.iter().any(|f| f == finalizer) {
        return None;
    }
    let mut finalizers = current.to_vec();
    finalizers.push(finalizer.to_string());
    Some(finalizers)
}

/// Finalizer list with `finalizer` removed, or `None` if it is absent.
#[must_use]
pub fn without_finalizer(current: &[String], finalizer: &str) -> Option<Vec<String>> {
    if !current.iter().any(|f| f == finalizer) {
        return None;
    }
    Some(
        current
            .iter()
            .filter(|f| f.as_str() != finalizer)
            .cloned()
            .collect(),
    )
}

/// Merge patch replacing the finalizer list, guarded by `resource_version`.
#[must_use]
pub fn finalizer_patch(finalizers: &[String], resource_version: Option<&str>) -> serde_json::Value {
    let mut patch = json!({ "metadata": { "finalizers": finalizers } });
    if let Some(rv) = resource_version {
        patch["metadata"]["resourceVersion"] = json!(rv);
    }
    patch
}

async fn write_finalizers<T>(client: &Client, resource: &T, finalizers: &[String]) -> Result<T>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let namespace = resource.namespace().unwrap_or_default();
    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = finalizer_patch(finalizers, resource.meta().resource_version.as_deref());
    let updated = api
        .patch(
            &resource.name_any(),
            &PatchParams::default(),
            &Patch::Merge(&patch),
        )
        .await?;
    Ok(updated)
}

/// Add `finalizer` to `resource` if it is missing.
///
/// # Errors
///
/// Returns an error if the patch fails, including a 409 when the object changed
/// since it was read.
pub async fn ensure_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<bool>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let current = resource.meta().finalizers.clone().unwrap_or_default();
    let Some(finalizers) = with_finalizer(&current, finalizer) else {
        return Ok(false);
    };

    info!(
        "Adding finalizer {} to {}/{} {}",
        finalizer,
        resource.namespace().unwrap_or_default(),
        resource.name_any(),
        T::kind(&())
    );
    write_finalizers(client, resource, &finalizers).await?;
    Ok(true)
}

/// Remove `finalizer` from `resource` if it is present.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn remove_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<bool>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let current = resource.meta().finalizers.clone().unwrap_or_default();
    let Some(finalizers) = without_finalizer(&current, finalizer) else {
        return Ok(false);
    };

    info!(
        "Removing finalizer {} from {}/{} {}",
        finalizer,
        resource.namespace().unwrap_or_default(),
        resource.name_any(),
        T::kind(&())
    );
    write_finalizers(client, resource, &finalizers).await?;
    Ok(true)
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
