// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic resource creation and update helpers for Kubernetes resources.
//!
//! This module provides the create-or-patch primitive every reconcile step is
//! built on. It reports whether the API server actually changed anything, which
//! the reconciler uses to decide when to stop a pass early (e.g. right after the
//! PVC was created).
//!
//! # Strategy
//!
//! - **Create** when the object does not exist
//! - **Server-side apply** (forced, with the operator's field manager) otherwise.
//!   The server only bumps `resourceVersion` when the applied fields differ, so an
//!   unchanged `resourceVersion` means the object was already converged.
//!
//! # Example
//!
//! ```rust,no_run
//! use mariadb_operator::reconcilers::resources::{create_or_patch, OperationResult};
//! use k8s_openapi::api::core::v1::ServiceAccount;
//! use kube::Client;
//!
//! async fn example(client: &Client, sa: ServiceAccount) -> mariadb_operator::errors::Result<()> {
//!     let (_, result) = create_or_patch(client, "openstack", &sa, "mariadb-operator").await?;
//!     if result != OperationResult::Unchanged {
//!         println!("service account changed");
//!     }
//!     Ok(())
//! }
//! ```

use crate::errors::{api_error_code, MariaDbError, Result};
use crate::metrics;
use kube::api::{DeleteParams, Patch, PatchParams, PostParams, PropagationPolicy};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use tracing::{debug, info};

/// What a create-or-patch call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationResult {
    Created,
    Updated,
    Unchanged,
}

impl OperationResult {
    #[must_use]
    pub fn changed(self) -> bool {
        self != Self::Unchanged
    }
}

/// Create a namespaced resource, or server-side apply it if it already exists.
///
/// # Returns
///
/// The object as stored by the API server and what changed.
///
/// # Errors
///
/// Returns an error if the resource has no name or any API call fails.
pub async fn create_or_patch<T>(
    client: &Client,
    namespace: &str,
    resource: &T,
    field_manager: &str,
) -> Result<(T, OperationResult)>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let name = resource
        .meta()
        .name
        .clone()
        .ok_or_else(|| MariaDbError::MissingField {
            field: format!("{}.metadata.name", T::kind(&())),
        })?;

    let api: Api<T> = Api::namespaced(client.clone(), namespace);

    debug!(
        namespace = %namespace,
        name = %name,
        kind = %T::kind(&()),
        "Creating or patching resource"
    );

    match api.get_opt(&name).await? {
        None => {
            debug!(
                "{} {}/{} does not exist, creating",
                T::kind(&()),
                namespace,
                name
            );
            // Same manager as the apply path so the first apply keeps ownership
            let params = PostParams {
                field_manager: Some(field_manager.to_string()),
                ..PostParams::default()
            };
            let created = api.create(&params, resource).await?;
            info!("Created {} {}/{}", T::kind(&()), namespace, name);
            metrics::record_resource_created(&T::kind(&()));
            Ok((created, OperationResult::Created))
        }
        Some(existing) => {
            let patched = api
                .patch(
                    &name,
                    &PatchParams::apply(field_manager).force(),
                    &Patch::Apply(resource),
                )
                .await?;

            if patched.resource_version() == existing.resource_version() {
                debug!("{} {}/{} unchanged", T::kind(&()), namespace, name);
                Ok((patched, OperationResult::Unchanged))
            } else {
                info!("Updated {} {}/{}", T::kind(&()), namespace, name);
                metrics::record_resource_updated(&T::kind(&()));
                Ok((patched, OperationResult::Updated))
            }
        }
    }
}

/// Delete a namespaced resource, treating "already gone" as success.
///
/// Dependents are removed in the background.
///
/// # Returns
///
/// `true` if a delete was issued for an existing object.
///
/// # Errors
///
/// Returns any API error other than 404.
pub async fn delete_if_exists<T>(client: &Client, namespace: &str, name: &str) -> Result<bool>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let params = DeleteParams {
        propagation_policy: Some(PropagationPolicy::Background),
        ..DeleteParams::default()
    };

    match api.delete(name, &params).await {
        Ok(_) => {
            info!("Deleted {} {}/{}", T::kind(&()), namespace, name);
            metrics::record_resource_deleted(&T::kind(&()));
            Ok(true)
        }
        Err(e) if api_error_code(&e) == Some(404) => {
            debug!("{} {}/{} already deleted", T::kind(&()), namespace, name);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
