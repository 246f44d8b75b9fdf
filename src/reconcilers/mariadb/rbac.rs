// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service account, role and role binding for the database pod.
//!
//! The three objects are applied in order. The first failure marks its own
//! condition False with severity Warning and ends the pass.

use super::types::*;
use crate::mariadb_resources::{build_role, build_role_binding, build_service_account};
use crate::status_reasons::{
    CONDITION_TYPE_ROLE_BINDING_READY, CONDITION_TYPE_ROLE_READY,
    CONDITION_TYPE_SERVICE_ACCOUNT_READY, MESSAGE_ROLE_BINDING_READY, MESSAGE_ROLE_READY,
    MESSAGE_SERVICE_ACCOUNT_READY,
};
use kube::core::NamespaceResourceScope;
use kube::Resource;

async fn apply_rbac_object<T>(
    ctx: &Context,
    namespace: &str,
    object: &T,
    condition_type: &str,
    ready_message: &str,
    status: &mut MariaDBStatusUpdater,
) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    match create_or_patch(&ctx.client, namespace, object, ctx.field_manager()).await {
        Ok(_) => {
            status.mark_true(condition_type, ready_message);
            Ok(())
        }
        Err(e) => {
            warn!(
                "Failed to apply {} {}/{}: {}",
                T::kind(&()),
                namespace,
                object.name_any(),
                e
            );
            status.mark_false(
                condition_type,
                REASON_ERROR,
                SEVERITY_WARNING,
                &error_message(&T::kind(&()), &e),
            );
            Err(e)
        }
    }
}

/// Reconcile the RBAC objects the pod and db-init job run under.
///
/// # Errors
///
/// Returns the first API error; later objects are not attempted.
pub async fn reconcile_rbac(
    ctx: &Context,
    db: &MariaDB,
    status: &mut MariaDBStatusUpdater,
) -> Result<()> {
    let namespace = db.namespace().unwrap_or_default();
    debug!("Reconciling RBAC for MariaDB {}/{}", namespace, db.name_any());

    apply_rbac_object(
        ctx,
        &namespace,
        &build_service_account(db),
        CONDITION_TYPE_SERVICE_ACCOUNT_READY,
        MESSAGE_SERVICE_ACCOUNT_READY,
        status,
    )
    .await?;

    apply_rbac_object(
        ctx,
        &namespace,
        &build_role(db),
        CONDITION_TYPE_ROLE_READY,
        MESSAGE_ROLE_READY,
        status,
    )
    .await?;

    apply_rbac_object(
        ctx,
        &namespace,
        &build_role_binding(db),
        CONDITION_TYPE_ROLE_BINDING_READY,
        MESSAGE_ROLE_BINDING_READY,
        status,
    )
    .await
}

#[cfg(test)]
#[path = "rbac_tests.rs"]
mod rbac_tests;
