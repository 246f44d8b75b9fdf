// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Network exposure of the database: the `Service` and, when redirecting to an
//! external IP, a manually managed `Endpoints` object.
//!
//! With a pod selector the endpoints controller owns the `Endpoints` object of
//! the same name. Only an `Endpoints` object this operator created for an IP
//! redirect is ever deleted.

use super::types::*;
use crate::labels::{MANAGED_BY_MARIADB_OPERATOR, OWNER_LABEL};
use crate::mariadb_resources::{build_endpoints, build_service, service_name};
use crate::status_reasons::{CONDITION_TYPE_EXPOSE_SERVICE_READY, MESSAGE_EXPOSE_SERVICE_READY};

/// True when `endpoints` was created by this operator for `db` and is no longer wanted.
#[must_use]
pub fn is_owned_redirect_endpoints(endpoints: &Endpoints, db: &MariaDB) -> bool {
    let managed = endpoints
        .labels()
        .get(OWNER_LABEL)
        .is_some_and(|v| v == MANAGED_BY_MARIADB_OPERATOR);
    let owned = endpoints.owner_references().iter().any(|r| {
        r.controller == Some(true) && db.metadata.uid.as_deref() == Some(r.uid.as_str())
    });
    managed && owned
}

async fn apply_exposure(ctx: &Context, db: &MariaDB, namespace: &str) -> Result<()> {
    create_or_patch(&ctx.client, namespace, &build_service(db), ctx.field_manager()).await?;

    if let Some(endpoints) = build_endpoints(db) {
        create_or_patch(&ctx.client, namespace, &endpoints, ctx.field_manager()).await?;
        return Ok(());
    }

    let api: Api<Endpoints> = Api::namespaced(ctx.client.clone(), namespace);
    let name = service_name(db);
    if let Some(existing) = api.get_opt(&name).await? {
        if is_owned_redirect_endpoints(&existing, db) {
            info!(
                "Removing stale redirect Endpoints {}/{} for MariaDB",
                namespace, name
            );
            delete_if_exists::<Endpoints>(&ctx.client, namespace, &name).await?;
        }
    }
    Ok(())
}

/// Reconcile the database `Service` and redirect `Endpoints`.
///
/// # Errors
///
/// Returns any API error after marking `ExposeServiceReady=False` with severity Warning.
pub async fn reconcile_service(
    ctx: &Context,
    db: &MariaDB,
    status: &mut MariaDBStatusUpdater,
) -> Result<()> {
    let namespace = db.namespace().unwrap_or_default();

    match apply_exposure(ctx, db, &namespace).await {
        Ok(()) => {
            status.mark_true(CONDITION_TYPE_EXPOSE_SERVICE_READY, MESSAGE_EXPOSE_SERVICE_READY);
            Ok(())
        }
        Err(e) => {
            warn!(
                "Failed to expose MariaDB {}/{}: {}",
                namespace,
                db.name_any(),
                e
            );
            status.mark_false(
                CONDITION_TYPE_EXPOSE_SERVICE_READY,
                REASON_ERROR,
                SEVERITY_WARNING,
                &error_message("Exposing service", &e),
            );
            Err(e)
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
