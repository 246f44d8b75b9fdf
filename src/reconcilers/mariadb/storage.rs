// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Persistent volume claim for the database data directory.

use super::types::*;
use crate::constants::{PVC_CHANGED_REQUEUE_SECS, REQUEUE_REASON_PVC_CHANGED};
use crate::mariadb_resources::build_pvc;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// Create or patch the data PVC.
///
/// A claim that was just created or resized usually needs a moment to bind, so
/// any actual change ends the pass with a short requeue.
///
/// # Errors
///
/// Returns any API error from the create-or-patch.
pub async fn reconcile_pvc(ctx: &Context, db: &MariaDB, storage: &Quantity) -> Result<StepOutcome> {
    let namespace = db.namespace().unwrap_or_default();
    let pvc = build_pvc(db, storage.clone());

    let (_, result) = create_or_patch(&ctx.client, &namespace, &pvc, ctx.field_manager()).await?;
    if result.changed() {
        info!(
            "PersistentVolumeClaim for MariaDB {}/{} {:?}, requeueing",
            namespace,
            db.name_any(),
            result
        );
        return Ok(requeue_secs(PVC_CHANGED_REQUEUE_SECS, REQUEUE_REASON_PVC_CHANGED));
    }

    Ok(StepOutcome::next())
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod storage_tests;
