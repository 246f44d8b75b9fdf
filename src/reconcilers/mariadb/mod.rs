// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `MariaDB` reconciliation logic.
//!
//! A pass walks a fixed sequence of idempotent steps, each reporting progress on
//! its own condition. Any step may end the pass early, either with an error or
//! with a requeue while something converges. The status collected so far is
//! persisted on every exit path.
//!
//! ## Module Structure
//!
//! - [`validation`] - Spec validation (`InputReady`)
//! - [`rbac`] - Service account, role and role binding
//! - [`storage`] - Data PVC
//! - [`service`] - `Service` and redirect `Endpoints` (`ExposeServiceReady`)
//! - [`config`] - Scripts `ConfigMap`, TLS secrets and config hash (`ServiceConfigReady`)
//! - [`job`] - db-init job runner (`MariaDBInitialized`)
//! - [`pod`] - Server pod (`DeploymentReady`)
//! - [`types`] - Shared types and imports

pub mod config;
pub mod job;
pub mod pod;
pub mod rbac;
pub mod service;
pub mod storage;
pub mod types;
pub mod validation;

use crate::constants::{NOT_READY_REQUEUE_SECS, READY_REQUEUE_SECS};
use crate::metrics;
use crate::reconcilers::retry::retry_api_call;
use crate::status_reasons::MARIADB_CONDITION_TYPES;
use std::sync::Arc;
use std::time::Instant;
#[allow(clippy::wildcard_imports)]
use types::*;

/// Run every reconcile step in order against `status`.
///
/// # Returns
///
/// `Some(requeue)` when a step ended the pass early, `None` when all steps ran.
///
/// # Errors
///
/// Returns the first step error.
pub async fn run_steps(
    ctx: &Context,
    db: &MariaDB,
    status: &mut MariaDBStatusUpdater,
) -> Result<Option<Requeue>> {
    let validated = validation::reconcile_input(db, ctx.default_image(), status)?;

    rbac::reconcile_rbac(ctx, db, status).await?;

    if let StepOutcome::Requeue(requeue) =
        storage::reconcile_pvc(ctx, db, &validated.storage).await?
    {
        return Ok(Some(requeue));
    }

    service::reconcile_service(ctx, db, status).await?;

    let config_hash = match config::reconcile_config(ctx, db, status).await? {
        StepOutcome::Continue(hash) => hash,
        StepOutcome::Requeue(requeue) => return Ok(Some(requeue)),
    };

    if let StepOutcome::Requeue(requeue) =
        job::reconcile_db_init(ctx, db, &validated.image, &validated.root_secret, status).await?
    {
        return Ok(Some(requeue));
    }

    match pod::reconcile_pod(ctx, db, &validated.image, &config_hash, status).await? {
        StepOutcome::Requeue(requeue) => Ok(Some(requeue)),
        StepOutcome::Continue(()) => Ok(None),
    }
}

/// Requeue delay after a pass in which every step ran.
#[must_use]
pub fn completed_requeue(ready: bool) -> Duration {
    if ready {
        Duration::from_secs(READY_REQUEUE_SECS)
    } else {
        Duration::from_secs(NOT_READY_REQUEUE_SECS)
    }
}

/// Reconcile one `MariaDB`.
///
/// The object is re-read first so the pass works from the latest
/// `resourceVersion`; a `MariaDB` that no longer exists is a no-op.
///
/// # Errors
///
/// Returns the step error, or the status write error if the steps succeeded.
pub async fn reconcile_mariadb(db: Arc<MariaDB>, ctx: Arc<Context>) -> Result<Action> {
    let start = Instant::now();
    let namespace = db.namespace().unwrap_or_default();
    let name = db.name_any();

    info!("Reconciling MariaDB: {}/{}", namespace, name);

    let api: Api<MariaDB> = Api::namespaced(ctx.client.clone(), &namespace);
    let op_name = format!("get MariaDB {namespace}/{name}");
    let Some(db) = retry_api_call(|| api.get_opt(&name), &op_name).await? else {
        debug!("MariaDB {}/{} no longer exists, nothing to do", namespace, name);
        return Ok(Action::await_change());
    };

    let mut status = MariaDBStatusUpdater::new(&db);
    if status.init_conditions(&MARIADB_CONDITION_TYPES) {
        debug!("Initializing conditions for MariaDB {}/{}", namespace, name);
        status.finish();
        status.apply(&ctx.client).await?;
    }

    let result = run_steps(&ctx, &db, &mut status).await;

    status.finish();
    let persisted = status.apply(&ctx.client).await;

    let outcome = match (result, persisted) {
        (Err(e), persisted) => {
            if let Err(persist_err) = persisted {
                warn!(
                    "Failed to persist status for MariaDB {}/{}: {}",
                    namespace, name, persist_err
                );
            }
            Err(e)
        }
        (Ok(_), Err(persist_err)) => Err(persist_err),
        (Ok(Some(requeue)), Ok(_)) => {
            metrics::record_reconciliation_requeue("MariaDB", requeue.reason);
            Ok(Action::requeue(requeue.after))
        }
        (Ok(None), Ok(_)) => Ok(Action::requeue(completed_requeue(status.is_ready()))),
    };

    match &outcome {
        Ok(_) => metrics::record_reconciliation_success("MariaDB", start.elapsed()),
        Err(e) => {
            metrics::record_reconciliation_error("MariaDB", start.elapsed());
            metrics::record_error("MariaDB", e.metric_label());
        }
    }

    outcome
}
