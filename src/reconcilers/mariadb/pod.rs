// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Workload pod for the database server.
//!
//! A pod's containers are immutable. When the image or `CONFIG_HASH` of the
//! running pod differs from the desired one, the pod is deleted and recreated on
//! the next pass. Label drift is patched in place.

use super::types::*;
use crate::constants::{
    ENV_CONFIG_HASH, MARIADB_CONTAINER_NAME, POD_RECREATE_REQUEUE_SECS, REQUEUE_REASON_POD_RECREATE,
};
use crate::mariadb_resources::{build_pod, mariadb_object_name};
use crate::metrics;
use crate::status_reasons::{
    CONDITION_TYPE_DEPLOYMENT_READY, MESSAGE_DEPLOYMENT_READY, MESSAGE_DEPLOYMENT_READY_RUNNING,
};

/// How an existing pod differs from the desired one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodDrift {
    InSync,
    /// Only labels changed
    PatchMetadata,
    /// Immutable fields changed; carries the cause used as metric label
    Recreate(&'static str),
}

fn server_container(pod: &Pod) -> Option<&k8s_openapi::api::core::v1::Container> {
    pod.spec
        .as_ref()?
        .containers
        .iter()
        .find(|c| c.name == MARIADB_CONTAINER_NAME)
}

fn env_value<'a>(pod: &'a Pod, name: &str) -> Option<&'a str> {
    server_container(pod)?
        .env
        .as_ref()?
        .iter()
        .find(|e| e.name == name)?
        .value
        .as_deref()
}

/// Compare an existing pod against the desired one.
#[must_use]
pub fn pod_drift(existing: &Pod, desired: &Pod) -> PodDrift {
    let image = |pod: &Pod| server_container(pod).and_then(|c| c.image.clone());
    if image(existing) != image(desired) {
        return PodDrift::Recreate("image");
    }
    if env_value(existing, ENV_CONFIG_HASH) != env_value(desired, ENV_CONFIG_HASH) {
        return PodDrift::Recreate("config_hash");
    }

    let existing_labels = existing.labels();
    let labels_match = desired
        .labels()
        .iter()
        .all(|(k, v)| existing_labels.get(k) == Some(v));
    if labels_match {
        PodDrift::InSync
    } else {
        PodDrift::PatchMetadata
    }
}

/// True when the pod phase is `Running`.
#[must_use]
pub fn is_pod_running(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .is_some_and(|phase| phase == "Running")
}

fn deployment_in_progress(status: &mut MariaDBStatusUpdater) {
    status.mark_false(
        CONDITION_TYPE_DEPLOYMENT_READY,
        REASON_REQUESTED,
        SEVERITY_INFO,
        MESSAGE_DEPLOYMENT_READY_RUNNING,
    );
}

/// Converge the server pod to the current image and config hash.
///
/// # Errors
///
/// Returns any API error.
pub async fn reconcile_pod(
    ctx: &Context,
    db: &MariaDB,
    image: &str,
    config_hash: &str,
    status: &mut MariaDBStatusUpdater,
) -> Result<StepOutcome> {
    let namespace = db.namespace().unwrap_or_default();
    let name = mariadb_object_name(db);
    let desired = build_pod(db, image, config_hash);
    let api: Api<Pod> = Api::namespaced(ctx.client.clone(), &namespace);

    let pod = match api.get_opt(&name).await? {
        None => {
            let (created, _) =
                create_or_patch(&ctx.client, &namespace, &desired, ctx.field_manager()).await?;
            created
        }
        Some(existing) if existing.metadata.deletion_timestamp.is_some() => {
            debug!("Pod {}/{} is terminating", namespace, name);
            deployment_in_progress(status);
            return Ok(requeue_secs(POD_RECREATE_REQUEUE_SECS, REQUEUE_REASON_POD_RECREATE));
        }
        Some(existing) => match pod_drift(&existing, &desired) {
            PodDrift::InSync => existing,
            PodDrift::PatchMetadata => {
                let patch = json!({ "metadata": { "labels": desired.labels() } });
                api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
                    .await?
            }
            PodDrift::Recreate(cause) => {
                info!(
                    "Pod {}/{} is out of date ({}), recreating",
                    namespace, name, cause
                );
                metrics::record_pod_recreation(cause);
                delete_if_exists::<Pod>(&ctx.client, &namespace, &name).await?;
                deployment_in_progress(status);
                return Ok(requeue_secs(POD_RECREATE_REQUEUE_SECS, REQUEUE_REASON_POD_RECREATE));
            }
        },
    };

    if is_pod_running(&pod) {
        status.mark_true(CONDITION_TYPE_DEPLOYMENT_READY, MESSAGE_DEPLOYMENT_READY);
    } else {
        deployment_in_progress(status);
    }
    Ok(StepOutcome::next())
}

#[cfg(test)]
#[path = "pod_tests.rs"]
mod pod_tests;
