// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for MariaDB resources.
//!
//! This module provides utility functions for creating and managing Kubernetes
//! status conditions, and [`MariaDBStatusUpdater`], which collects every status
//! change made during a reconcile pass and persists it once at the end.
//!
//! # Condition Format
//!
//! - `type`: The aspect of the resource being reported (e.g., "Ready", "DeploymentReady")
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `severity`: "Error", "Warning" or "Info" for False conditions
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the status last changed
//!
//! # Aggregate readiness
//!
//! `Ready` is derived, never set directly: it is True iff every other condition is
//! True, False (mirroring the most severe failure) if any condition is False, and
//! Unknown otherwise.
//!
//! # Example
//!
//! ```rust,no_run
//! use mariadb_operator::reconcilers::status::create_condition;
//!
//! let condition = create_condition(
//!     "DeploymentReady",
//!     "False",
//!     "Requested",
//!     Some("Info"),
//!     "Deployment in progress",
//! );
//! ```

use crate::crd::{Condition, MariaDB, MariaDBStatus};
use crate::errors::{api_error_code, Result};
use crate::status_reasons::{
    init_message, severity_rank, CONDITION_TYPE_READY, MESSAGE_READY, MESSAGE_READY_INIT,
    REASON_INIT, REASON_READY, STATUS_FALSE, STATUS_TRUE, STATUS_UNKNOWN,
};
use chrono::Utc;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::{debug, warn};

/// Create a new condition with the current time as `lastTransitionTime`.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    severity: Option<&str>,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        severity: severity.map(str::to_string),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// True when the condition exists and is `True`.
#[must_use]
pub fn is_condition_true(conditions: &[Condition], condition_type: &str) -> bool {
    find_condition(conditions, condition_type).is_some_and(|c| c.status == STATUS_TRUE)
}

/// Set a condition in place.
///
/// Keeps `lastTransitionTime` when the status is unchanged and inserts the
/// condition if it does not exist yet, so each type appears at most once.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    severity: Option<&str>,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.severity = severity.map(str::to_string);
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(
            condition_type,
            status,
            reason,
            severity,
            message,
        ));
    }
}

/// Compare two condition lists ignoring order and timestamps.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        find_condition(current, &new_cond.r#type).is_some_and(|curr| {
            curr.status == new_cond.status
                && curr.reason == new_cond.reason
                && curr.severity == new_cond.severity
                && curr.message == new_cond.message
        })
    })
}

/// Add `Ready` and every type in `condition_types` that is missing, as Unknown.
///
/// Returns `true` if anything was added.
pub fn init_conditions(conditions: &mut Vec<Condition>, condition_types: &[&str]) -> bool {
    let mut added = false;
    for condition_type in std::iter::once(&CONDITION_TYPE_READY).chain(condition_types) {
        if find_condition(conditions, condition_type).is_none() {
            conditions.push(create_condition(
                condition_type,
                STATUS_UNKNOWN,
                REASON_INIT,
                None,
                init_message(condition_type),
            ));
            added = true;
        }
    }
    sort_conditions(conditions);
    added
}

/// `Ready` first, the rest by type.
pub fn sort_conditions(conditions: &mut [Condition]) {
    conditions.sort_by(|a, b| {
        let a_ready = a.r#type != CONDITION_TYPE_READY;
        let b_ready = b.r#type != CONDITION_TYPE_READY;
        a_ready.cmp(&b_ready).then_with(|| a.r#type.cmp(&b.r#type))
    });
}

/// Derive the `Ready` condition from all other conditions.
pub fn recompute_ready(conditions: &mut Vec<Condition>) {
    let constituents: Vec<&Condition> = conditions
        .iter()
        .filter(|c| c.r#type != CONDITION_TYPE_READY)
        .collect();

    let most_severe_failure = constituents
        .iter()
        .filter(|c| c.status == STATUS_FALSE)
        .max_by_key(|c| severity_rank(c.severity.as_deref()));

    let (status, reason, severity, message) = if let Some(failed) = most_severe_failure {
        (
            STATUS_FALSE,
            failed.reason.clone().unwrap_or_default(),
            failed.severity.clone(),
            failed.message.clone().unwrap_or_default(),
        )
    } else if constituents.is_empty() || constituents.iter().any(|c| c.status != STATUS_TRUE) {
        (
            STATUS_UNKNOWN,
            REASON_INIT.to_string(),
            None,
            MESSAGE_READY_INIT.to_string(),
        )
    } else {
        (
            STATUS_TRUE,
            REASON_READY.to_string(),
            None,
            MESSAGE_READY.to_string(),
        )
    };

    update_condition_in_memory(
        conditions,
        CONDITION_TYPE_READY,
        status,
        &reason,
        severity.as_deref(),
        &message,
    );
    sort_conditions(conditions);
}

/// Collects status changes for one reconcile pass of a `MariaDB`.
///
/// Steps mutate the in-memory status through this updater. `finish()` derives
/// `Ready`, and `apply()` writes the status subresource only when something
/// changed, guarded by the `resourceVersion` the pass started from.
pub struct MariaDBStatusUpdater {
    namespace: String,
    name: String,
    resource_version: Option<String>,
    current_status: Option<MariaDBStatus>,
    new_status: MariaDBStatus,
}

impl MariaDBStatusUpdater {
    #[must_use]
    pub fn new(db: &MariaDB) -> Self {
        let current_status = db.status.clone();
        let new_status = current_status.clone().unwrap_or_default();

        Self {
            namespace: db.namespace().unwrap_or_default(),
            name: db.name_any(),
            resource_version: db.resource_version(),
            current_status,
            new_status,
        }
    }

    /// Initialize missing conditions to Unknown. Returns `true` on first observation.
    pub fn init_conditions(&mut self, condition_types: &[&str]) -> bool {
        init_conditions(&mut self.new_status.conditions, condition_types)
    }

    pub fn mark_true(&mut self, condition_type: &str, message: &str) {
        update_condition_in_memory(
            &mut self.new_status.conditions,
            condition_type,
            STATUS_TRUE,
            REASON_READY,
            None,
            message,
        );
    }

    pub fn mark_false(&mut self, condition_type: &str, reason: &str, severity: &str, message: &str) {
        update_condition_in_memory(
            &mut self.new_status.conditions,
            condition_type,
            STATUS_FALSE,
            reason,
            Some(severity),
            message,
        );
    }

    #[must_use]
    pub fn is_true(&self, condition_type: &str) -> bool {
        is_condition_true(&self.new_status.conditions, condition_type)
    }

    #[must_use]
    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        find_condition(&self.new_status.conditions, condition_type)
    }

    pub fn set_db_init_hash(&mut self, hash: &str) {
        hash.clone_into(&mut self.new_status.db_init_hash);
    }

    #[must_use]
    pub fn db_init_hash(&self) -> &str {
        &self.new_status.db_init_hash
    }

    /// Derive the aggregate `Ready` condition.
    pub fn finish(&mut self) {
        recompute_ready(&mut self.new_status.conditions);
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.is_true(CONDITION_TYPE_READY)
    }

    #[must_use]
    pub fn status(&self) -> &MariaDBStatus {
        &self.new_status
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        match &self.current_status {
            None => true,
            Some(current) => {
                current.db_init_hash != self.new_status.db_init_hash
                    || !conditions_equal(&current.conditions, &self.new_status.conditions)
            }
        }
    }

    /// The merge patch sent to the status subresource.
    #[must_use]
    pub fn patch_body(&self) -> serde_json::Value {
        let mut patch = json!({ "status": self.new_status });
        if let Some(rv) = &self.resource_version {
            patch["metadata"] = json!({ "resourceVersion": rv });
        }
        patch
    }

    /// Persist the status subresource.
    ///
    /// Returns `true` when the stored status matches the computed one, either
    /// because the patch landed or because nothing changed. Conflicts and
    /// not-found are logged and reported as `false`; the next pass re-reads
    /// the object and recomputes the status from scratch.
    ///
    /// # Errors
    ///
    /// Returns any other API error.
    pub async fn apply(&mut self, client: &Client) -> Result<bool> {
        if !self.has_changes() {
            debug!(
                "MariaDB {}/{} status unchanged, skipping update",
                self.namespace, self.name
            );
            return Ok(true);
        }

        let api: Api<MariaDB> = Api::namespaced(client.clone(), &self.namespace);
        let patch = self.patch_body();

        match api
            .patch_status(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(updated) => {
                self.resource_version = updated.resource_version();
                self.current_status = Some(self.new_status.clone());
                debug!(
                    "Updated MariaDB {}/{} status: {} condition(s)",
                    self.namespace,
                    self.name,
                    self.new_status.conditions.len()
                );
                Ok(true)
            }
            Err(e) if matches!(api_error_code(&e), Some(404 | 409)) => {
                warn!(
                    "Skipping status update for MariaDB {}/{}: {}",
                    self.namespace, self.name, e
                );
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
