// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! db-init job runner.
//!
//! The job is keyed by the SHA-256 of its own definition, stored in the
//! `mariadb.openstack.org/job-hash` annotation. At most one job exists per
//! `MariaDB`: a job carrying a different hash is deleted before a new one is
//! created. Once a job with the current hash succeeds, the hash is copied into
//! `status.dbInitHash` and later passes skip the runner entirely.

use super::config::object_hash;
use super::types::*;
use crate::constants::{
    JOB_RUNNING_REQUEUE_SECS, REQUEUE_REASON_JOB_RUNNING, REQUEUE_REASON_STATUS_CONFLICT,
};
use crate::labels::JOB_HASH_ANNOTATION;
use crate::mariadb_resources::build_db_init_job;
use crate::metrics;
use crate::status_reasons::{
    CONDITION_TYPE_MARIADB_INITIALIZED, MESSAGE_MARIADB_INITIALIZED,
    MESSAGE_MARIADB_INITIALIZED_RUNNING,
};
use k8s_openapi::api::batch::v1::Job;
use kube::api::PostParams;

/// Observed phase of a db-init job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Created or still running
    Running,
    /// At least one pod completed successfully
    Succeeded,
    /// The job controller gave up; carries the reported reason
    Failed(String),
}

/// Classify a job from its status.
#[must_use]
pub fn job_state(job: &Job) -> JobState {
    let Some(status) = job.status.as_ref() else {
        return JobState::Running;
    };

    if status.succeeded.unwrap_or(0) > 0 {
        return JobState::Succeeded;
    }

    let failed = status
        .conditions
        .as_ref()
        .and_then(|conds| {
            conds
                .iter()
                .find(|c| c.type_ == "Failed" && c.status == "True")
        })
        .map(|c| {
            c.message
                .clone()
                .or_else(|| c.reason.clone())
                .unwrap_or_else(|| "job failed".to_string())
        });

    match failed {
        Some(reason) => JobState::Failed(reason),
        None => JobState::Running,
    }
}

/// Hash of the job definition. Metadata is excluded so the annotation never feeds
/// back into its own value.
///
/// # Errors
///
/// Returns a serialization error if the spec cannot be encoded.
pub fn job_hash(job: &Job) -> Result<String> {
    object_hash(&job.spec)
}

/// The hash annotation on an existing job, if any.
#[must_use]
pub fn stored_job_hash(job: &Job) -> Option<&str> {
    job.annotations().get(JOB_HASH_ANNOTATION).map(String::as_str)
}

/// Drives one hashed job to completion across reconcile passes.
pub struct JobRunner {
    client: Client,
    namespace: String,
    job: Job,
    hash: String,
}

impl JobRunner {
    /// Prepare a runner for `job`, annotating it with its definition hash.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the job cannot be hashed.
    pub fn new(client: Client, namespace: &str, mut job: Job) -> Result<Self> {
        let hash = job_hash(&job)?;
        job.metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(JOB_HASH_ANNOTATION.to_string(), hash.clone());

        Ok(Self {
            client,
            namespace: namespace.to_string(),
            job,
            hash,
        })
    }

    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    fn name(&self) -> String {
        self.job.name_any()
    }

    fn api(&self) -> Api<Job> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    /// Advance the job by one step.
    ///
    /// Creates the job when absent, deletes it when its hash is stale and
    /// otherwise reports its state.
    ///
    /// # Errors
    ///
    /// Returns any API error.
    pub async fn run(&self) -> Result<JobState> {
        let api = self.api();
        let name = self.name();

        match api.get_opt(&name).await? {
            None => {
                info!(
                    "Creating job {}/{} with hash {}",
                    self.namespace, name, self.hash
                );
                match api.create(&PostParams::default(), &self.job).await {
                    Ok(_) => {
                        metrics::record_resource_created("Job");
                        Ok(JobState::Running)
                    }
                    // A previous job with this name is still terminating
                    Err(e) if crate::errors::api_error_code(&e) == Some(409) => {
                        debug!("Job {}/{} still terminating: {}", self.namespace, name, e);
                        Ok(JobState::Running)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Some(existing) if stored_job_hash(&existing) != Some(self.hash.as_str()) => {
                info!(
                    "Job {}/{} has stale hash {:?}, deleting",
                    self.namespace,
                    name,
                    stored_job_hash(&existing)
                );
                delete_if_exists::<Job>(&self.client, &self.namespace, &name).await?;
                Ok(JobState::Running)
            }
            Some(existing) => Ok(job_state(&existing)),
        }
    }

    /// Remove the job once its result has been recorded.
    ///
    /// # Errors
    ///
    /// Returns any API error other than not-found.
    pub async fn delete(&self) -> Result<()> {
        delete_if_exists::<Job>(&self.client, &self.namespace, &self.name()).await?;
        Ok(())
    }
}

/// Run the db-init job unless the current definition already completed.
///
/// # Errors
///
/// Returns [`MariaDbError::JobFailed`] after marking `MariaDBInitialized=False`
/// with severity Error, or any API error.
pub async fn reconcile_db_init(
    ctx: &Context,
    db: &MariaDB,
    image: &str,
    root_secret: &str,
    status: &mut MariaDBStatusUpdater,
) -> Result<StepOutcome> {
    let namespace = db.namespace().unwrap_or_default();
    let job = build_db_init_job(db, image, root_secret);
    let runner = JobRunner::new(ctx.client.clone(), &namespace, job)?;

    if status.db_init_hash() == runner.hash() {
        debug!(
            "db-init for MariaDB {}/{} already completed with hash {}",
            namespace,
            db.name_any(),
            runner.hash()
        );
        metrics::record_db_init_job("skipped");
        status.mark_true(CONDITION_TYPE_MARIADB_INITIALIZED, MESSAGE_MARIADB_INITIALIZED);
        return Ok(StepOutcome::next());
    }

    match runner.run().await? {
        JobState::Running => {
            status.mark_false(
                CONDITION_TYPE_MARIADB_INITIALIZED,
                REASON_REQUESTED,
                SEVERITY_INFO,
                MESSAGE_MARIADB_INITIALIZED_RUNNING,
            );
            Ok(requeue_secs(JOB_RUNNING_REQUEUE_SECS, REQUEUE_REASON_JOB_RUNNING))
        }
        JobState::Failed(reason) => {
            metrics::record_db_init_job("failed");
            let err = MariaDbError::JobFailed {
                name: runner.name(),
                reason,
            };
            error!("MariaDB {}/{}: {}", namespace, db.name_any(), err);
            status.mark_false(
                CONDITION_TYPE_MARIADB_INITIALIZED,
                REASON_ERROR,
                SEVERITY_ERROR,
                &error_message("MariaDB dbinit", &err),
            );
            Err(err)
        }
        JobState::Succeeded => {
            info!(
                "db-init for MariaDB {}/{} completed with hash {}",
                namespace,
                db.name_any(),
                runner.hash()
            );
            status.set_db_init_hash(runner.hash());
            status.mark_true(CONDITION_TYPE_MARIADB_INITIALIZED, MESSAGE_MARIADB_INITIALIZED);
            // The hash must be persisted before the job is deleted
            if !status.apply(&ctx.client).await? {
                warn!(
                    "db-init hash for MariaDB {}/{} not recorded, keeping job {}",
                    namespace,
                    db.name_any(),
                    runner.name()
                );
                return Ok(requeue_secs(
                    JOB_RUNNING_REQUEUE_SECS,
                    REQUEUE_REASON_STATUS_CONFLICT,
                ));
            }
            metrics::record_db_init_job("succeeded");
            runner.delete().await?;
            Ok(StepOutcome::next())
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod job_tests;
