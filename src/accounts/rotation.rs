// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer hand-off between a consumer's old and new database accounts.
//!
//! A consumer marks the account it uses with its own finalizer. When the
//! consumer switches to a different account, the old account keeps the
//! finalizer until the new one reports `MariaDBAccountReady=True`: until then
//! the consumer may still be running on the old credentials. On consumer
//! deletion every account it ever referenced is released.
//!
//! "Ever referenced" is the active account plus every account labeled
//! `mariaDBDatabaseName=<database>`, since each referenced account receives that
//! label.

use super::provisioner::ensure_mariadb_account;
use super::store::AccountStore;
use crate::crd::MariaDBAccount;
use crate::labels::MARIADB_DATABASE_NAME_LABEL;
use crate::metrics;
use anyhow::Result;
use kube::ResourceExt;
use tracing::{debug, info};

/// Finalizer changes for one pass, by account name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizerPlan {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl FinalizerPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Plan finalizer changes for a consumer whose active account is `active`.
///
/// The active account always holds the finalizer. Any other labeled account
/// loses it, but only once the active account is ready.
#[must_use]
pub fn plan_rotation(
    active: &MariaDBAccount,
    active_ready: bool,
    labeled: &[MariaDBAccount],
    finalizer: &str,
) -> FinalizerPlan {
    let active_name = active.name_any();
    let mut plan = FinalizerPlan::default();

    if !active.has_finalizer(finalizer) {
        plan.add.push(active_name.clone());
    }

    if active_ready {
        plan.remove = labeled
            .iter()
            .filter(|a| a.name_any() != active_name && a.has_finalizer(finalizer))
            .map(ResourceExt::name_any)
            .collect();
    }

    plan
}

/// Accounts to strip of `finalizer` when the consumer is deleted.
#[must_use]
pub fn plan_release(
    active: Option<&MariaDBAccount>,
    labeled: &[MariaDBAccount],
    finalizer: &str,
) -> Vec<String> {
    let mut names: Vec<String> = active
        .into_iter()
        .chain(labeled)
        .filter(|a| a.has_finalizer(finalizer))
        .map(ResourceExt::name_any)
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Outcome of one rotation pass.
#[derive(Debug, Clone)]
pub struct RotationStatus {
    /// The active account as last read.
    pub account: MariaDBAccount,

    /// True once the active account is provisioned. Older accounts have been
    /// released by the time this is reported.
    pub ready: bool,
}

/// Runs the rotation protocol for one consumer against an [`AccountStore`].
pub struct AccountRotation<'a> {
    store: &'a dyn AccountStore,
    namespace: String,
    database: String,
    finalizer: String,
}

impl<'a> AccountRotation<'a> {
    #[must_use]
    pub fn new(
        store: &'a dyn AccountStore,
        namespace: &str,
        database: &str,
        finalizer: &str,
    ) -> Self {
        Self {
            store,
            namespace: namespace.to_string(),
            database: database.to_string(),
            finalizer: finalizer.to_string(),
        }
    }

    /// Make `account_name` the consumer's active account.
    ///
    /// Creates the account if needed, labels it for the database, claims it with
    /// the finalizer and releases older accounts once it is ready.
    ///
    /// # Errors
    ///
    /// Returns any store error. A partially applied pass is completed by the next.
    pub async fn reconcile(&self, account_name: &str, user_prefix: &str) -> Result<RotationStatus> {
        let ns = self.namespace.as_str();
        let mut account =
            ensure_mariadb_account(self.store, ns, account_name, user_prefix, &self.database)
                .await?;

        // Label first: a claimed account must always be discoverable on release.
        if self
            .store
            .set_label(ns, account_name, MARIADB_DATABASE_NAME_LABEL, &self.database)
            .await?
        {
            debug!(
                "Labeled MariaDBAccount {}/{} for database {}",
                ns, account_name, self.database
            );
        }

        if let Some(current) = self.store.get_account(ns, account_name).await? {
            account = current;
        }
        let active_ready = account.is_ready();
        let labeled = self
            .store
            .list_accounts_for_database(ns, &self.database)
            .await?;

        let plan = plan_rotation(&account, active_ready, &labeled, &self.finalizer);
        for name in &plan.add {
            if self.store.add_finalizer(ns, name, &self.finalizer).await? {
                info!("Claimed MariaDBAccount {}/{} with {}", ns, name, self.finalizer);
                metrics::record_account_event("claimed");
            }
        }
        for name in &plan.remove {
            if self.store.remove_finalizer(ns, name, &self.finalizer).await? {
                info!(
                    "Released MariaDBAccount {}/{} in favour of {}",
                    ns, name, account_name
                );
                metrics::record_account_event("released");
            }
        }

        if !plan.add.is_empty() {
            if let Some(current) = self.store.get_account(ns, account_name).await? {
                account = current;
            }
        }

        Ok(RotationStatus {
            account,
            ready: active_ready,
        })
    }

    /// Strip the finalizer from every account the consumer referenced.
    ///
    /// # Errors
    ///
    /// Returns any store error.
    pub async fn release_all(&self, active: Option<&str>) -> Result<Vec<String>> {
        let ns = self.namespace.as_str();
        let active = match active {
            Some(name) => self.store.get_account(ns, name).await?,
            None => None,
        };
        let labeled = self
            .store
            .list_accounts_for_database(ns, &self.database)
            .await?;

        let names = plan_release(active.as_ref(), &labeled, &self.finalizer);
        let mut released = Vec::with_capacity(names.len());
        for name in names {
            if self.store.remove_finalizer(ns, &name, &self.finalizer).await? {
                info!("Released MariaDBAccount {}/{} on consumer delete", ns, name);
                metrics::record_account_event("released");
                released.push(name);
            }
        }
        Ok(released)
    }
}

#[cfg(test)]
#[path = "rotation_tests.rs"]
mod rotation_tests;
