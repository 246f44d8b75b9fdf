// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`AccountStore`] for tests and harness runs.

use super::store::AccountStore;
use crate::crd::{MariaDBAccount, MariaDBAccountStatus};
use crate::reconcilers::finalizers::{with_finalizer, without_finalizer};
use crate::reconcilers::status::create_condition;
use crate::status_reasons::{
    CONDITION_TYPE_MARIADB_ACCOUNT_READY, MESSAGE_MARIADB_ACCOUNT_READY, REASON_READY,
    STATUS_TRUE,
};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

type Key = (String, String);

#[derive(Default)]
struct State {
    accounts: BTreeMap<Key, MariaDBAccount>,
    secrets: BTreeMap<Key, Secret>,
    resource_version: u64,
}

impl State {
    fn bump(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }

    fn account_mut(&mut self, namespace: &str, name: &str) -> Result<&mut MariaDBAccount> {
        self.accounts
            .get_mut(&key(namespace, name))
            .ok_or_else(|| anyhow!("MariaDBAccount {namespace}/{name} not found"))
    }
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

/// Accounts and secrets held in a mutex-guarded map.
///
/// Every write bumps a store-wide `resourceVersion`. Objects are never garbage
/// collected, so tests can inspect finalizers after a consumer is deleted.
#[derive(Default)]
pub struct MemoryAccountStore {
    state: Mutex<State>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored account in `namespace`.
    pub async fn accounts(&self, namespace: &str) -> Vec<MariaDBAccount> {
        self.state
            .lock()
            .await
            .accounts
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, account)| account.clone())
            .collect()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get_account(&self, namespace: &str, name: &str) -> Result<Option<MariaDBAccount>> {
        Ok(self.state.lock().await.accounts.get(&key(namespace, name)).cloned())
    }

    async fn create_account(&self, account: &MariaDBAccount) -> Result<MariaDBAccount> {
        let namespace = account.namespace().unwrap_or_default();
        let name = account.name_any();
        let mut state = self.state.lock().await;
        if state.accounts.contains_key(&key(&namespace, &name)) {
            bail!("MariaDBAccount {namespace}/{name} already exists");
        }

        let mut created = account.clone();
        created.metadata.namespace = Some(namespace.clone());
        created.metadata.resource_version = Some(state.bump());
        state.accounts.insert(key(&namespace, &name), created.clone());
        Ok(created)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        Ok(self.state.lock().await.secrets.get(&key(namespace, name)).cloned())
    }

    async fn create_secret(&self, secret: &Secret) -> Result<Secret> {
        let namespace = secret.namespace().unwrap_or_default();
        let name = secret.name_any();
        let mut state = self.state.lock().await;
        if state.secrets.contains_key(&key(&namespace, &name)) {
            bail!("Secret {namespace}/{name} already exists");
        }

        let mut created = secret.clone();
        created.metadata.namespace = Some(namespace.clone());
        created.metadata.resource_version = Some(state.bump());
        state.secrets.insert(key(&namespace, &name), created.clone());
        Ok(created)
    }

    async fn list_accounts_for_database(
        &self,
        namespace: &str,
        database: &str,
    ) -> Result<Vec<MariaDBAccount>> {
        Ok(self
            .accounts(namespace)
            .await
            .into_iter()
            .filter(|a| {
                a.labels()
                    .get(crate::labels::MARIADB_DATABASE_NAME_LABEL)
                    .is_some_and(|v| v == database)
            })
            .collect())
    }

    async fn add_finalizer(&self, namespace: &str, name: &str, finalizer: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        let current = state.account_mut(namespace, name)?.finalizer_list();
        let Some(finalizers) = with_finalizer(&current, finalizer) else {
            return Ok(false);
        };
        let rv = state.bump();
        let account = state.account_mut(namespace, name)?;
        account.metadata.finalizers = Some(finalizers);
        account.metadata.resource_version = Some(rv);
        Ok(true)
    }

    async fn remove_finalizer(
        &self,
        namespace: &str,
        name: &str,
        finalizer: &str,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        let current = state.account_mut(namespace, name)?.finalizer_list();
        let Some(finalizers) = without_finalizer(&current, finalizer) else {
            return Ok(false);
        };
        let rv = state.bump();
        let account = state.account_mut(namespace, name)?;
        account.metadata.finalizers = Some(finalizers);
        account.metadata.resource_version = Some(rv);
        Ok(true)
    }

    async fn set_label(
        &self,
        namespace: &str,
        name: &str,
        key_name: &str,
        value: &str,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state
            .account_mut(namespace, name)?
            .labels()
            .get(key_name)
            .is_some_and(|v| v == value)
        {
            return Ok(false);
        }
        let rv = state.bump();
        let account = state.account_mut(namespace, name)?;
        account
            .labels_mut()
            .insert(key_name.to_string(), value.to_string());
        account.metadata.resource_version = Some(rv);
        Ok(true)
    }

    async fn mark_ready(&self, namespace: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let rv = state.bump();
        let account = state.account_mut(namespace, name)?;
        let status = account.status.get_or_insert_with(MariaDBAccountStatus::default);
        status
            .conditions
            .retain(|c| c.r#type != CONDITION_TYPE_MARIADB_ACCOUNT_READY);
        status.conditions.push(create_condition(
            CONDITION_TYPE_MARIADB_ACCOUNT_READY,
            STATUS_TRUE,
            REASON_READY,
            None,
            MESSAGE_MARIADB_ACCOUNT_READY,
        ));
        account.metadata.resource_version = Some(rv);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
