// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! [`AccountStore`] backed by the Kubernetes API server.

use super::store::AccountStore;
use crate::constants::KUBE_LIST_PAGE_SIZE;
use crate::crd::MariaDBAccount;
use crate::labels::MARIADB_DATABASE_NAME_LABEL;
use crate::reconcilers::finalizers::{ensure_finalizer, remove_finalizer};
use crate::reconcilers::status::{sort_conditions, update_condition_in_memory};
use crate::status_reasons::{
    CONDITION_TYPE_MARIADB_ACCOUNT_READY, MESSAGE_MARIADB_ACCOUNT_READY, REASON_READY,
    STATUS_TRUE,
};
use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Reads and writes accounts through a [`Client`].
#[derive(Clone)]
pub struct KubeAccountStore {
    client: Client,
}

impl KubeAccountStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn accounts(&self, namespace: &str) -> Api<MariaDBAccount> {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn require_account(&self, namespace: &str, name: &str) -> Result<MariaDBAccount> {
        self.accounts(namespace)
            .get_opt(name)
            .await?
            .ok_or_else(|| anyhow!("MariaDBAccount {namespace}/{name} not found"))
    }
}

/// List every object matching `selector`, one page at a time.
async fn list_paginated(api: &Api<MariaDBAccount>, selector: &str) -> Result<Vec<MariaDBAccount>> {
    let mut params = ListParams::default()
        .labels(selector)
        .limit(KUBE_LIST_PAGE_SIZE);
    let mut items = Vec::new();
    let mut pages = 0;

    loop {
        pages += 1;
        let page = api.list(&params).await?;
        items.extend(page.items);

        match page.metadata.continue_ {
            Some(token) if !token.is_empty() => params.continue_token = Some(token),
            _ => break,
        }
    }

    debug!(
        selector,
        pages,
        total_items = items.len(),
        "Listed MariaDBAccounts"
    );
    Ok(items)
}

#[async_trait]
impl AccountStore for KubeAccountStore {
    async fn get_account(&self, namespace: &str, name: &str) -> Result<Option<MariaDBAccount>> {
        Ok(self.accounts(namespace).get_opt(name).await?)
    }

    async fn create_account(&self, account: &MariaDBAccount) -> Result<MariaDBAccount> {
        let namespace = account.namespace().unwrap_or_default();
        self.accounts(&namespace)
            .create(&PostParams::default(), account)
            .await
            .with_context(|| format!("creating MariaDBAccount {namespace}/{}", account.name_any()))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_secret(&self, secret: &Secret) -> Result<Secret> {
        let namespace = secret.namespace().unwrap_or_default();
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);
        api.create(&PostParams::default(), secret)
            .await
            .with_context(|| format!("creating Secret {namespace}/{}", secret.name_any()))
    }

    async fn list_accounts_for_database(
        &self,
        namespace: &str,
        database: &str,
    ) -> Result<Vec<MariaDBAccount>> {
        let selector = format!("{MARIADB_DATABASE_NAME_LABEL}={database}");
        list_paginated(&self.accounts(namespace), &selector).await
    }

    async fn add_finalizer(&self, namespace: &str, name: &str, finalizer: &str) -> Result<bool> {
        let account = self.require_account(namespace, name).await?;
        ensure_finalizer(&self.client, &account, finalizer).await
    }

    async fn remove_finalizer(
        &self,
        namespace: &str,
        name: &str,
        finalizer: &str,
    ) -> Result<bool> {
        let account = self.require_account(namespace, name).await?;
        remove_finalizer(&self.client, &account, finalizer).await
    }

    async fn set_label(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<bool> {
        let account = self.require_account(namespace, name).await?;
        if account.labels().get(key).is_some_and(|v| v == value) {
            return Ok(false);
        }

        let patch = json!({
            "metadata": {
                "labels": { key: value },
                "resourceVersion": account.resource_version(),
            }
        });
        self.accounts(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(true)
    }

    async fn mark_ready(&self, namespace: &str, name: &str) -> Result<()> {
        let account = self.require_account(namespace, name).await?;
        let mut conditions = account.status.clone().unwrap_or_default().conditions;
        update_condition_in_memory(
            &mut conditions,
            CONDITION_TYPE_MARIADB_ACCOUNT_READY,
            STATUS_TRUE,
            REASON_READY,
            None,
            MESSAGE_MARIADB_ACCOUNT_READY,
        );
        sort_conditions(&mut conditions);

        // The whole list is replaced by a merge patch, so it carries every condition
        let patch = json!({
            "metadata": { "resourceVersion": account.resource_version() },
            "status": { "conditions": conditions },
        });
        self.accounts(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "kube_store_tests.rs"]
mod kube_store_tests;
