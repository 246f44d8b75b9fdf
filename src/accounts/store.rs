// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Storage seam for account provisioning and rotation.

use crate::crd::MariaDBAccount;
use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;

/// Reads and writes `MariaDBAccount` objects and their password secrets.
///
/// Finalizer and label operations are idempotent: adding a finalizer that is
/// already present, or removing one that is absent, reports `false` and writes
/// nothing.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, namespace: &str, name: &str) -> Result<Option<MariaDBAccount>>;

    /// Create an account. Fails if one with the same name exists.
    async fn create_account(&self, account: &MariaDBAccount) -> Result<MariaDBAccount>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;

    /// Create a secret. Fails if one with the same name exists.
    async fn create_secret(&self, secret: &Secret) -> Result<Secret>;

    /// Accounts carrying `mariaDBDatabaseName=<database>`.
    async fn list_accounts_for_database(
        &self,
        namespace: &str,
        database: &str,
    ) -> Result<Vec<MariaDBAccount>>;

    async fn add_finalizer(&self, namespace: &str, name: &str, finalizer: &str) -> Result<bool>;

    async fn remove_finalizer(&self, namespace: &str, name: &str, finalizer: &str)
        -> Result<bool>;

    /// Set a single label, returning `true` if it changed.
    async fn set_label(&self, namespace: &str, name: &str, key: &str, value: &str)
        -> Result<bool>;

    /// Report the account as provisioned (`MariaDBAccountReady=True`).
    async fn mark_ready(&self, namespace: &str, name: &str) -> Result<()>;
}
