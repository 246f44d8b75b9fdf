// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! On-demand creation of `MariaDBAccount` objects and their password secrets.

use super::store::AccountStore;
use crate::constants::{
    DATABASE_PASSWORD_SELECTOR, GENERATED_PASSWORD_LEN, GENERATED_USER_SUFFIX_LEN,
    MAX_DATABASE_USER_NAME_LEN,
};
use crate::crd::{MariaDBAccount, MariaDBAccountSpec};
use crate::labels::MARIADB_DATABASE_NAME_LABEL;
use crate::metrics;
use anyhow::{bail, Result};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use rand::distr::Alphanumeric;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::info;

const USER_SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// `<account>-db-secret`
#[must_use]
pub fn account_secret_name(account_name: &str) -> String {
    format!("{account_name}-db-secret")
}

/// `<prefix>_<4 random lowercase alphanumerics>`, at most 32 characters.
///
/// The prefix is truncated when needed so the suffix always survives.
#[must_use]
pub fn generate_user_name(prefix: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..GENERATED_USER_SUFFIX_LEN)
        .map(|_| char::from(USER_SUFFIX_CHARSET[rng.random_range(0..USER_SUFFIX_CHARSET.len())]))
        .collect();

    let max_prefix = MAX_DATABASE_USER_NAME_LEN - GENERATED_USER_SUFFIX_LEN - 1;
    let prefix: String = prefix.chars().take(max_prefix).collect();
    format!("{prefix}_{suffix}")
}

/// A random 32-character alphanumeric password.
#[must_use]
pub fn generate_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Build an account object pointing at `<name>-db-secret`.
#[must_use]
pub fn new_account(
    namespace: &str,
    name: &str,
    user_name: &str,
    database: Option<&str>,
) -> MariaDBAccount {
    let mut account = MariaDBAccount::new(
        name,
        MariaDBAccountSpec {
            user_name: user_name.to_string(),
            secret: account_secret_name(name),
        },
    );
    account.metadata.namespace = Some(namespace.to_string());
    if let Some(database) = database {
        let mut labels = BTreeMap::new();
        labels.insert(MARIADB_DATABASE_NAME_LABEL.to_string(), database.to_string());
        account.metadata.labels = Some(labels);
    }
    account
}

/// Build a password secret with `DatabasePassword` set.
#[must_use]
pub fn new_password_secret(namespace: &str, name: &str, password: &str) -> Secret {
    let mut data = BTreeMap::new();
    data.insert(
        DATABASE_PASSWORD_SELECTOR.to_string(),
        ByteString(password.as_bytes().to_vec()),
    );
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(data),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

/// The password stored in an account secret, if present and non-empty.
#[must_use]
pub fn secret_password(secret: &Secret) -> Option<String> {
    secret
        .data
        .as_ref()?
        .get(DATABASE_PASSWORD_SELECTOR)
        .map(|b| String::from_utf8_lossy(&b.0).into_owned())
        .filter(|p| !p.is_empty())
}

/// Return the named account, creating it and its password secret if needed.
///
/// A missing secret is created for an existing account. An existing secret is
/// never modified.
///
/// # Errors
///
/// Returns store errors, or an error if an existing account names no secret.
pub async fn ensure_mariadb_account(
    store: &dyn AccountStore,
    namespace: &str,
    account_name: &str,
    user_prefix: &str,
    database: &str,
) -> Result<MariaDBAccount> {
    let account = match store.get_account(namespace, account_name).await? {
        Some(account) => account,
        None => {
            let account = new_account(
                namespace,
                account_name,
                &generate_user_name(user_prefix),
                Some(database),
            );
            info!(
                "Creating MariaDBAccount {}/{} with user {}",
                namespace, account_name, account.spec.user_name
            );
            metrics::record_account_event("provisioned");
            store.create_account(&account).await?
        }
    };

    if account.spec.secret.is_empty() {
        bail!("MariaDBAccount {namespace}/{account_name} does not name a secret");
    }

    if store.get_secret(namespace, &account.spec.secret).await?.is_none() {
        info!(
            "Creating password secret {}/{} for MariaDBAccount {}",
            namespace, account.spec.secret, account_name
        );
        let secret = new_password_secret(namespace, &account.spec.secret, &generate_password());
        store.create_secret(&secret).await?;
    }

    Ok(account)
}

#[cfg(test)]
#[path = "provisioner_tests.rs"]
mod provisioner_tests;
