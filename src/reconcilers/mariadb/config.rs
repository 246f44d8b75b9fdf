// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Server configuration: the scripts `ConfigMap`, TLS/CA secrets and the config hash.
//!
//! The config hash summarizes everything the running pod reads from the API
//! server. It is injected into the pod as `CONFIG_HASH`, so any change to the
//! rendered scripts or to a referenced secret produces a different pod spec and
//! forces a restart.
//!
//! # Config hash
//!
//! Each contributor yields a `name -> sha256(content)` entry. The combined hash is
//! the SHA-256 over the entries sorted by name, one `name=value\n` line each.

use super::types::*;
use crate::constants::{
    DB_MAX_TIMEOUT_SECS, MARIADB_PORT, REQUEUE_REASON_SECRET_MISSING, REQUEUE_REASON_TRANSIENT,
    SECRET_MISSING_REQUEUE_SECS, TRANSIENT_ERROR_REQUEUE_SECS,
};
use crate::labels::MARIADB_REF_LABEL;
use crate::mariadb_resources::{
    build_configmap, BOOTSTRAP_SCRIPT, CA_BUNDLE_KEY, KOLLA_CONFIG_FILE, MY_CNF_FILE,
    TLS_CA_PATH, TLS_CERT_PATH,
};
use crate::status_reasons::{CONDITION_TYPE_SERVICE_CONFIG_READY, MESSAGE_SERVICE_CONFIG_READY};
use serde::Serialize;
use sha2::{Digest, Sha256};

const KOLLA_CONFIG_TEMPLATE: &str = include_str!("../../../templates/mariadb/config.json.tmpl");
const MY_CNF_TEMPLATE: &str = include_str!("../../../templates/mariadb/my.cnf.tmpl");
const BOOTSTRAP_TEMPLATE: &str = include_str!("../../../templates/mariadb/mysql_bootstrap.sh.tmpl");

/// Certificate key in a `kubernetes.io/tls` secret
pub const TLS_CERT_KEY: &str = "tls.crt";
/// Private key in a `kubernetes.io/tls` secret
pub const TLS_KEY_KEY: &str = "tls.key";

// Config hash entry names
pub(crate) const HASH_ENTRY_CONFIGMAP: &str = "configmap";
const HASH_ENTRY_TLS: &str = "tls-secret";
const HASH_ENTRY_CA: &str = "ca-secret";

/// Substitute `{{KEY}}` placeholders in `template`.
///
/// # Errors
///
/// Returns [`MariaDbError::Template`] naming the first placeholder left unresolved.
pub fn render_template(
    template_name: &str,
    template: &str,
    params: &BTreeMap<&str, String>,
) -> Result<String> {
    let mut rendered = template.to_string();
    for (key, value) in params {
        rendered = rendered.replace(&format!("{{{{{key}}}}}"), value);
    }

    if let Some(start) = rendered.find("{{") {
        let rest = &rendered[start + 2..];
        let parameter = rest.find("}}").map_or(rest, |end| &rest[..end]);
        return Err(MariaDbError::Template {
            template: template_name.to_string(),
            parameter: parameter.trim().to_string(),
        });
    }

    Ok(rendered)
}

/// The `[mysqld]` TLS settings for the mounted secrets, empty without TLS.
#[must_use]
pub fn tls_config(db: &MariaDB) -> String {
    let Some(tls) = db.spec.tls.as_ref() else {
        return String::new();
    };

    let mut lines = Vec::new();
    if tls.secret_name.is_some() {
        lines.push("ssl".to_string());
        lines.push(format!("ssl-cert = {TLS_CERT_PATH}/{TLS_CERT_KEY}"));
        lines.push(format!("ssl-key = {TLS_CERT_PATH}/{TLS_KEY_KEY}"));
    }
    if tls.ca_secret_name.is_some() {
        lines.push(format!("ssl-ca = {TLS_CA_PATH}/{CA_BUNDLE_KEY}"));
    }
    lines.join("\n")
}

/// Render the files of the scripts `ConfigMap`.
///
/// # Errors
///
/// Returns a template error if a placeholder has no value.
pub fn render_scripts(db: &MariaDB) -> Result<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    params.insert("DB_MAX_TIMEOUT", DB_MAX_TIMEOUT_SECS.to_string());
    params.insert("MARIADB_PORT", MARIADB_PORT.to_string());
    params.insert("TLS_CONFIG", tls_config(db));

    let mut data = BTreeMap::new();
    data.insert(
        KOLLA_CONFIG_FILE.to_string(),
        render_template(KOLLA_CONFIG_FILE, KOLLA_CONFIG_TEMPLATE, &params)?,
    );
    data.insert(
        MY_CNF_FILE.to_string(),
        render_template(MY_CNF_FILE, MY_CNF_TEMPLATE, &params)?,
    );
    data.insert(
        BOOTSTRAP_SCRIPT.to_string(),
        render_template(BOOTSTRAP_SCRIPT, BOOTSTRAP_TEMPLATE, &params)?,
    );
    Ok(data)
}

/// SHA-256 hex digest of the JSON encoding of `value`.
///
/// # Errors
///
/// Returns a serialization error if `value` cannot be encoded.
pub fn object_hash<T: Serialize>(value: &T) -> Result<String> {
    let bytes = serde_json::to_vec(value)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Combine per-source hashes into the config hash.
#[must_use]
pub fn config_hash(entries: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (name, value) in entries {
        hasher.update(format!("{name}={value}\n").as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Keys a referenced secret must carry, by config hash entry.
fn required_keys(entry: &str) -> &'static [&'static str] {
    match entry {
        HASH_ENTRY_TLS => &[TLS_CERT_KEY, TLS_KEY_KEY],
        HASH_ENTRY_CA => &[CA_BUNDLE_KEY],
        _ => &[],
    }
}

/// Check that `secret` carries every key in `keys`.
///
/// # Errors
///
/// Returns [`MariaDbError::MissingField`] naming the first absent key.
pub fn check_secret_keys(secret: &Secret, keys: &[&str]) -> Result<()> {
    let data = secret.data.as_ref();
    for key in keys {
        if !data.is_some_and(|d| d.contains_key(*key)) {
            return Err(MariaDbError::MissingField {
                field: format!("Secret {} key {key}", secret.name_any()),
            });
        }
    }
    Ok(())
}

/// Fetch a referenced secret, tag it with `mariadb-ref=<db_name>` and hash its data.
///
/// # Errors
///
/// Returns [`MariaDbError::SecretNotFound`] if the secret does not exist, or the
/// API error from the label patch.
pub async fn fetch_secret_hash(
    client: &Client,
    namespace: &str,
    secret_name: &str,
    db_name: &str,
) -> Result<(Secret, String)> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = api
        .get_opt(secret_name)
        .await?
        .ok_or_else(|| MariaDbError::SecretNotFound {
            namespace: namespace.to_string(),
            name: secret_name.to_string(),
        })?;

    let hash = object_hash(&secret.data)?;

    let labeled = secret
        .labels()
        .get(MARIADB_REF_LABEL)
        .is_some_and(|v| v == db_name);
    if labeled {
        return Ok((secret, hash));
    }

    debug!(
        "Labeling Secret {}/{} with {}={}",
        namespace, secret_name, MARIADB_REF_LABEL, db_name
    );
    let patch = json!({
        "metadata": {
            "labels": { MARIADB_REF_LABEL: db_name },
            "resourceVersion": secret.resource_version(),
        }
    });
    let updated = api
        .patch(secret_name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok((updated, hash))
}

fn config_failed(status: &mut MariaDBStatusUpdater, severity: &str, err: &MariaDbError) {
    status.mark_false(
        CONDITION_TYPE_SERVICE_CONFIG_READY,
        REASON_ERROR,
        severity,
        &error_message("Service config", err),
    );
}

/// Reconcile the scripts `ConfigMap` and referenced secrets.
///
/// # Returns
///
/// The config hash to inject into the pod, or a requeue when a referenced secret
/// is missing or changed underneath the label patch.
///
/// # Errors
///
/// Returns template, API and malformed-secret errors after marking
/// `ServiceConfigReady=False`.
pub async fn reconcile_config(
    ctx: &Context,
    db: &MariaDB,
    status: &mut MariaDBStatusUpdater,
) -> Result<StepOutcome<String>> {
    let namespace = db.namespace().unwrap_or_default();
    let db_name = db.name_any();
    let mut entries = BTreeMap::new();

    let configmap = render_scripts(db).map(|data| build_configmap(db, data));
    let configmap = match configmap {
        Ok(cm) => cm,
        Err(e) => {
            config_failed(status, SEVERITY_WARNING, &e);
            return Err(e);
        }
    };
    if let Err(e) = create_or_patch(&ctx.client, &namespace, &configmap, ctx.field_manager()).await
    {
        config_failed(status, SEVERITY_WARNING, &e);
        return Err(e);
    }
    entries.insert(HASH_ENTRY_CONFIGMAP.to_string(), object_hash(&configmap.data)?);

    let tls = db.spec.tls.as_ref();
    let referenced = [
        (HASH_ENTRY_TLS, tls.and_then(|t| t.secret_name.as_deref())),
        (HASH_ENTRY_CA, tls.and_then(|t| t.ca_secret_name.as_deref())),
    ];

    for (entry, secret_name) in referenced {
        let Some(secret_name) = secret_name else {
            continue;
        };

        match fetch_secret_hash(&ctx.client, &namespace, secret_name, &db_name).await {
            Ok((secret, hash)) => {
                if let Err(e) = check_secret_keys(&secret, required_keys(entry)) {
                    config_failed(status, SEVERITY_ERROR, &e);
                    return Err(e);
                }
                entries.insert(entry.to_string(), hash);
            }
            Err(e @ MariaDbError::SecretNotFound { .. }) => {
                warn!("MariaDB {}/{}: {}", namespace, db_name, e);
                config_failed(status, SEVERITY_WARNING, &e);
                return Ok(requeue_secs(SECRET_MISSING_REQUEUE_SECS, REQUEUE_REASON_SECRET_MISSING));
            }
            Err(e) if e.is_conflict() || e.is_not_found() => {
                debug!(
                    "Secret {}/{} changed while labeling, requeueing: {}",
                    namespace, secret_name, e
                );
                return Ok(requeue_secs(TRANSIENT_ERROR_REQUEUE_SECS, REQUEUE_REASON_TRANSIENT));
            }
            Err(e) => {
                config_failed(status, SEVERITY_WARNING, &e);
                return Err(e);
            }
        }
    }

    status.mark_true(CONDITION_TYPE_SERVICE_CONFIG_READY, MESSAGE_SERVICE_CONFIG_READY);
    Ok(StepOutcome::Continue(config_hash(&entries)))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
