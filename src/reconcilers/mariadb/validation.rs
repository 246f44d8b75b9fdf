// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Spec validation for `MariaDB` resources.
//!
//! Validation runs before any child object is touched. A spec that fails here
//! cannot converge until it is edited, so the error is reported on `InputReady`
//! and the pass stops.

use super::types::*;
use crate::constants::DEFAULT_STORAGE_REQUEST;
use crate::status_reasons::{CONDITION_TYPE_INPUT_READY, MESSAGE_INPUT_READY};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

const STORAGE_REQUEST_FIELD: &str = "spec.storageRequest";

/// Inputs derived from a valid spec.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSpec {
    /// Parsed `storageRequest`
    pub storage: Quantity,
    /// Image for the pod and db-init job
    pub image: String,
    /// Secret holding `DbRootPassword`
    pub root_secret: String,
}

/// Suffix multipliers accepted by Kubernetes quantities.
fn suffix_multiplier(suffix: &str) -> Option<f64> {
    let multiplier = match suffix {
        "" => 1.0,
        "Ki" => 1024_f64,
        "Mi" => 1024_f64.powi(2),
        "Gi" => 1024_f64.powi(3),
        "Ti" => 1024_f64.powi(4),
        "Pi" => 1024_f64.powi(5),
        "Ei" => 1024_f64.powi(6),
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        _ => return None,
    };
    Some(multiplier)
}

/// Parse a Kubernetes quantity string into its numeric value.
///
/// Accepts the same grammar as the API server: an optionally signed decimal
/// number followed by a binary SI suffix, a decimal SI suffix, or a decimal
/// exponent (`1e3`).
///
/// # Errors
///
/// Returns a description of the problem when `value` is not a quantity.
pub fn parse_quantity_value(value: &str) -> std::result::Result<f64, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("quantity is empty".to_string());
    }

    let number_end = value
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '+' || *c == '-'))))
        .map_or(value.len(), |(i, _)| i);
    let (number, suffix) = value.split_at(number_end);

    let digits = number.trim_start_matches(['+', '-']);
    if digits.is_empty() || digits == "." || digits.matches('.').count() > 1 {
        return Err(format!("'{number}' is not a number"));
    }
    let base: f64 = number
        .parse()
        .map_err(|_| format!("'{number}' is not a number"))?;

    if let Some(multiplier) = suffix_multiplier(suffix) {
        return Ok(base * multiplier);
    }

    // Decimal exponent form, e.g. 5e8 or 1E+3
    if let Some(exponent) = suffix.strip_prefix(['e', 'E']) {
        let exponent: i32 = exponent
            .parse()
            .map_err(|_| format!("unknown suffix '{suffix}'"))?;
        return Ok(base * 10_f64.powi(exponent));
    }

    Err(format!("unknown suffix '{suffix}'"))
}

/// Validate `storageRequest` and wrap it as a `Quantity`.
///
/// # Errors
///
/// Returns [`MariaDbError::InvalidQuantity`] for unparseable or non-positive sizes.
pub fn parse_storage_request(value: &str) -> Result<Quantity> {
    let value = if value.trim().is_empty() {
        DEFAULT_STORAGE_REQUEST
    } else {
        value.trim()
    };

    let invalid = |reason: String| MariaDbError::InvalidQuantity {
        field: STORAGE_REQUEST_FIELD.to_string(),
        value: value.to_string(),
        reason,
    };

    let amount = parse_quantity_value(value).map_err(invalid)?;
    if amount < 1.0 {
        return Err(invalid("storage request must be at least one byte".to_string()));
    }

    Ok(Quantity(value.to_string()))
}

/// The image to run: the spec's `containerImage`, or the operator default.
#[must_use]
pub fn effective_image(db: &MariaDB, default_image: &str) -> String {
    let image = db.spec.container_image.trim();
    if image.is_empty() {
        default_image.to_string()
    } else {
        image.to_string()
    }
}

/// Validate the spec without touching status.
///
/// # Errors
///
/// Returns the first validation failure.
pub fn validate_spec(db: &MariaDB, default_image: &str) -> Result<ValidatedSpec> {
    let storage = parse_storage_request(&db.spec.storage_request)?;

    let root_secret = db
        .spec
        .secret
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| MariaDbError::MissingField {
            field: "spec.secret".to_string(),
        })?
        .to_string();

    Ok(ValidatedSpec {
        storage,
        image: effective_image(db, default_image),
        root_secret,
    })
}

/// Validate the spec and record the outcome on `InputReady`.
///
/// # Errors
///
/// Returns the validation error after marking `InputReady=False` with severity Error.
pub fn reconcile_input(
    db: &MariaDB,
    default_image: &str,
    status: &mut MariaDBStatusUpdater,
) -> Result<ValidatedSpec> {
    match validate_spec(db, default_image) {
        Ok(validated) => {
            status.mark_true(CONDITION_TYPE_INPUT_READY, MESSAGE_INPUT_READY);
            Ok(validated)
        }
        Err(e) => {
            warn!(
                "MariaDB {}/{} has an invalid spec: {}",
                db.namespace().unwrap_or_default(),
                db.name_any(),
                e
            );
            status.mark_false(
                CONDITION_TYPE_INPUT_READY,
                REASON_ERROR,
                SEVERITY_ERROR,
                &error_message("Input data", &e),
            );
            Err(e)
        }
    }
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod validation_tests;
