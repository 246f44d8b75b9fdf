// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconcile error types for the MariaDB operator.
//!
//! [`MariaDbError`] classifies every failure a reconcile pass can hit so that the
//! controller's error policy can pick a requeue delay and the status updater can
//! pick a condition severity:
//!
//! - transient API errors (429, 5xx, connection failures) are retried quickly
//! - conflicts and not-found during teardown races are retried quickly
//! - missing referenced secrets are reported and retried after a bounded delay
//! - invalid specs surface as an error condition and wait for an edit

use crate::constants::{
    ERROR_REQUEUE_DURATION_SECS, INVALID_SPEC_REQUEUE_SECS, SECRET_MISSING_REQUEUE_SECS,
    TRANSIENT_ERROR_REQUEUE_SECS,
};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while reconciling a `MariaDB`.
#[derive(Error, Debug)]
pub enum MariaDbError {
    /// Any error returned by the Kubernetes API client
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// A referenced secret does not exist (yet)
    #[error("Secret '{name}' not found in namespace '{namespace}'")]
    SecretNotFound {
        /// Namespace that was searched
        namespace: String,
        /// Secret name from the spec
        name: String,
    },

    /// A quantity field could not be parsed
    #[error("Invalid quantity '{value}' for {field}: {reason}")]
    InvalidQuantity {
        /// Spec field, e.g. `spec.storageRequest`
        field: String,
        /// The offending value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// A field required by the current step is missing
    #[error("Required field '{field}' is not set")]
    MissingField {
        /// Dotted path of the field
        field: String,
    },

    /// The db-init job reported failure
    #[error("Job '{name}' failed: {reason}")]
    JobFailed {
        /// Job name
        name: String,
        /// Failure reason from the job status
        reason: String,
    },

    /// Hashing or patch construction failed to serialize an object
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A template referenced a parameter that was not supplied
    #[error("Template '{template}' references unknown parameter '{parameter}'")]
    Template {
        /// Template file name
        template: String,
        /// Parameter name without braces
        parameter: String,
    },
}

/// Convenience alias used across the reconcilers.
pub type Result<T, E = MariaDbError> = std::result::Result<T, E>;

impl MariaDbError {
    /// True for HTTP 404 and for missing referenced secrets.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Kube(err) => api_error_code(err) == Some(404),
            Self::SecretNotFound { .. } => true,
            _ => false,
        }
    }

    /// True for HTTP 409 (optimistic concurrency conflict or `AlreadyExists`).
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Kube(err) if api_error_code(err) == Some(409))
    }

    /// True when the next pass is likely to succeed without user intervention.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Kube(err) => {
                is_transient_kube_error(err) || matches!(api_error_code(err), Some(404 | 409))
            }
            Self::SecretNotFound { .. } => true,
            _ => false,
        }
    }

    /// True when only a spec change can fix the error.
    #[must_use]
    pub fn is_invalid_spec(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuantity { .. } | Self::MissingField { .. }
        )
    }

    /// How long the controller should wait before retrying.
    #[must_use]
    pub fn requeue_after(&self) -> Duration {
        if self.is_invalid_spec() {
            Duration::from_secs(INVALID_SPEC_REQUEUE_SECS)
        } else if matches!(self, Self::SecretNotFound { .. }) {
            Duration::from_secs(SECRET_MISSING_REQUEUE_SECS)
        } else if self.is_retryable() {
            Duration::from_secs(TRANSIENT_ERROR_REQUEUE_SECS)
        } else {
            Duration::from_secs(ERROR_REQUEUE_DURATION_SECS)
        }
    }

    /// Short category used as the `error_type` metric label.
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::Kube(_) => "api_error",
            Self::SecretNotFound { .. } => "secret_not_found",
            Self::InvalidQuantity { .. } | Self::MissingField { .. } => "validation_error",
            Self::JobFailed { .. } => "job_failed",
            Self::Serialization(_) | Self::Template { .. } => "internal_error",
        }
    }
}

/// HTTP status code of an API error, if it is one.
#[must_use]
pub fn api_error_code(err: &kube::Error) -> Option<u16> {
    match err {
        kube::Error::Api(api_err) => Some(api_err.code),
        _ => None,
    }
}

/// True for rate limiting, server errors and connection failures.
#[must_use]
pub fn is_transient_kube_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => api_err.code == 429 || (500..600).contains(&api_err.code),
        kube::Error::Service(_) => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
