// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status_reasons` module

#[cfg(test)]
mod tests {
    use crate::status_reasons::*;

    #[test]
    fn test_condition_types_match_wire_names() {
        assert_eq!(CONDITION_TYPE_READY, "Ready");
        assert_eq!(CONDITION_TYPE_EXPOSE_SERVICE_READY, "ExposeServiceReady");
        assert_eq!(CONDITION_TYPE_SERVICE_CONFIG_READY, "ServiceConfigReady");
        assert_eq!(CONDITION_TYPE_MARIADB_INITIALIZED, "MariaDBInitialized");
        assert_eq!(CONDITION_TYPE_DEPLOYMENT_READY, "DeploymentReady");
        assert_eq!(CONDITION_TYPE_SERVICE_ACCOUNT_READY, "ServiceAccountReady");
        assert_eq!(CONDITION_TYPE_ROLE_READY, "RoleReady");
        assert_eq!(CONDITION_TYPE_ROLE_BINDING_READY, "RoleBindingReady");
    }

    #[test]
    fn test_constituent_types_exclude_ready_and_are_unique() {
        assert!(!MARIADB_CONDITION_TYPES.contains(&CONDITION_TYPE_READY));

        let mut sorted = MARIADB_CONDITION_TYPES.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), MARIADB_CONDITION_TYPES.len());
    }

    // ============================================================================
    // Severity ranking
    // ============================================================================

    #[test]
    fn test_severity_rank_orders_error_over_warning_over_info() {
        assert!(severity_rank(Some(SEVERITY_ERROR)) > severity_rank(Some(SEVERITY_WARNING)));
        assert!(severity_rank(Some(SEVERITY_WARNING)) > severity_rank(Some(SEVERITY_INFO)));
        assert!(severity_rank(Some(SEVERITY_INFO)) > severity_rank(None));
    }

    #[test]
    fn test_severity_rank_unknown_value_is_lowest() {
        assert_eq!(severity_rank(Some("Critical")), 0);
    }

    // ============================================================================
    // Messages
    // ============================================================================

    #[test]
    fn test_init_message_for_each_type() {
        for condition_type in MARIADB_CONDITION_TYPES {
            let message = init_message(condition_type);
            assert!(
                message.contains("not started"),
                "{condition_type} init message should say not started, got {message}"
            );
        }
        assert_eq!(init_message(CONDITION_TYPE_READY), MESSAGE_READY_INIT);
    }

    #[test]
    fn test_error_message_format() {
        let msg = error_message("Exposing service", &"connection refused");
        assert_eq!(msg, "Exposing service error occurred: connection refused");
    }
}
