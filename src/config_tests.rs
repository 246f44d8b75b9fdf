// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use crate::config::OperatorConfig;
    use crate::constants::{DEFAULT_FIELD_MANAGER, METRICS_SERVER_BIND_ADDRESS};
    use clap::Parser;

    #[test]
    fn test_flags_override_defaults() {
        let config = OperatorConfig::try_parse_from([
            "mariadb-operator",
            "--default-image",
            "quay.io/example/mariadb:1",
            "--metrics-bind-address",
            "127.0.0.1:9090",
            "--watch-namespace",
            "openstack",
            "--field-manager",
            "test-manager",
        ])
        .unwrap();

        assert_eq!(config.default_image, "quay.io/example/mariadb:1");
        assert_eq!(config.metrics_bind_address, "127.0.0.1:9090");
        assert_eq!(config.namespace(), Some("openstack"));
        assert_eq!(config.field_manager, "test-manager");
    }

    #[test]
    fn test_default_is_cluster_wide() {
        let config = OperatorConfig::default();
        assert_eq!(config.namespace(), None);
        assert_eq!(config.field_manager, DEFAULT_FIELD_MANAGER);
        assert_eq!(config.metrics_bind_address, METRICS_SERVER_BIND_ADDRESS);
    }

    #[test]
    fn test_blank_namespace_means_all() {
        let config = OperatorConfig {
            watch_namespace: "  ".to_string(),
            ..OperatorConfig::default()
        };
        assert_eq!(config.namespace(), None);
    }
}
