// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `validation.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::crd::{MariaDB, MariaDBSpec};
    use crate::errors::MariaDbError;
    use crate::reconcilers::status::MariaDBStatusUpdater;
    use crate::status_reasons::{CONDITION_TYPE_INPUT_READY, SEVERITY_ERROR, STATUS_FALSE};

    fn create_test_mariadb(storage_request: &str, image: &str) -> MariaDB {
        let mut db = MariaDB::new(
            "openstack",
            MariaDBSpec {
                secret: Some("osp-secret".to_string()),
                storage_request: storage_request.to_string(),
                container_image: image.to_string(),
                ..Default::default()
            },
        );
        db.metadata.namespace = Some("openstack".to_string());
        db
    }

    #[test]
    fn test_parse_quantity_suffixes() {
        assert_eq!(parse_quantity_value("500M").unwrap(), 500e6);
        assert_eq!(parse_quantity_value("1Gi").unwrap(), 1024_f64.powi(3));
        assert_eq!(parse_quantity_value("1.5k").unwrap(), 1500.0);
        assert_eq!(parse_quantity_value("5e3").unwrap(), 5000.0);
        assert_eq!(parse_quantity_value("1024").unwrap(), 1024.0);
    }

    #[test]
    fn test_parse_quantity_rejects_garbage() {
        assert!(parse_quantity_value("").is_err());
        assert!(parse_quantity_value("abc").is_err());
        assert!(parse_quantity_value("10GB").is_err());
        assert!(parse_quantity_value("1..2").is_err());
        assert!(parse_quantity_value("5ex").is_err());
    }

    #[test]
    fn test_storage_request_must_be_positive() {
        let err = parse_storage_request("-1Gi").unwrap_err();
        assert!(matches!(err, MariaDbError::InvalidQuantity { .. }));
        assert!(parse_storage_request("0").is_err());
    }

    #[test]
    fn test_blank_storage_request_uses_default() {
        assert_eq!(parse_storage_request("").unwrap().0, "500M");
    }

    #[test]
    fn test_effective_image_falls_back_to_default() {
        let db = create_test_mariadb("500M", "");
        assert_eq!(effective_image(&db, "default:latest"), "default:latest");

        let pinned = create_test_mariadb("500M", "custom:1");
        assert_eq!(effective_image(&pinned, "default:latest"), "custom:1");
    }

    #[test]
    fn test_missing_root_secret_is_invalid() {
        let mut db = create_test_mariadb("500M", "");
        db.spec.secret = None;
        let err = validate_spec(&db, "default").unwrap_err();
        assert!(err.is_invalid_spec());
    }

    #[test]
    fn test_invalid_quantity_marks_input_ready_false() {
        let db = create_test_mariadb("lots", "");
        let mut updater = MariaDBStatusUpdater::new(&db);

        let err = reconcile_input(&db, "default", &mut updater).unwrap_err();
        assert!(matches!(err, MariaDbError::InvalidQuantity { .. }));

        let condition = updater.condition(CONDITION_TYPE_INPUT_READY).unwrap();
        assert_eq!(condition.status, STATUS_FALSE);
        assert_eq!(condition.severity.as_deref(), Some(SEVERITY_ERROR));
        assert!(condition
            .message
            .as_deref()
            .is_some_and(|m| m.contains("Input data error occurred")));
    }

    #[test]
    fn test_valid_spec_marks_input_ready_true() {
        let db = create_test_mariadb("10Gi", "custom:1");
        let mut updater = MariaDBStatusUpdater::new(&db);

        let validated = reconcile_input(&db, "default", &mut updater).unwrap();
        assert_eq!(validated.image, "custom:1");
        assert_eq!(validated.root_secret, "osp-secret");
        assert!(updater.is_true(CONDITION_TYPE_INPUT_READY));
    }
}
