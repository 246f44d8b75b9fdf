// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `rbac.rs`

#[cfg(test)]
mod tests {
    use super::super::reconcile_rbac;
    use crate::config::OperatorConfig;
    use crate::context::Context;
    use crate::crd::{MariaDB, MariaDBSpec};
    use crate::reconcilers::status::MariaDBStatusUpdater;
    use crate::status_reasons::{
        CONDITION_TYPE_ROLE_BINDING_READY, CONDITION_TYPE_ROLE_READY,
        CONDITION_TYPE_SERVICE_ACCOUNT_READY, MARIADB_CONDITION_TYPES, SEVERITY_WARNING,
        STATUS_FALSE, STATUS_UNKNOWN,
    };
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SA_PATH: &str = "/api/v1/namespaces/openstack/serviceaccounts/mariadb-openstack";
    const ROLE_PATH: &str =
        "/apis/rbac.authorization.k8s.io/v1/namespaces/openstack/roles/mariadb-openstack";
    const BINDING_PATH: &str =
        "/apis/rbac.authorization.k8s.io/v1/namespaces/openstack/rolebindings/mariadb-openstack";

    fn create_test_mariadb() -> MariaDB {
        let mut db = MariaDB::new(
            "openstack",
            MariaDBSpec {
                secret: Some("osp-secret".to_string()),
                ..Default::default()
            },
        );
        db.metadata.namespace = Some("openstack".to_string());
        db.metadata.uid = Some("uid-1".to_string());
        db
    }

    fn test_context(server: &MockServer) -> Context {
        let client =
            kube::Client::try_from(kube::Config::new(server.uri().parse().unwrap())).unwrap();
        Context::new(client, OperatorConfig::default())
    }

    fn not_found() -> ResponseTemplate {
        ResponseTemplate::new(404).set_body_json(json!({
            "kind": "Status", "apiVersion": "v1", "metadata": {},
            "status": "Failure", "message": "not found", "reason": "NotFound", "code": 404
        }))
    }

    fn stored(api_version: &str, kind: &str) -> serde_json::Value {
        json!({
            "apiVersion": api_version,
            "kind": kind,
            "metadata": { "name": "mariadb-openstack", "namespace": "openstack", "resourceVersion": "1" }
        })
    }

    #[tokio::test]
    async fn test_creates_all_rbac_objects() {
        let server = MockServer::start().await;
        for (object_path, collection, api_version, kind) in [
            (SA_PATH, "/api/v1/namespaces/openstack/serviceaccounts", "v1", "ServiceAccount"),
            (
                ROLE_PATH,
                "/apis/rbac.authorization.k8s.io/v1/namespaces/openstack/roles",
                "rbac.authorization.k8s.io/v1",
                "Role",
            ),
            (
                BINDING_PATH,
                "/apis/rbac.authorization.k8s.io/v1/namespaces/openstack/rolebindings",
                "rbac.authorization.k8s.io/v1",
                "RoleBinding",
            ),
        ] {
            Mock::given(method("GET"))
                .and(path(object_path))
                .respond_with(not_found())
                .mount(&server)
                .await;
            let mut body = stored(api_version, kind);
            if kind == "RoleBinding" {
                body["roleRef"] = json!({
                    "apiGroup": "rbac.authorization.k8s.io", "kind": "Role", "name": "mariadb-openstack"
                });
            }
            Mock::given(method("POST"))
                .and(path(collection))
                .respond_with(ResponseTemplate::new(201).set_body_json(body))
                .expect(1)
                .mount(&server)
                .await;
        }

        let db = create_test_mariadb();
        let mut updater = MariaDBStatusUpdater::new(&db);
        updater.init_conditions(&MARIADB_CONDITION_TYPES);

        reconcile_rbac(&test_context(&server), &db, &mut updater)
            .await
            .unwrap();

        assert!(updater.is_true(CONDITION_TYPE_SERVICE_ACCOUNT_READY));
        assert!(updater.is_true(CONDITION_TYPE_ROLE_READY));
        assert!(updater.is_true(CONDITION_TYPE_ROLE_BINDING_READY));
    }

    #[tokio::test]
    async fn test_service_account_failure_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SA_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "kind": "Status", "apiVersion": "v1", "metadata": {},
                "status": "Failure", "message": "forbidden", "reason": "Forbidden", "code": 403
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(ROLE_PATH))
            .respond_with(not_found())
            .expect(0)
            .mount(&server)
            .await;

        let db = create_test_mariadb();
        let mut updater = MariaDBStatusUpdater::new(&db);
        updater.init_conditions(&MARIADB_CONDITION_TYPES);

        let result = reconcile_rbac(&test_context(&server), &db, &mut updater).await;
        assert!(result.is_err());

        let sa = updater.condition(CONDITION_TYPE_SERVICE_ACCOUNT_READY).unwrap();
        assert_eq!(sa.status, STATUS_FALSE);
        assert_eq!(sa.severity.as_deref(), Some(SEVERITY_WARNING));

        let role = updater.condition(CONDITION_TYPE_ROLE_READY).unwrap();
        assert_eq!(role.status, STATUS_UNKNOWN);
    }
}
