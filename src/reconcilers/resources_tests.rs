// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `resources.rs`

#[cfg(test)]
mod tests {
    use crate::reconcilers::resources::{create_or_patch, delete_if_exists, OperationResult};
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use serde_json::json;
    use std::collections::BTreeMap;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CONFIGMAP_PATH: &str = "/api/v1/namespaces/openstack/configmaps/mariadb-openstack";

    fn mock_client(server: &MockServer) -> kube::Client {
        let config = kube::Config::new(server.uri().parse().unwrap());
        kube::Client::try_from(config).unwrap()
    }

    fn desired_configmap() -> ConfigMap {
        let mut data = BTreeMap::new();
        data.insert("my.cnf".to_string(), "[mysqld]".to_string());
        ConfigMap {
            metadata: ObjectMeta {
                name: Some("mariadb-openstack".to_string()),
                namespace: Some("openstack".to_string()),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        }
    }

    fn stored_configmap(resource_version: &str) -> serde_json::Value {
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {
                "name": "mariadb-openstack",
                "namespace": "openstack",
                "resourceVersion": resource_version
            },
            "data": { "my.cnf": "[mysqld]" }
        })
    }

    fn not_found() -> ResponseTemplate {
        ResponseTemplate::new(404).set_body_json(json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": "configmaps \"mariadb-openstack\" not found",
            "reason": "NotFound",
            "code": 404
        }))
    }

    #[test]
    fn test_operation_result_changed() {
        assert!(OperationResult::Created.changed());
        assert!(OperationResult::Updated.changed());
        assert!(!OperationResult::Unchanged.changed());
    }

    #[tokio::test]
    async fn test_create_when_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONFIGMAP_PATH))
            .respond_with(not_found())
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/namespaces/openstack/configmaps"))
            .and(query_param("fieldManager", "mariadb-operator"))
            .respond_with(ResponseTemplate::new(201).set_body_json(stored_configmap("1")))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let (created, result) =
            create_or_patch(&client, "openstack", &desired_configmap(), "mariadb-operator")
                .await
                .unwrap();

        assert_eq!(result, OperationResult::Created);
        assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_unchanged_when_resource_version_stable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONFIGMAP_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(stored_configmap("7")))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(CONFIGMAP_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(stored_configmap("7")))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let (_, result) =
            create_or_patch(&client, "openstack", &desired_configmap(), "mariadb-operator")
                .await
                .unwrap();

        assert_eq!(result, OperationResult::Unchanged);
    }

    #[tokio::test]
    async fn test_updated_when_resource_version_bumped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONFIGMAP_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(stored_configmap("7")))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(CONFIGMAP_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(stored_configmap("8")))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let (_, result) =
            create_or_patch(&client, "openstack", &desired_configmap(), "mariadb-operator")
                .await
                .unwrap();

        assert_eq!(result, OperationResult::Updated);
    }

    #[tokio::test]
    async fn test_missing_name_is_rejected() {
        let server = MockServer::start().await;
        let client = mock_client(&server);

        let nameless = ConfigMap::default();
        let err = create_or_patch(&client, "openstack", &nameless, "mariadb-operator")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("metadata.name"));
    }

    #[tokio::test]
    async fn test_delete_if_exists_tolerates_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(CONFIGMAP_PATH))
            .respond_with(not_found())
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let deleted = delete_if_exists::<ConfigMap>(&client, "openstack", "mariadb-openstack")
            .await
            .unwrap();
        assert!(!deleted);
    }
}
