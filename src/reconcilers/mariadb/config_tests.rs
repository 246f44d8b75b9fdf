// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::OperatorConfig;
    use crate::context::Context;
    use crate::crd::{MariaDB, MariaDBSpec, TlsSpec};
    use crate::errors::MariaDbError;
    use crate::reconcilers::mariadb::types::requeue_secs;
    use crate::reconcilers::status::MariaDBStatusUpdater;
    use crate::status_reasons::{
        CONDITION_TYPE_SERVICE_CONFIG_READY, MARIADB_CONDITION_TYPES, SEVERITY_WARNING,
        STATUS_FALSE,
    };
    use k8s_openapi::api::core::v1::Secret;
    use k8s_openapi::ByteString;
    use serde_json::json;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_mariadb(tls: Option<TlsSpec>) -> MariaDB {
        let mut db = MariaDB::new(
            "openstack",
            MariaDBSpec {
                secret: Some("osp-secret".to_string()),
                tls,
                ..Default::default()
            },
        );
        db.metadata.namespace = Some("openstack".to_string());
        db.metadata.uid = Some("uid-1".to_string());
        db
    }

    fn tls_spec() -> TlsSpec {
        TlsSpec {
            secret_name: Some("cert-galera".to_string()),
            ca_secret_name: None,
        }
    }

    fn mock_client(server: &MockServer) -> kube::Client {
        kube::Client::try_from(kube::Config::new(server.uri().parse().unwrap())).unwrap()
    }

    fn not_found() -> ResponseTemplate {
        ResponseTemplate::new(404).set_body_json(json!({
            "kind": "Status", "apiVersion": "v1", "metadata": {},
            "status": "Failure", "message": "not found", "reason": "NotFound", "code": 404
        }))
    }

    fn secret_json(labels: serde_json::Value, cert: &str) -> serde_json::Value {
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": "cert-galera",
                "namespace": "openstack",
                "resourceVersion": "12",
                "labels": labels
            },
            "data": { "tls.crt": cert, "tls.key": "a2V5" }
        })
    }

    #[test]
    fn test_render_template_substitutes_params() {
        let mut params = BTreeMap::new();
        params.insert("PORT", "3306".to_string());
        let rendered = render_template("t", "port = {{PORT}}", &params).unwrap();
        assert_eq!(rendered, "port = 3306");
    }

    #[test]
    fn test_render_template_reports_unknown_parameter() {
        let err = render_template("my.cnf", "x = {{ MISSING }}", &BTreeMap::new()).unwrap_err();
        match err {
            MariaDbError::Template {
                template,
                parameter,
            } => {
                assert_eq!(template, "my.cnf");
                assert_eq!(parameter, "MISSING");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_render_scripts_without_tls() {
        let data = render_scripts(&create_test_mariadb(None)).unwrap();

        assert_eq!(data.len(), 3);
        let my_cnf = &data["my.cnf"];
        assert!(my_cnf.contains("port = 3306"));
        assert!(!my_cnf.contains("ssl"));
        assert!(data["mysql_bootstrap.sh"].contains("${DB_MAX_TIMEOUT:-60}"));
        assert!(data.values().all(|v| !v.contains("{{")));
    }

    #[test]
    fn test_render_scripts_with_tls() {
        let db = create_test_mariadb(Some(TlsSpec {
            secret_name: Some("cert-galera".to_string()),
            ca_secret_name: Some("combined-ca-bundle".to_string()),
        }));
        let my_cnf = render_scripts(&db).unwrap().remove("my.cnf").unwrap();

        assert!(my_cnf.contains("ssl-cert = /var/lib/config-data/tls/tls.crt"));
        assert!(my_cnf.contains("ssl-key = /var/lib/config-data/tls/tls.key"));
        assert!(my_cnf.contains("ssl-ca = /var/lib/config-data/ca/tls-ca-bundle.pem"));
    }

    #[test]
    fn test_config_hash_depends_on_names_and_values() {
        let mut a = BTreeMap::new();
        a.insert("configmap".to_string(), "abc".to_string());
        a.insert("tls-secret".to_string(), "def".to_string());

        // Same concatenation, different split between entries
        let mut b = BTreeMap::new();
        b.insert("configmap".to_string(), "abcd".to_string());
        b.insert("tls-secret".to_string(), "ef".to_string());

        assert_eq!(config_hash(&a), config_hash(&a.clone()));
        assert_ne!(config_hash(&a), config_hash(&b));
        assert_eq!(config_hash(&a).len(), 64);
    }

    #[test]
    fn test_check_secret_keys() {
        let mut data = BTreeMap::new();
        data.insert("tls.crt".to_string(), ByteString(b"cert".to_vec()));
        let mut secret = Secret {
            data: Some(data),
            ..Default::default()
        };
        secret.metadata.name = Some("cert-galera".to_string());

        assert!(check_secret_keys(&secret, &["tls.crt"]).is_ok());
        let err = check_secret_keys(&secret, &["tls.crt", "tls.key"]).unwrap_err();
        assert!(err.to_string().contains("tls.key"));
    }

    #[tokio::test]
    async fn test_fetch_secret_hash_labels_secret() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/openstack/secrets/cert-galera"))
            .respond_with(ResponseTemplate::new(200).set_body_json(secret_json(json!({}), "Y2VydA==")))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/v1/namespaces/openstack/secrets/cert-galera"))
            .and(body_partial_json(json!({
                "metadata": { "labels": { "mariadb-ref": "openstack" }, "resourceVersion": "12" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(secret_json(
                json!({ "mariadb-ref": "openstack" }),
                "Y2VydA==",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let (secret, hash) =
            fetch_secret_hash(&mock_client(&server), "openstack", "cert-galera", "openstack")
                .await
                .unwrap();
        assert_eq!(secret.labels().get("mariadb-ref").map(String::as_str), Some("openstack"));
        assert_eq!(hash.len(), 64);
    }

    #[tokio::test]
    async fn test_secret_hash_tracks_content() {
        let server = MockServer::start().await;
        let labels = json!({ "mariadb-ref": "openstack" });
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/openstack/secrets/cert-galera"))
            .respond_with(ResponseTemplate::new(200).set_body_json(secret_json(labels.clone(), "b2xk")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/openstack/secrets/cert-galera"))
            .respond_with(ResponseTemplate::new(200).set_body_json(secret_json(labels, "bmV3")))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let (_, before) = fetch_secret_hash(&client, "openstack", "cert-galera", "openstack")
            .await
            .unwrap();
        let (_, after) = fetch_secret_hash(&client, "openstack", "cert-galera", "openstack")
            .await
            .unwrap();
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_missing_tls_secret_requeues_with_warning() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/openstack/configmaps/mariadb-openstack"))
            .respond_with(not_found())
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/namespaces/openstack/configmaps"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "apiVersion": "v1", "kind": "ConfigMap",
                "metadata": { "name": "mariadb-openstack", "namespace": "openstack", "resourceVersion": "1" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/openstack/secrets/cert-galera"))
            .respond_with(not_found())
            .mount(&server)
            .await;

        let ctx = Context::new(mock_client(&server), OperatorConfig::default());
        let db = create_test_mariadb(Some(tls_spec()));
        let mut updater = MariaDBStatusUpdater::new(&db);
        updater.init_conditions(&MARIADB_CONDITION_TYPES);

        let outcome = reconcile_config(&ctx, &db, &mut updater).await.unwrap();
        assert_eq!(outcome, requeue_secs(10, "secret_missing"));

        let condition = updater.condition(CONDITION_TYPE_SERVICE_CONFIG_READY).unwrap();
        assert_eq!(condition.status, STATUS_FALSE);
        assert_eq!(condition.severity.as_deref(), Some(SEVERITY_WARNING));
    }
}
