// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{MariaDBAccount, MariaDBAccountSpec};
    use crate::reconcilers::finalizers::{
        ensure_finalizer, finalizer_patch, remove_finalizer, with_finalizer, without_finalizer,
    };
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_FINALIZER: &str = "openstack.org/keystone";
    const ACCOUNT_PATH: &str =
        "/apis/mariadb.openstack.org/v1beta1/namespaces/openstack/mariadbaccounts/keystone";

    fn create_test_account(finalizers: Option<Vec<String>>) -> MariaDBAccount {
        let mut account = MariaDBAccount::new(
            "keystone",
            MariaDBAccountSpec {
                user_name: "keystone_ab12".to_string(),
                secret: "keystone-db-secret".to_string(),
            },
        );
        account.metadata.namespace = Some("openstack".to_string());
        account.metadata.resource_version = Some("3".to_string());
        account.metadata.finalizers = finalizers;
        account
    }

    fn account_json(finalizers: &[&str]) -> serde_json::Value {
        json!({
            "apiVersion": "mariadb.openstack.org/v1beta1",
            "kind": "MariaDBAccount",
            "metadata": {
                "name": "keystone",
                "namespace": "openstack",
                "resourceVersion": "4",
                "finalizers": finalizers
            },
            "spec": { "userName": "keystone_ab12", "secret": "keystone-db-secret" }
        })
    }

    #[test]
    fn test_with_finalizer() {
        let current = vec!["other".to_string()];
        assert_eq!(
            with_finalizer(&current, TEST_FINALIZER),
            Some(vec!["other".to_string(), TEST_FINALIZER.to_string()])
        );

        let present = vec![TEST_FINALIZER.to_string()];
        assert_eq!(with_finalizer(&present, TEST_FINALIZER), None);
    }

    #[test]
    fn test_without_finalizer_keeps_others() {
        let current = vec!["other".to_string(), TEST_FINALIZER.to_string()];
        assert_eq!(
            without_finalizer(&current, TEST_FINALIZER),
            Some(vec!["other".to_string()])
        );
        assert_eq!(without_finalizer(&["other".to_string()], TEST_FINALIZER), None);
    }

    #[test]
    fn test_finalizer_patch_is_guarded() {
        let patch = finalizer_patch(&[TEST_FINALIZER.to_string()], Some("3"));
        assert_eq!(patch["metadata"]["finalizers"][0], TEST_FINALIZER);
        assert_eq!(patch["metadata"]["resourceVersion"], "3");

        let unguarded = finalizer_patch(&[], None);
        assert!(unguarded["metadata"].get("resourceVersion").is_none());
    }

    #[tokio::test]
    async fn test_ensure_finalizer_patches_when_missing() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(ACCOUNT_PATH))
            .and(body_partial_json(json!({
                "metadata": { "finalizers": [TEST_FINALIZER], "resourceVersion": "3" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(account_json(&[TEST_FINALIZER])))
            .expect(1)
            .mount(&server)
            .await;

        let client = kube::Client::try_from(kube::Config::new(server.uri().parse().unwrap())).unwrap();
        let account = create_test_account(None);

        assert!(ensure_finalizer(&client, &account, TEST_FINALIZER).await.unwrap());
    }

    #[tokio::test]
    async fn test_finalizer_helpers_skip_noop_patches() {
        // No mocks mounted: any request would fail the call
        let server = MockServer::start().await;
        let client = kube::Client::try_from(kube::Config::new(server.uri().parse().unwrap())).unwrap();

        let finalized = create_test_account(Some(vec![TEST_FINALIZER.to_string()]));
        assert!(!ensure_finalizer(&client, &finalized, TEST_FINALIZER).await.unwrap());

        let bare = create_test_account(None);
        assert!(!remove_finalizer(&client, &bare, TEST_FINALIZER).await.unwrap());
    }
}
