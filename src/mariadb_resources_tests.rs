// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `mariadb_resources.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{AdoptionRedirectSpec, MariaDB, MariaDBSpec, TlsSpec};
    use crate::mariadb_resources::*;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use std::net::IpAddr;

    fn create_test_mariadb(name: &str) -> MariaDB {
        let mut db = MariaDB::new(
            name,
            MariaDBSpec {
                secret: Some("osp-secret".to_string()),
                storage_class: Some("local-storage".to_string()),
                storage_request: "500M".to_string(),
                container_image: "example.com/mariadb:latest".to_string(),
                adoption_redirect: None,
                tls: None,
            },
        );
        db.metadata.namespace = Some("openstack".to_string());
        db.metadata.uid = Some("1234-5678".to_string());
        db
    }

    fn with_redirect(mut db: MariaDB, host: &str) -> MariaDB {
        db.spec.adoption_redirect = Some(AdoptionRedirectSpec {
            host: Some(host.to_string()),
        });
        db
    }

    #[test]
    fn test_object_names() {
        let db = create_test_mariadb("openstack");
        assert_eq!(mariadb_object_name(&db), "mariadb-openstack");
        assert_eq!(pvc_name(&db), "mysql-db-openstack");
        assert_eq!(db_init_job_name(&db), "openstack-db-init");
        assert_eq!(service_name(&db), "openstack");
    }

    #[test]
    fn test_build_labels() {
        let labels = build_labels("openstack");
        assert_eq!(labels.get("app"), Some(&"mariadb".to_string()));
        assert_eq!(labels.get("cr"), Some(&"mariadb-openstack".to_string()));
        assert_eq!(labels.get("owner"), Some(&"mariadb-operator".to_string()));
        assert_eq!(
            labels.get("app.kubernetes.io/instance"),
            Some(&"openstack".to_string())
        );

        let selector = build_selector_labels("openstack");
        assert_eq!(selector.len(), 2);
        assert!(selector.iter().all(|(k, v)| labels.get(k) == Some(v)));
    }

    #[test]
    fn test_owner_reference_is_controller() {
        let db = create_test_mariadb("openstack");
        let refs = build_owner_references(&db);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, "MariaDB");
        assert_eq!(refs[0].api_version, "mariadb.openstack.org/v1beta1");
        assert_eq!(refs[0].uid, "1234-5678");
        assert_eq!(refs[0].controller, Some(true));
        assert_eq!(refs[0].block_owner_deletion, Some(true));
    }

    #[test]
    fn test_build_pvc() {
        let db = create_test_mariadb("openstack");
        let pvc = build_pvc(&db, Quantity("500M".to_string()));

        assert_eq!(pvc.metadata.name.as_deref(), Some("mysql-db-openstack"));
        assert_eq!(pvc.metadata.namespace.as_deref(), Some("openstack"));
        let spec = pvc.spec.unwrap();
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteOnce".to_string()]));
        assert_eq!(spec.storage_class_name.as_deref(), Some("local-storage"));
        let requests = spec.resources.unwrap().requests.unwrap();
        assert_eq!(requests.get("storage"), Some(&Quantity("500M".to_string())));
    }

    #[test]
    fn test_pvc_without_storage_class_uses_cluster_default() {
        let mut db = create_test_mariadb("openstack");
        db.spec.storage_class = None;
        let pvc = build_pvc(&db, Quantity("1Gi".to_string()));
        assert!(pvc.spec.unwrap().storage_class_name.is_none());
    }

    // ========================================================================
    // Service target resolution
    // ========================================================================

    #[test]
    fn test_service_target_defaults_to_pod() {
        let db = create_test_mariadb("openstack");
        assert_eq!(service_target(&db), ServiceTarget::Pod);

        let blank = with_redirect(create_test_mariadb("openstack"), "  ");
        assert_eq!(service_target(&blank), ServiceTarget::Pod);
    }

    #[test]
    fn test_service_target_hostname_and_ip() {
        let by_name = with_redirect(create_test_mariadb("openstack"), "db.example.com");
        assert_eq!(
            service_target(&by_name),
            ServiceTarget::ExternalName("db.example.com".to_string())
        );

        let by_ip = with_redirect(create_test_mariadb("openstack"), "192.168.122.10");
        assert_eq!(
            service_target(&by_ip),
            ServiceTarget::ExternalIp("192.168.122.10".parse::<IpAddr>().unwrap())
        );

        let by_ipv6 = with_redirect(create_test_mariadb("openstack"), "fd00::10");
        assert!(matches!(service_target(&by_ipv6), ServiceTarget::ExternalIp(_)));
    }

    #[test]
    fn test_build_service_selects_pod() {
        let db = create_test_mariadb("openstack");
        let svc = build_service(&db);
        let spec = svc.spec.unwrap();

        assert_eq!(svc.metadata.name.as_deref(), Some("openstack"));
        assert_eq!(spec.selector, Some(build_selector_labels("openstack")));
        assert_eq!(spec.ports.unwrap()[0].port, 3306);
        assert!(build_endpoints(&db).is_none());
    }

    #[test]
    fn test_build_service_external_name() {
        let db = with_redirect(create_test_mariadb("openstack"), "db.example.com");
        let spec = build_service(&db).spec.unwrap();

        assert_eq!(spec.type_.as_deref(), Some("ExternalName"));
        assert_eq!(spec.external_name.as_deref(), Some("db.example.com"));
        assert!(spec.selector.is_none());
        assert!(build_endpoints(&db).is_none());
    }

    #[test]
    fn test_build_service_and_endpoints_for_ip() {
        let db = with_redirect(create_test_mariadb("openstack"), "10.0.0.5");
        let spec = build_service(&db).spec.unwrap();
        assert!(spec.selector.is_none(), "IP redirect must not select pods");

        let endpoints = build_endpoints(&db).expect("endpoints for IP redirect");
        assert_eq!(endpoints.metadata.name.as_deref(), Some("openstack"));
        let subset = &endpoints.subsets.unwrap()[0];
        assert_eq!(subset.addresses.as_ref().unwrap()[0].ip, "10.0.0.5");
        assert_eq!(subset.ports.as_ref().unwrap()[0].port, 3306);
    }

    // ========================================================================
    // Volumes, job and pod
    // ========================================================================

    #[test]
    fn test_volumes_without_tls() {
        let db = create_test_mariadb("openstack");
        let volumes = build_volumes(&db);
        let names: Vec<_> = volumes.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["kolla-config", "config-data", "operator-scripts", "mysql-db"]
        );
        assert_eq!(build_volume_mounts(&db).len(), volumes.len());
    }

    #[test]
    fn test_volumes_with_tls_and_ca() {
        let mut db = create_test_mariadb("openstack");
        db.spec.tls = Some(TlsSpec {
            secret_name: Some("cert-svc".to_string()),
            ca_secret_name: Some("ca-bundle".to_string()),
        });

        let volumes = build_volumes(&db);
        let tls = volumes.iter().find(|v| v.name == "secret-tls").unwrap();
        assert_eq!(
            tls.secret.as_ref().unwrap().secret_name.as_deref(),
            Some("cert-svc")
        );
        assert!(volumes.iter().any(|v| v.name == "ca-bundle"));

        let mounts = build_volume_mounts(&db);
        assert!(mounts.iter().any(|m| m.mount_path == TLS_CERT_PATH));
        assert!(mounts.iter().any(|m| m.mount_path == TLS_CA_PATH));
    }

    #[test]
    fn test_build_db_init_job() {
        let db = create_test_mariadb("openstack");
        let job = build_db_init_job(&db, "example.com/mariadb:latest", "osp-secret");

        assert_eq!(job.metadata.name.as_deref(), Some("openstack-db-init"));
        let pod_spec = job.spec.unwrap().template.spec.unwrap();
        assert_eq!(pod_spec.restart_policy.as_deref(), Some("OnFailure"));
        assert_eq!(
            pod_spec.service_account_name.as_deref(),
            Some("mariadb-openstack")
        );

        let container = &pod_spec.containers[0];
        let env = container.env.as_ref().unwrap();
        let root = env.iter().find(|e| e.name == "DB_ROOT_PASSWORD").unwrap();
        let key_ref = root
            .value_from
            .as_ref()
            .unwrap()
            .secret_key_ref
            .as_ref()
            .unwrap();
        assert_eq!(key_ref.name, "osp-secret");
        assert_eq!(key_ref.key, "DbRootPassword");
        assert!(env
            .iter()
            .any(|e| e.name == "DB_MAX_TIMEOUT" && e.value.as_deref() == Some("60")));
    }

    #[test]
    fn test_build_pod_carries_image_and_config_hash() {
        let db = create_test_mariadb("openstack");
        let pod = build_pod(&db, "example.com/mariadb:2", "abc123");

        assert_eq!(pod.metadata.name.as_deref(), Some("mariadb-openstack"));
        let spec = pod.spec.unwrap();
        assert_eq!(spec.service_account_name.as_deref(), Some("mariadb-openstack"));

        let container = &spec.containers[0];
        assert_eq!(container.name, "mariadb");
        assert_eq!(container.image.as_deref(), Some("example.com/mariadb:2"));
        let env = container.env.as_ref().unwrap();
        assert!(env
            .iter()
            .any(|e| e.name == "KOLLA_CONFIG_STRATEGY" && e.value.as_deref() == Some("COPY_ALWAYS")));
        assert!(env
            .iter()
            .any(|e| e.name == "CONFIG_HASH" && e.value.as_deref() == Some("abc123")));
    }

    #[test]
    fn test_builders_are_deterministic() {
        let db = create_test_mariadb("openstack");
        assert_eq!(
            build_pod(&db, "img", "hash"),
            build_pod(&db, "img", "hash")
        );
        assert_eq!(build_service(&db), build_service(&db));
        assert_eq!(
            build_db_init_job(&db, "img", "osp-secret"),
            build_db_init_job(&db, "img", "osp-secret")
        );
    }

    // ========================================================================
    // RBAC
    // ========================================================================

    #[test]
    fn test_policy_rules() {
        let rules = build_policy_rules();
        assert_eq!(rules.len(), 2);

        assert_eq!(
            rules[0].resource_names,
            Some(vec!["anyuid".to_string()])
        );
        assert_eq!(rules[0].verbs, vec!["use".to_string()]);

        assert_eq!(rules[1].resources, Some(vec!["pods".to_string()]));
        assert_eq!(rules[1].verbs.len(), 7);
        assert!(rules[1].verbs.contains(&"delete".to_string()));
    }

    #[test]
    fn test_role_binding_links_service_account() {
        let db = create_test_mariadb("openstack");
        let binding = build_role_binding(&db);

        assert_eq!(binding.role_ref.kind, "Role");
        assert_eq!(binding.role_ref.name, "mariadb-openstack");
        let subject = &binding.subjects.unwrap()[0];
        assert_eq!(subject.kind, "ServiceAccount");
        assert_eq!(subject.name, build_service_account(&db).metadata.name.unwrap());
        assert_eq!(subject.namespace.as_deref(), Some("openstack"));
        assert_eq!(
            build_role(&db).metadata.name.as_deref(),
            Some("mariadb-openstack")
        );
    }
}
