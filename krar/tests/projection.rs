use krar::cluster::{ContainerSpecRecord, ContainerStatusRecord, MockClusterClient, OwnerRef, PodRecord};
use krar::config::{CredentialSpec, Mode, NamespaceScope, RunConfig};
use krar::ownership::OwnershipResolver;
use krar::projection::project;
use krar::target::ControllerRef;

fn config() -> RunConfig {
    RunConfig {
        mode: Mode::Smart,
        resource_kinds: vec![],
        label: None,
        explicit_targets: vec!["ns/Deployment/web".into()],
        namespace_scope: NamespaceScope::Enumerated(vec!["ns".into()]),
        dry_run: false,
        smart_restart: false,
        credentials: CredentialSpec::default(),
    }
}

fn owner() -> OwnerRef {
    OwnerRef {
        kind: "Deployment".into(),
        name: "web".into(),
        controller: true,
    }
}

#[tokio::test]
async fn only_always_pull_policy_containers_are_retained() {
    let mut mock = MockClusterClient::new();
    mock.expect_list_pods().returning(|_| {
        Ok(vec![PodRecord {
            namespace: "ns".into(),
            owner: Some(owner()),
            containers: vec![
                ContainerSpecRecord {
                    name: "app".into(),
                    image: "repo/app:tag".into(),
                    pull_policy: None,
                },
                ContainerSpecRecord {
                    name: "sidecar".into(),
                    image: "repo/sidecar:tag".into(),
                    pull_policy: Some("IfNotPresent".into()),
                },
            ],
            container_statuses: vec![
                ContainerStatusRecord {
                    name: "app".into(),
                    image: "repo/app:tag".into(),
                    image_id: "repo@sha256:aaa".into(),
                },
                ContainerStatusRecord {
                    name: "sidecar".into(),
                    image: "repo/sidecar:tag".into(),
                    image_id: "repo@sha256:bbb".into(),
                },
            ],
        }])
    });

    let targets = vec![ControllerRef {
        namespace: "ns".into(),
        kind: "Deployment".into(),
        name: "web".into(),
    }];
    let config = config();
    let resolver = OwnershipResolver::new(&mock);

    let samples = project(&config, &targets, &mock, &resolver).await.unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].image, "repo/app:tag");
}

#[tokio::test]
async fn namespace_all_with_label_discovery_scans_every_namespace() {
    let mut mock = MockClusterClient::new();
    mock.expect_namespaces()
        .times(1)
        .returning(|| Ok(vec!["ns-a".into(), "ns-b".into()]));
    mock.expect_list_pods().returning(|_| Ok(vec![]));

    let targets = vec![ControllerRef {
        namespace: "ns-a".into(),
        kind: "Deployment".into(),
        name: "web".into(),
    }];
    let config = RunConfig {
        mode: Mode::Smart,
        resource_kinds: vec!["deployments".into()],
        label: Some(krar::config::LabelSelector {
            domain: "example.com".into(),
            name: "policy".into(),
            value: "nightly".into(),
        }),
        explicit_targets: vec![],
        namespace_scope: NamespaceScope::All,
        dry_run: false,
        smart_restart: false,
        credentials: CredentialSpec::default(),
    };
    let resolver = OwnershipResolver::new(&mock);

    let samples = project(&config, &targets, &mock, &resolver).await.unwrap();
    assert!(samples.is_empty());
}
