use clap::Parser;
use krar::cluster::MockClusterClient;
use krar::config::{Cli, resolve};
use krar::target::{ControllerRef, discover};

#[tokio::test]
async fn label_discovery_and_explicit_targets_are_unioned_and_deduplicated() {
    let cli = Cli::parse_from([
        "krar",
        "--resources",
        "deployments",
        "--label-domain",
        "example.com",
        "--label-name",
        "policy",
        "--label-value",
        "nightly",
        "--namespaces-all",
        "--targets",
        "prod/Deployment/checkout,prod/Deployment/checkout",
    ]);
    let config = resolve(&cli).expect("valid config");

    let mut mock = MockClusterClient::new();
    mock.expect_list_by_label()
        .withf(|kind, _scope, selector| kind == "deployments" && selector == "example.com/policy=nightly")
        .returning(|_, _, _| {
            Ok(vec![ControllerRef {
                namespace: "prod".into(),
                kind: "deployments".into(),
                name: "web".into(),
            }])
        });

    let targets = discover(&config, &mock).await.unwrap();
    assert_eq!(targets.len(), 2);
    assert!(targets.iter().any(|t| t.name == "web"));
    assert!(targets.iter().any(|t| t.name == "checkout"));
}

#[tokio::test]
async fn malformed_explicit_target_is_skipped_not_fatal() {
    let cli = Cli::parse_from(["krar", "--namespaces-all", "--targets", "bad-target,prod/Deployment/web"]);
    let config = resolve(&cli).expect("valid config");

    let mock = MockClusterClient::new();
    let targets = discover(&config, &mock).await.unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].name, "web");
}

#[tokio::test]
async fn empty_target_set_discovers_nothing_without_error() {
    let cli = Cli::parse_from(["krar", "--namespaces-all", "--targets", "prod/Deployment/web"]);
    let mut config = resolve(&cli).expect("valid config");
    config.explicit_targets.clear();

    let mock = MockClusterClient::new();
    let targets = discover(&config, &mock).await.unwrap();
    assert!(targets.is_empty());
}
