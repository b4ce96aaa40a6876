use krar::auth::select;
use krar::config::CredentialSpec;
use krar::drift::check;
use krar::projection::PodSample;
use krar::registry::MockRegistryClient;
use krar::target::ControllerRef;
use tokio_util::sync::CancellationToken;

fn sample(image: &str, image_id: &str) -> PodSample {
    PodSample {
        owner: ControllerRef {
            namespace: "ns".into(),
            kind: "Deployment".into(),
            name: "web".into(),
        },
        image: image.into(),
        image_id: image_id.into(),
    }
}

#[tokio::test]
async fn credential_selection_flows_through_to_the_registry_call() {
    let creds = CredentialSpec {
        authfile: None,
        creds: Some("alice:s3cret".into()),
        docker_config: None,
    };
    let auth = select(&creds);

    let mut mock = MockRegistryClient::new();
    mock.expect_remote_digest()
        .withf(move |_, used_auth| used_auth == &auth)
        .returning(|_, _| Ok(Some("sha256:aaa".into())));

    let samples = vec![sample("repo/img:tag", "repo@sha256:aaa")];
    let result = check(&samples, &select(&creds), &mock, &CancellationToken::new()).await;
    assert!(result.is_empty());
}

#[tokio::test]
async fn cancellation_token_stops_outstanding_lookups() {
    let mut mock = MockRegistryClient::new();
    mock.expect_remote_digest().returning(|_, _| Ok(Some("sha256:zzz".into())));

    let samples = vec![sample("repo/img:tag", "repo@sha256:aaa")];
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = check(&samples, &krar::auth::RegistryAuth::Default, &mock, &cancel).await;
    assert!(result.is_empty());
}
