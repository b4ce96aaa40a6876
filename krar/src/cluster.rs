//! `ClusterClient` — the seam between the pipeline modules and the
//! Kubernetes API. `KubeClusterClient` is the real implementation, built on
//! `kube`'s dynamic API so that the opaque resource-kind strings flowing
//! through `RunConfig` never have to be matched against a fixed set of
//! compiled-in types.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Event, EventSource, Namespace, ObjectReference, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{MicroTime, Time};
use k8s_openapi::jiff::Timestamp;
use kube::api::{DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::core::ApiResource;
use kube::discovery::Discovery;
use kube::{Api, Client, ResourceExt};

use crate::config::NamespaceScope;
use crate::target::ControllerRef;
use crate::util::{Error, MANAGER_NAME, log};

pub const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";
pub const KRAR_RESTARTED_AT_ANNOTATION: &str = "krar.io/restartedAt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
    pub controller: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpecRecord {
    pub name: String,
    pub image: String,
    pub pull_policy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatusRecord {
    pub name: String,
    pub image: String,
    pub image_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRecord {
    pub namespace: String,
    pub owner: Option<OwnerRef>,
    pub containers: Vec<ContainerSpecRecord>,
    pub container_statuses: Vec<ContainerStatusRecord>,
}

/// The cluster-facing operations the pipeline needs, abstracted for testing
/// with `MockClusterClient`.
#[async_trait]
#[mockall::automock]
pub trait ClusterClient: Send + Sync {
    /// Lists resources of `kind` matching `selector`, scoped per `scope`.
    async fn list_by_label(
        &self,
        kind: &str,
        scope: &NamespaceScope,
        selector: &str,
    ) -> Result<Vec<ControllerRef>, Error>;

    /// Fetches `(namespace, kind, name)` and returns its own controller owner
    /// reference, if any (used for the one-hop ownership collapse of §4.4).
    async fn get_owner(
        &self,
        namespace: &str,
        kind: &str,
        name: &str,
    ) -> Result<Option<OwnerRef>, Error>;

    /// Lists every pod in `namespace` with its owning controller reference
    /// and container spec/status projection.
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodRecord>, Error>;

    /// All namespace names in the cluster (namespace-all discovery).
    async fn namespaces(&self) -> Result<Vec<String>, Error>;

    /// Bumps `target`'s pod-template restart annotations to `timestamp`.
    async fn patch_restart(&self, target: &ControllerRef, timestamp: &str) -> Result<(), Error>;

    /// Records an audit `Event` against `target`.
    async fn emit_event(&self, target: &ControllerRef, message: &str) -> Result<(), Error>;
}

/// Real `ClusterClient` backed by a live `kube::Client` and cluster API
/// discovery, so `kind` strings resolve to whatever the cluster actually
/// serves rather than a fixed compiled-in type list.
pub struct KubeClusterClient {
    client: Client,
    discovery: Discovery,
}

impl KubeClusterClient {
    pub async fn try_new(client: Client) -> Result<Self, Error> {
        let discovery = Discovery::new(client.clone())
            .run()
            .await
            .map_err(|source| Error::Capability(format!("API discovery failed: {source}")))?;
        Ok(Self { client, discovery })
    }

    fn resolve(&self, kind: &str) -> Result<ApiResource, Error> {
        let wanted = kind.to_lowercase();
        for group in self.discovery.groups() {
            for (ar, _caps) in group.recommended_resources() {
                if ar.plural.to_lowercase() == wanted || ar.kind.to_lowercase() == wanted {
                    return Ok(ar);
                }
            }
        }
        Err(Error::Capability(format!(
            "cluster does not serve a resource kind matching {kind:?}"
        )))
    }

    fn dynamic_api(&self, ar: &ApiResource, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, ar),
            None => Api::all_with(self.client.clone(), ar),
        }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn list_by_label(
        &self,
        kind: &str,
        scope: &NamespaceScope,
        selector: &str,
    ) -> Result<Vec<ControllerRef>, Error> {
        let ar = self.resolve(kind)?;
        let lp = ListParams::default().labels(selector);

        let namespaces: Vec<Option<String>> = match scope {
            NamespaceScope::All => vec![None],
            NamespaceScope::Enumerated(list) => list.iter().cloned().map(Some).collect(),
        };

        let mut out = Vec::new();
        for ns in namespaces {
            let api = self.dynamic_api(&ar, ns.as_deref());
            let list = api.list(&lp).await?;
            for obj in list.items {
                let namespace = obj.namespace().unwrap_or_default();
                let name = obj.name_any();
                out.push(ControllerRef {
                    namespace,
                    kind: kind.to_string(),
                    name,
                });
            }
        }
        Ok(out)
    }

    async fn get_owner(
        &self,
        namespace: &str,
        kind: &str,
        name: &str,
    ) -> Result<Option<OwnerRef>, Error> {
        let ar = self.resolve(kind)?;
        let api = self.dynamic_api(&ar, Some(namespace));
        let obj = match api.get_opt(name).await? {
            Some(obj) => obj,
            None => return Ok(None),
        };
        let owner = obj
            .owner_references()
            .iter()
            .find(|o| o.controller.unwrap_or(false))
            .map(|o| OwnerRef {
                kind: o.kind.clone(),
                name: o.name.clone(),
                controller: true,
            });
        Ok(owner)
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodRecord>, Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;

        let mut out = Vec::with_capacity(list.items.len());
        for pod in list.items {
            let owner = pod
                .owner_references()
                .iter()
                .find(|o| o.controller.unwrap_or(false))
                .map(|o| OwnerRef {
                    kind: o.kind.clone(),
                    name: o.name.clone(),
                    controller: true,
                });

            let containers = pod
                .spec
                .as_ref()
                .map(|spec| {
                    spec.containers
                        .iter()
                        .map(|c| ContainerSpecRecord {
                            name: c.name.clone(),
                            image: c.image.clone().unwrap_or_default(),
                            pull_policy: c.image_pull_policy.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default();

            let container_statuses = pod
                .status
                .as_ref()
                .map(|status| {
                    status
                        .container_statuses
                        .iter()
                        .flatten()
                        .map(|cs| ContainerStatusRecord {
                            name: cs.name.clone(),
                            image: cs.image.clone(),
                            image_id: cs.image_id.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default();

            out.push(PodRecord {
                namespace: namespace.to_string(),
                owner,
                containers,
                container_statuses,
            });
        }
        Ok(out)
    }

    async fn namespaces(&self) -> Result<Vec<String>, Error> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.into_iter().map(|ns| ns.name_any()).collect())
    }

    async fn patch_restart(&self, target: &ControllerRef, timestamp: &str) -> Result<(), Error> {
        let ar = self.resolve(&target.kind.to_lowercase())?;
        let api = self.dynamic_api(&ar, Some(&target.namespace));
        let patch = serde_json::json!({
            "spec": {
                "template": {
                    "metadata": {
                        "annotations": {
                            RESTARTED_AT_ANNOTATION: timestamp,
                            KRAR_RESTARTED_AT_ANNOTATION: timestamp,
                        }
                    }
                }
            }
        });
        api.patch(
            &target.name,
            &PatchParams::apply(MANAGER_NAME),
            &Patch::Merge(patch),
        )
        .await?;
        Ok(())
    }

    async fn emit_event(&self, target: &ControllerRef, message: &str) -> Result<(), Error> {
        let now = Timestamp::now();
        let event = Event {
            metadata: kube::api::ObjectMeta {
                generate_name: Some(format!("{}-", MANAGER_NAME)),
                namespace: Some(target.namespace.clone()),
                ..Default::default()
            },
            reason: Some("KrarRolloutTriggered".to_string()),
            type_: Some("Normal".to_string()),
            message: Some(message.to_string()),
            source: Some(EventSource {
                component: Some(MANAGER_NAME.to_string()),
                ..Default::default()
            }),
            involved_object: ObjectReference {
                kind: Some(target.kind.clone()),
                name: Some(target.name.clone()),
                namespace: Some(target.namespace.clone()),
                ..Default::default()
            },
            first_timestamp: Some(Time::from(now)),
            last_timestamp: Some(Time::from(now)),
            event_time: Some(MicroTime::from(now)),
            count: Some(1),
            ..Default::default()
        };

        let api: Api<Event> = Api::namespaced(self.client.clone(), &target.namespace);
        match api.create(&PostParams::default(), &event).await {
            Ok(_) => Ok(()),
            Err(source) => {
                log::warn(format!("failed to create audit event for {target}: {source}"));
                Ok(())
            }
        }
    }
}
