//! §4.5 Pod Projection & Pull-Policy Normalization — turns raw pod records
//! into the `(owner, image, imageID)` samples the Drift Checker consumes.

use std::collections::HashSet;

use crate::cluster::ClusterClient;
use crate::config::{NamespaceScope, RunConfig};
use crate::ownership::OwnershipResolver;
use crate::target::ControllerRef;
use crate::util::Error;

/// One retained container occurrence: a resolved owner plus the image
/// reference and `imageID` of the container that is running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSample {
    pub owner: ControllerRef,
    pub image: String,
    pub image_id: String,
}

/// Empty, absent, or null `imagePullPolicy` is treated as `Always` — cluster
/// API defaulting already does this for `:latest`, and only `Always`
/// guarantees a fresh pull on restart (§4.5).
fn effective_pull_policy(policy: Option<&str>) -> bool {
    match policy {
        None => true,
        Some("") => true,
        Some("Always") => true,
        Some(_) => false,
    }
}

/// Projects pods across the relevant namespaces into retained `PodSample`s:
/// owner resolved in the target set, effective pull policy `Always`.
pub async fn project(
    config: &RunConfig,
    targets: &[ControllerRef],
    cluster: &dyn ClusterClient,
    resolver: &OwnershipResolver<'_>,
) -> Result<Vec<PodSample>, Error> {
    let target_set: HashSet<&ControllerRef> = targets.iter().collect();
    let namespaces = namespaces_to_scan(config, targets, cluster).await?;

    let mut samples = Vec::new();
    for namespace in namespaces {
        let pods = cluster.list_pods(&namespace).await?;
        for pod in pods {
            let Some(owner) = &pod.owner else { continue };
            let resolved = resolver.resolve(&pod.namespace, &owner.kind, &owner.name).await;
            if !target_set.contains(&resolved) {
                continue;
            }

            for status in &pod.container_statuses {
                let policy = pod
                    .containers
                    .iter()
                    .find(|c| c.name == status.name)
                    .and_then(|c| c.pull_policy.as_deref());
                if !effective_pull_policy(policy) {
                    continue;
                }
                samples.push(PodSample {
                    owner: resolved.clone(),
                    image: status.image.clone(),
                    image_id: status.image_id.clone(),
                });
            }
        }
    }
    Ok(samples)
}

async fn namespaces_to_scan(
    config: &RunConfig,
    targets: &[ControllerRef],
    cluster: &dyn ClusterClient,
) -> Result<Vec<String>, Error> {
    if matches!(config.namespace_scope, NamespaceScope::All) && config.label_discovery_enabled() {
        return cluster.namespaces().await;
    }
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for target in targets {
        if seen.insert(target.namespace.clone()) {
            out.push(target.namespace.clone());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_policy_is_always() {
        assert!(effective_pull_policy(None));
        assert!(effective_pull_policy(Some("")));
    }

    #[test]
    fn explicit_always_is_always() {
        assert!(effective_pull_policy(Some("Always")));
    }

    #[test]
    fn other_explicit_values_are_ineligible() {
        assert!(!effective_pull_policy(Some("IfNotPresent")));
        assert!(!effective_pull_policy(Some("Never")));
    }
}
