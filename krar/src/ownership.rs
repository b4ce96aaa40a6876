//! §4.4 Ownership Resolver — collapses a pod's immediate owner reference to
//! the top-level controller a human would recognize from a manifest.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::cluster::{ClusterClient, OwnerRef};
use crate::target::ControllerRef;
use crate::util::log;

/// The intermediate kind this resolver collapses exactly one hop through.
const INTERMEDIATE_KIND: &str = "ReplicaSet";

/// Resolves pod owner references to canonical controllers, memoizing the
/// one-hop lookups it performs keyed by `(namespace, name)`.
pub struct OwnershipResolver<'a> {
    cluster: &'a dyn ClusterClient,
    cache: Mutex<HashMap<(String, String), Option<OwnerRef>>>,
}

impl<'a> OwnershipResolver<'a> {
    pub fn new(cluster: &'a dyn ClusterClient) -> Self {
        Self {
            cluster,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves `(namespace, owner_kind, owner_name)` from a pod's controller
    /// owner reference. Only `ReplicaSet` is collapsed one hop; every other
    /// kind, and any failed or missing intermediate lookup, passes through
    /// unchanged.
    pub async fn resolve(&self, namespace: &str, owner_kind: &str, owner_name: &str) -> ControllerRef {
        let identity = ControllerRef {
            namespace: namespace.to_string(),
            kind: owner_kind.to_string(),
            name: owner_name.to_string(),
        };

        if owner_kind != INTERMEDIATE_KIND {
            return identity;
        }

        let key = (namespace.to_string(), owner_name.to_string());
        let cached = self.cache.lock().unwrap().get(&key).cloned();
        let hop = match cached {
            Some(hop) => hop,
            None => {
                let fetched = match self.cluster.get_owner(namespace, owner_kind, owner_name).await {
                    Ok(owner) => owner,
                    Err(source) => {
                        log::warn(format!(
                            "could not resolve owner of {namespace}/{owner_kind}/{owner_name}: {source}"
                        ));
                        None
                    }
                };
                self.cache.lock().unwrap().insert(key, fetched.clone());
                fetched
            }
        };

        match hop {
            Some(owner) => ControllerRef {
                namespace: namespace.to_string(),
                kind: owner.kind,
                name: owner.name,
            },
            None => identity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MockClusterClient;

    #[tokio::test]
    async fn non_replicaset_owners_pass_through_unchanged() {
        let mock = MockClusterClient::new();
        let resolver = OwnershipResolver::new(&mock);
        let resolved = resolver.resolve("ns", "StatefulSet", "db").await;
        assert_eq!(resolved.kind, "StatefulSet");
        assert_eq!(resolved.name, "db");
    }

    #[tokio::test]
    async fn replicaset_owner_collapses_to_its_controller() {
        let mut mock = MockClusterClient::new();
        mock.expect_get_owner()
            .withf(|ns, kind, name| ns == "ns" && kind == "ReplicaSet" && name == "web-abc123")
            .times(1)
            .returning(|_, _, _| {
                Ok(Some(OwnerRef {
                    kind: "Deployment".into(),
                    name: "web".into(),
                    controller: true,
                }))
            });

        let resolver = OwnershipResolver::new(&mock);
        let resolved = resolver.resolve("ns", "ReplicaSet", "web-abc123").await;
        assert_eq!(resolved.kind, "Deployment");
        assert_eq!(resolved.name, "web");
    }

    #[tokio::test]
    async fn missing_intermediate_owner_leaves_input_unchanged() {
        let mut mock = MockClusterClient::new();
        mock.expect_get_owner().times(1).returning(|_, _, _| Ok(None));

        let resolver = OwnershipResolver::new(&mock);
        let resolved = resolver.resolve("ns", "ReplicaSet", "orphan-xyz").await;
        assert_eq!(resolved.kind, "ReplicaSet");
        assert_eq!(resolved.name, "orphan-xyz");
    }

    #[tokio::test]
    async fn intermediate_lookups_are_memoized() {
        let mut mock = MockClusterClient::new();
        mock.expect_get_owner().times(1).returning(|_, _, _| {
            Ok(Some(OwnerRef {
                kind: "Deployment".into(),
                name: "web".into(),
                controller: true,
            }))
        });

        let resolver = OwnershipResolver::new(&mock);
        let _ = resolver.resolve("ns", "ReplicaSet", "web-abc123").await;
        let _ = resolver.resolve("ns", "ReplicaSet", "web-abc123").await;
    }
}
