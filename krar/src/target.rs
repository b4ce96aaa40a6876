//! §4.3 Target Discoverer — resolves `RunConfig` into a deduplicated set of
//! [`ControllerRef`]s via label-based discovery and/or explicit targets.

use std::collections::HashSet;

use crate::cluster::ClusterClient;
use crate::config::RunConfig;
use crate::util::log;

/// A controller identified by namespace, kind, and name — the unit the rest of
/// the pipeline reasons about. `kind` is passed through opaquely as a
/// cluster-API collection name (e.g. `"deployments"`), never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControllerRef {
    pub namespace: String,
    pub kind: String,
    pub name: String,
}

impl std::fmt::Display for ControllerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.kind, self.name)
    }
}

/// Discovers the target set per §4.3: label-based discovery unioned with
/// explicit targets, deduplicated by `(namespace, kind, name)`.
pub async fn discover(
    config: &RunConfig,
    cluster: &dyn ClusterClient,
) -> Result<Vec<ControllerRef>, crate::util::Error> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    if let Some(label) = &config.label {
        if !config.resource_kinds.is_empty() {
            let selector = label.selector_string();
            for kind in &config.resource_kinds {
                let found = cluster
                    .list_by_label(kind, &config.namespace_scope, &selector)
                    .await?;
                for ctrl in found {
                    if seen.insert(ctrl.clone()) {
                        targets.push(ctrl);
                    }
                }
            }
        }
    }

    for raw in &config.explicit_targets {
        match parse_explicit_target(raw) {
            Some(ctrl) => {
                if seen.insert(ctrl.clone()) {
                    targets.push(ctrl);
                }
            }
            None => log::warn(format!("malformed explicit target {raw:?}, skipping")),
        }
    }

    Ok(targets)
}

/// Parses `"namespace/Kind/name"`. Returns `None` on malformed input rather
/// than erroring — a bad target is skipped, never fatal (§4.3).
fn parse_explicit_target(raw: &str) -> Option<ControllerRef> {
    let parts: Vec<&str> = raw.split('/').collect();
    let [namespace, kind, name] = parts[..] else {
        return None;
    };
    let (namespace, kind, name) = (namespace.trim(), kind.trim(), name.trim());
    if namespace.is_empty() || kind.is_empty() || name.is_empty() {
        return None;
    }
    Some(ControllerRef {
        namespace: namespace.to_string(),
        kind: kind.to_string(),
        name: name.to_string(),
    })
}
