//! §4.6 Drift Checker — compares local `imageID` digests against the
//! registry-side digest for each unique image reference.

use std::collections::{HashMap, HashSet};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::auth::RegistryAuth;
use crate::projection::PodSample;
use crate::registry::RegistryClient;
use crate::util::log;

/// Registry lookups run with this much fan-out (§5 concurrency model).
const CONCURRENCY: usize = 8;

/// Extracts and canonicalizes the local digest from a container's `imageID`
/// (the substring after `@`, with the `sha256:` prefix normalized so the
/// result is always exactly `sha256:<hex>`). Returns `None` for an empty
/// digest.
fn normalize_local_digest(image_id: &str) -> Option<String> {
    let raw = image_id.rsplit('@').next().unwrap_or("");
    if raw.is_empty() {
        return None;
    }
    let hex = raw.strip_prefix("sha256:").unwrap_or(raw);
    Some(format!("sha256:{hex}"))
}

/// Checks unique `(image, local digest)` pairs against the registry, returning
/// the set of image references with confirmed drift.
pub async fn check(
    samples: &[PodSample],
    auth: &RegistryAuth,
    registry: &dyn RegistryClient,
    cancel: &CancellationToken,
) -> HashSet<String> {
    let mut pairs: HashMap<String, HashSet<String>> = HashMap::new();
    for sample in samples {
        match normalize_local_digest(&sample.image_id) {
            Some(digest) => {
                pairs.entry(sample.image.clone()).or_default().insert(digest);
            }
            None => log::warn(format!(
                "empty local digest for image {:?}, skipping",
                sample.image
            )),
        }
    }

    let drifted: HashSet<String> = futures::stream::iter(pairs.into_iter())
        .map(|(image, local_digests)| {
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return None;
                }
                tokio::select! {
                    _ = cancel.cancelled() => None,
                    result = registry.remote_digest(&image, auth) => {
                        classify(&image, &local_digests, result)
                    }
                }
            }
        })
        .buffer_unordered(CONCURRENCY)
        .filter_map(|drifted_image| async move { drifted_image })
        .collect()
        .await;

    drifted
}

/// Flags `image` as drifted if the registry digest differs from *any* of the
/// distinct local digests seen for it — one occurrence drifting is enough
/// (Open Question 3, §13).
fn classify(
    image: &str,
    local_digests: &HashSet<String>,
    result: Result<Option<String>, crate::util::Error>,
) -> Option<String> {
    match result {
        Ok(Some(remote_digest)) if !remote_digest.is_empty() => {
            if local_digests.iter().any(|local| local != &remote_digest) {
                Some(image.to_string())
            } else {
                None
            }
        }
        Ok(_) => {
            log::warn(format!(
                "registry returned no digest for {image:?}, skipping"
            ));
            None
        }
        Err(source) => {
            log::warn(format!("registry lookup for {image:?} failed: {source}"));
            None
        }
    }
}
