//! §4.8 Orchestrator — the `Start → Configure → Discover → (Rollout | Smart)
//! → Done` state machine tying every other module together.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;

use crate::auth::RegistryAuth;
use crate::cluster::ClusterClient;
use crate::config::{Mode, RunConfig};
use crate::drift;
use crate::ownership::OwnershipResolver;
use crate::projection;
use crate::registry::RegistryClient;
use crate::rollout::{self, RestartOutcome};
use crate::target;
use crate::util::{Error, log};

/// What the run actually did, reported back to `main` for the closing summary
/// line (exit code is always 0 unless `run` itself errors — §4.8 "Termination").
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub targets_found: usize,
    pub drifted_images: usize,
    pub restarted: usize,
    pub dry_run: bool,
}

pub async fn run(
    config: &RunConfig,
    cluster: &dyn ClusterClient,
    registry: &dyn RegistryClient,
    auth: &RegistryAuth,
    cancel: &CancellationToken,
) -> Result<RunSummary, Error> {
    log::info("discovering targets");
    let targets = target::discover(config, cluster).await?;
    if targets.is_empty() {
        log::info("nothing to do: no targets matched");
        return Ok(RunSummary {
            dry_run: config.dry_run,
            ..Default::default()
        });
    }
    log::info(format!("discovered {} target(s)", targets.len()));

    match config.mode {
        Mode::Rollout => {
            let outcomes = rollout::restart_all(&targets, config, cluster).await;
            Ok(RunSummary {
                targets_found: targets.len(),
                restarted: count_restarted(&outcomes),
                drifted_images: 0,
                dry_run: config.dry_run,
            })
        }
        Mode::Smart => {
            run_smart(config, &targets, cluster, registry, auth, cancel).await
        }
    }
}

async fn run_smart(
    config: &RunConfig,
    targets: &[target::ControllerRef],
    cluster: &dyn ClusterClient,
    registry: &dyn RegistryClient,
    auth: &RegistryAuth,
    cancel: &CancellationToken,
) -> Result<RunSummary, Error> {
    let resolver = OwnershipResolver::new(cluster);
    let samples = projection::project(config, targets, cluster, &resolver).await?;
    if samples.is_empty() {
        log::info("nothing to do: no eligible pods found");
        return Ok(RunSummary {
            targets_found: targets.len(),
            dry_run: config.dry_run,
            ..Default::default()
        });
    }

    let drifted_images = drift::check(&samples, auth, registry, cancel).await;
    if drifted_images.is_empty() {
        log::info("no drift detected");
        return Ok(RunSummary {
            targets_found: targets.len(),
            dry_run: config.dry_run,
            ..Default::default()
        });
    }

    let candidates = restart_candidates(&samples, &drifted_images);
    log::info(format!(
        "{} controller(s) have drifted images",
        candidates.len()
    ));

    if !config.smart_restart {
        log::info("smart-restart disabled, reporting drift only");
        return Ok(RunSummary {
            targets_found: targets.len(),
            drifted_images: drifted_images.len(),
            restarted: 0,
            dry_run: config.dry_run,
        });
    }

    let outcomes = rollout::restart_all(&candidates, config, cluster).await;
    Ok(RunSummary {
        targets_found: targets.len(),
        drifted_images: drifted_images.len(),
        restarted: count_restarted(&outcomes),
        dry_run: config.dry_run,
    })
}

/// A controller is a candidate if *any* eligible container it owns uses a
/// drifted image reference (Open Question 2 resolution, §13).
fn restart_candidates(
    samples: &[projection::PodSample],
    drifted_images: &HashSet<String>,
) -> Vec<target::ControllerRef> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for sample in samples {
        if drifted_images.contains(&sample.image) && seen.insert(sample.owner.clone()) {
            candidates.push(sample.owner.clone());
        }
    }
    candidates
}

fn count_restarted(outcomes: &[(target::ControllerRef, RestartOutcome)]) -> usize {
    outcomes
        .iter()
        .filter(|(_, outcome)| *outcome == RestartOutcome::Restarted)
        .count()
}
