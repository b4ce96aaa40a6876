//! §4.7 Rollout Executor — triggers a pod-template restart for a controller
//! and records an audit `Event`, or in dry-run enumerates the same without
//! mutating anything.

use chrono::SecondsFormat;

use crate::cluster::ClusterClient;
use crate::config::RunConfig;
use crate::target::ControllerRef;
use crate::util::log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    Restarted,
    DryRun,
    Failed,
}

/// Restarts every target in order, dry-run or for real, per `config`.
pub async fn restart_all(
    targets: &[ControllerRef],
    config: &RunConfig,
    cluster: &dyn ClusterClient,
) -> Vec<(ControllerRef, RestartOutcome)> {
    let timestamp = chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut outcomes = Vec::with_capacity(targets.len());

    for target in targets {
        if config.dry_run {
            log::info(format!("[dry-run] would restart {target}"));
            outcomes.push((target.clone(), RestartOutcome::DryRun));
            continue;
        }

        match cluster.patch_restart(target, &timestamp).await {
            Ok(()) => {
                log::info(format!("restarted {target}"));
                let message = audit_message(config);
                if let Err(source) = cluster.emit_event(target, &message).await {
                    log::warn(format!("failed to record audit event for {target}: {source}"));
                }
                outcomes.push((target.clone(), RestartOutcome::Restarted));
            }
            Err(source) => {
                log::warn(format!("failed to restart {target}: {source}"));
                outcomes.push((target.clone(), RestartOutcome::Failed));
            }
        }
    }

    outcomes
}

fn audit_message(config: &RunConfig) -> String {
    format!(
        "mode={:?} smart_restart={} dry_run={}",
        config.mode, config.smart_restart, config.dry_run
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MockClusterClient;
    use crate::config::{CredentialSpec, Mode, NamespaceScope};

    fn config(dry_run: bool) -> RunConfig {
        RunConfig {
            mode: Mode::Rollout,
            resource_kinds: vec![],
            label: None,
            explicit_targets: vec![],
            namespace_scope: NamespaceScope::All,
            dry_run,
            smart_restart: false,
            credentials: CredentialSpec::default(),
        }
    }

    fn target() -> ControllerRef {
        ControllerRef {
            namespace: "ns".into(),
            kind: "Deployment".into(),
            name: "web".into(),
        }
    }

    #[tokio::test]
    async fn dry_run_performs_no_api_calls() {
        let mut mock = MockClusterClient::new();
        mock.expect_patch_restart().times(0);
        mock.expect_emit_event().times(0);

        let outcomes = restart_all(&[target()], &config(true), &mock).await;
        assert_eq!(outcomes[0].1, RestartOutcome::DryRun);
    }

    #[tokio::test]
    async fn successful_restart_emits_audit_event() {
        let mut mock = MockClusterClient::new();
        mock.expect_patch_restart().times(1).returning(|_, _| Ok(()));
        mock.expect_emit_event().times(1).returning(|_, _| Ok(()));

        let outcomes = restart_all(&[target()], &config(false), &mock).await;
        assert_eq!(outcomes[0].1, RestartOutcome::Restarted);
    }

    #[tokio::test]
    async fn patch_failure_is_recorded_but_not_fatal() {
        let mut mock = MockClusterClient::new();
        mock.expect_patch_restart()
            .times(1)
            .returning(|_, _| Err(crate::util::Error::Registry("boom".into())));
        mock.expect_emit_event().times(0);

        let outcomes = restart_all(&[target()], &config(false), &mock).await;
        assert_eq!(outcomes[0].1, RestartOutcome::Failed);
    }
}
