use clap::Parser;
use tokio_util::sync::CancellationToken;

use krar::cluster::KubeClusterClient;
use krar::config::{Cli, Mode, resolve};
use krar::registry::{OciRegistryClient, capability_check};
use krar::util::{Error, log};
use krar::{auth, orchestrator};

#[tokio::main]
async fn main() {
    krar_common::init();

    let cli = Cli::parse();
    let run_config = resolve(&cli).unwrap_or_else(|err| exit_on(&err));

    let registry_auth = auth::select(&run_config.credentials);
    if run_config.mode == Mode::Smart {
        if let Err(err) = capability_check(&registry_auth) {
            exit_on(&err);
        }
    }

    let client = match kube::Client::try_default().await {
        Ok(client) => client,
        Err(source) => exit_on(&Error::Capability(format!("no usable kubeconfig or cluster API unreachable: {source}"))),
    };
    let cluster = match KubeClusterClient::try_new(client).await {
        Ok(cluster) => cluster,
        Err(err) => exit_on(&err),
    };
    let registry_client = OciRegistryClient::new();
    let cancel = CancellationToken::new();

    tokio::select! {
        result = orchestrator::run(&run_config, &cluster, &registry_client, &registry_auth, &cancel) => {
            match result {
                Ok(summary) => {
                    log::info(format!(
                        "done: {} target(s), {} restarted, {} drifted image(s){}",
                        summary.targets_found,
                        summary.restarted,
                        summary.drifted_images,
                        if summary.dry_run { " (dry-run)" } else { "" }
                    ));
                }
                Err(err) => exit_on(&err),
            }
        }
        _ = krar_common::shutdown::shutdown_signal() => {
            log::warn("shutting down, cancelling outstanding work");
            cancel.cancel();
        }
    }
}

/// Logs a fatal error and exits with the code its §7 taxonomy class demands
/// (non-zero only for `Config`/`Capability` errors, per §4.8 "Termination").
fn exit_on(err: &Error) -> ! {
    log::error(err);
    std::process::exit(if err.is_fatal() { 1 } else { 0 });
}
