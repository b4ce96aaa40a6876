//! §4.1 Config Resolver — merges CLI flags and `KRAR_`-prefixed environment
//! variables into an immutable [`RunConfig`], then validates it.

use clap::Parser;

use crate::util::{Error, split_csv};

/// Ambient environment variable consulted only as the final fallback in the
/// label-value chain (e.g. injected by a Kubernetes CronJob's Downward API).
const AMBIENT_JOB_NAME_VAR: &str = "JOB_NAME";

/// Raw CLI surface. Every flag is shadowed by its `KRAR_`-prefixed environment
/// variable via clap's `env` feature; an explicitly-passed flag always wins.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Rollout policy enforcement and mutable-tag drift detection for Kubernetes controllers", long_about = None)]
pub struct Cli {
    /// Comma-separated controller kinds for label discovery (e.g. "deployments,statefulsets")
    #[arg(long = "resources", short = 'r', env = "KRAR_RESOURCES", default_value = "")]
    pub resources: String,

    /// Label prefix, e.g. "example.com"
    #[arg(long = "label-domain", short = 'd', env = "KRAR_LABEL_DOMAIN", default_value = "")]
    pub label_domain: String,

    /// Label key
    #[arg(long = "label-name", short = 'n', env = "KRAR_LABEL_NAME", default_value = "")]
    pub label_name: String,

    /// Label value (falls back to job-name, then ambient job-name)
    #[arg(long = "label-value", short = 'v', env = "KRAR_LABEL_VALUE", default_value = "")]
    pub label_value: String,

    /// Explicit "namespace/Kind/name" targets, comma-separated
    #[arg(long = "targets", short = 't', env = "KRAR_TARGETS", default_value = "")]
    pub targets: String,

    /// Discover across every namespace rather than an enumerated list
    #[arg(
        long = "namespaces-all",
        short = 'A',
        env = "KRAR_NAMESPACES_ALL",
        action = clap::ArgAction::SetTrue
    )]
    pub namespaces_all: bool,

    /// Negates `--namespaces-all`, regardless of argument order
    #[arg(long = "no-namespaces-all", action = clap::ArgAction::SetTrue, overrides_with = "namespaces_all")]
    pub no_namespaces_all: bool,

    /// Comma-separated namespaces; implies a scoped (non-cluster-wide) run
    #[arg(long = "namespaces", short = 'N', env = "KRAR_NAMESPACES", default_value = "")]
    pub namespaces: String,

    /// Enumerate what would happen; perform no mutating API calls
    #[arg(long = "dry-run", env = "KRAR_DRY_RUN", action = clap::ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Logical job name (second link in the label-value fallback chain)
    #[arg(long = "job-name", short = 'j', env = "KRAR_JOB_NAME", default_value = "")]
    pub job_name: String,

    /// `rollout` or `smart`
    #[arg(long = "mode", env = "KRAR_MODE", default_value = "rollout")]
    pub mode: String,

    /// Shorthand for `--mode smart`
    #[arg(long = "smart", action = clap::ArgAction::SetTrue)]
    pub smart: bool,

    /// Automatically restart drifted controllers in smart mode
    #[arg(long = "smart-restart", env = "KRAR_SMART_RESTART", action = clap::ArgAction::SetTrue)]
    pub smart_restart: bool,

    /// Path to a registry authfile (podman/skopeo format)
    #[arg(long = "registry-authfile", env = "KRAR_REGISTRY_AUTHFILE")]
    pub registry_authfile: Option<String>,

    /// Inline "user:pass" registry credentials
    #[arg(long = "registry-creds", env = "KRAR_REGISTRY_CREDS")]
    pub registry_creds: Option<String>,

    /// Path to a docker config directory containing config.json
    #[arg(long = "docker-config", env = "KRAR_DOCKER_CONFIG")]
    pub docker_config: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Rollout,
    Smart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceScope {
    All,
    Enumerated(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSelector {
    pub domain: String,
    pub name: String,
    pub value: String,
}

impl LabelSelector {
    /// `"{domain}/{name}={value}"`, the selector string passed opaquely to the
    /// cluster client.
    pub fn selector_string(&self) -> String {
        format!("{}/{}={}", self.domain, self.name, self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSpec {
    pub authfile: Option<String>,
    pub creds: Option<String>,
    pub docker_config: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: Mode,
    pub resource_kinds: Vec<String>,
    pub label: Option<LabelSelector>,
    pub explicit_targets: Vec<String>,
    pub namespace_scope: NamespaceScope,
    pub dry_run: bool,
    pub smart_restart: bool,
    pub credentials: CredentialSpec,
}

impl RunConfig {
    /// Label discovery is enabled only when the full triple resolved — an
    /// incomplete triple disables it (with a warning), it does not error by
    /// itself (§3 "Key derivations").
    pub fn label_discovery_enabled(&self) -> bool {
        self.label.is_some() && !self.resource_kinds.is_empty()
    }
}

/// Resolves and validates a [`Cli`] into an immutable [`RunConfig`].
pub fn resolve(cli: &Cli) -> Result<RunConfig, Error> {
    let mode = resolve_mode(cli)?;

    let resource_kinds = split_csv(&cli.resources);
    let explicit_targets = split_csv(&cli.targets);

    let label_value = resolve_label_value(cli);
    let label = resolve_label(cli, &label_value);

    let label_partially_configured =
        !cli.label_domain.is_empty() || !cli.label_name.is_empty() || !label_value.is_empty();
    if label.is_none() && label_partially_configured {
        crate::util::log::warn(
            "incomplete label triple (domain/name/value); label-based discovery disabled",
        );
    }

    if label.is_none() && resource_kinds.is_empty() && explicit_targets.is_empty() {
        return Err(Error::Config(
            "no target selection method configured: need a complete label triple with --resources, or --targets".into(),
        ));
    }

    let namespaces_all = cli.namespaces_all && !cli.no_namespaces_all;
    let namespaces = split_csv(&cli.namespaces);
    let namespace_scope = if !namespaces.is_empty() {
        NamespaceScope::Enumerated(namespaces)
    } else if namespaces_all {
        NamespaceScope::All
    } else {
        return Err(Error::Config(
            "namespace scope is not cluster-wide but --namespaces is empty".into(),
        ));
    };

    let credentials = CredentialSpec {
        authfile: cli.registry_authfile.clone().filter(|s| !s.is_empty()),
        creds: cli.registry_creds.clone().filter(|s| !s.is_empty()),
        docker_config: cli.docker_config.clone().filter(|s| !s.is_empty()),
    };

    Ok(RunConfig {
        mode,
        resource_kinds,
        label,
        explicit_targets,
        namespace_scope,
        dry_run: cli.dry_run,
        smart_restart: cli.smart_restart,
        credentials,
    })
}

fn resolve_mode(cli: &Cli) -> Result<Mode, Error> {
    if cli.smart {
        return Ok(Mode::Smart);
    }
    match cli.mode.as_str() {
        "rollout" => Ok(Mode::Rollout),
        "smart" => Ok(Mode::Smart),
        other => Err(Error::Config(format!(
            "invalid mode {other:?}: expected \"rollout\" or \"smart\""
        ))),
    }
}

/// Label-value fallback chain: explicit config > logical job name > ambient job name.
fn resolve_label_value(cli: &Cli) -> String {
    if !cli.label_value.is_empty() {
        return cli.label_value.clone();
    }
    if !cli.job_name.is_empty() {
        return cli.job_name.clone();
    }
    std::env::var(AMBIENT_JOB_NAME_VAR).unwrap_or_default()
}

fn resolve_label(cli: &Cli, label_value: &str) -> Option<LabelSelector> {
    if cli.label_domain.is_empty() || cli.label_name.is_empty() || label_value.is_empty() {
        return None;
    }
    Some(LabelSelector {
        domain: cli.label_domain.clone(),
        name: cli.label_name.clone(),
        value: label_value.to_string(),
    })
}
