//! §4.2 Credential Selector — turns the credential fields of [`RunConfig`] into
//! a single [`RegistryAuth`] token. Does not touch the filesystem or network;
//! file and credential validity is the registry client's problem.

use crate::config::CredentialSpec;

/// Resolved registry credential, consumed opaquely by the registry client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryAuth {
    /// Path to an authfile (podman/skopeo `auth.json` layout).
    Authfile(String),
    /// Inline `user:pass`.
    Inline(String),
    /// Path to a directory containing a docker-style `config.json`.
    ConfigDir(String),
    /// No credentials configured; anonymous pulls only.
    Default,
}

/// Precedence (first non-empty wins): authfile, inline creds, config dir, default.
pub fn select(credentials: &CredentialSpec) -> RegistryAuth {
    if let Some(path) = &credentials.authfile {
        return RegistryAuth::Authfile(path.clone());
    }
    if let Some(creds) = &credentials.creds {
        return RegistryAuth::Inline(creds.clone());
    }
    if let Some(dir) = &credentials.docker_config {
        return RegistryAuth::ConfigDir(dir.clone());
    }
    RegistryAuth::Default
}
