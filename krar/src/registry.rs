//! `RegistryClient` — resolves the registry-side digest for an image
//! reference. `OciRegistryClient` is the real implementation, built on
//! `oci-distribution`, with the docker/podman config-json credential formats
//! the Credential Selector can hand it.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use oci_distribution::client::ClientConfig;
use oci_distribution::secrets::RegistryAuth as OciAuth;
use oci_distribution::{Client, Reference};

use crate::auth::RegistryAuth;
use crate::util::{Error, log};

const MAX_ATTEMPTS: u32 = 3;

/// The registry-facing operation the Drift Checker needs, abstracted for
/// testing with `MockRegistryClient`.
#[async_trait]
#[mockall::automock]
pub trait RegistryClient: Send + Sync {
    /// Resolves the manifest digest for `image` (including tag). `Ok(None)`
    /// means the lookup failed after retries and should be treated as "skip,
    /// do not classify as drift" by the caller (§4.6).
    async fn remote_digest(&self, image: &str, auth: &RegistryAuth) -> Result<Option<String>, Error>;
}

pub struct OciRegistryClient {
    /// `fetch_manifest_digest` takes `&mut self` (the client caches auth
    /// tokens internally); the async mutex lets `RegistryClient::remote_digest`
    /// stay `&self` so concurrent lookups (§5) can share one client.
    client: tokio::sync::Mutex<Client>,
}

impl Default for OciRegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OciRegistryClient {
    pub fn new() -> Self {
        Self {
            client: tokio::sync::Mutex::new(Client::new(ClientConfig::default())),
        }
    }
}

#[async_trait]
impl RegistryClient for OciRegistryClient {
    async fn remote_digest(&self, image: &str, auth: &RegistryAuth) -> Result<Option<String>, Error> {
        let reference: Reference = image
            .parse()
            .map_err(|e| Error::Registry(format!("invalid image reference {image:?}: {e}")))?;
        let oci_auth = resolve_oci_auth(auth, reference.registry())?;

        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            let result = {
                let mut client = self.client.lock().await;
                client.fetch_manifest_digest(&reference, &oci_auth).await
            };
            match result {
                Ok(digest) => return Ok(Some(digest)),
                Err(source) => {
                    last_err = Some(source);
                    if attempt < MAX_ATTEMPTS {
                        let backoff = std::time::Duration::from_millis(200 * 2u64.pow(attempt - 1));
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }
        log::warn(format!(
            "registry lookup for {image:?} failed after {MAX_ATTEMPTS} attempts: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        ));
        Ok(None)
    }
}

/// Startup capability check (§12.3): verifies the configured credentials are
/// at least structurally constructible before smart mode commits to them.
pub fn capability_check(auth: &RegistryAuth) -> Result<(), Error> {
    match auth {
        RegistryAuth::Authfile(path) => {
            read_docker_config(Path::new(path))?;
            Ok(())
        }
        RegistryAuth::ConfigDir(dir) => {
            read_docker_config(&Path::new(dir).join("config.json"))?;
            Ok(())
        }
        RegistryAuth::Inline(creds) => {
            if creds.split_once(':').is_some() {
                Ok(())
            } else {
                Err(Error::Capability(
                    "inline registry credentials must be \"user:pass\"".into(),
                ))
            }
        }
        RegistryAuth::Default => Ok(()),
    }
}

fn resolve_oci_auth(auth: &RegistryAuth, registry_host: &str) -> Result<OciAuth, Error> {
    match auth {
        RegistryAuth::Default => Ok(OciAuth::Anonymous),
        RegistryAuth::Inline(creds) => {
            let (user, pass) = creds.split_once(':').ok_or_else(|| {
                Error::Capability("inline registry credentials must be \"user:pass\"".into())
            })?;
            Ok(OciAuth::Basic(user.to_string(), pass.to_string()))
        }
        RegistryAuth::Authfile(path) => {
            lookup_in_docker_config(Path::new(path), registry_host)
        }
        RegistryAuth::ConfigDir(dir) => {
            lookup_in_docker_config(&Path::new(dir).join("config.json"), registry_host)
        }
    }
}

#[derive(serde::Deserialize)]
struct DockerConfig {
    #[serde(default)]
    auths: HashMap<String, DockerConfigAuthEntry>,
}

#[derive(serde::Deserialize)]
struct DockerConfigAuthEntry {
    #[serde(default)]
    auth: String,
}

fn read_docker_config(path: &Path) -> Result<DockerConfig, Error> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Looks up `registry_host`'s entry in a docker/podman `config.json`/`auth.json`,
/// decoding its base64 `"user:pass"` value.
fn lookup_in_docker_config(path: &Path, registry_host: &str) -> Result<OciAuth, Error> {
    let config = read_docker_config(path)?;
    let entry = config
        .auths
        .get(registry_host)
        .or_else(|| config.auths.get("https://index.docker.io/v1/").filter(|_| registry_host == "docker.io"));

    let Some(entry) = entry else {
        return Ok(OciAuth::Anonymous);
    };

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(entry.auth.trim())
        .map_err(|e| Error::Registry(format!("malformed auth entry for {registry_host}: {e}")))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|e| Error::Registry(format!("non-utf8 auth entry for {registry_host}: {e}")))?;
    let (user, pass) = decoded
        .split_once(':')
        .ok_or_else(|| Error::Registry(format!("malformed auth entry for {registry_host}")))?;
    Ok(OciAuth::Basic(user.to_string(), pass.to_string()))
}
