//! Runtime manifest and contract source.

use super::{ProvisioningError, ProvisioningErrorKind};
use crate::config::ClientConfig;
use derive_getters::Getters;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Runtime version used when the manifest is unavailable.
pub const DEFAULT_AOS_VERSION: &str = "1.10.22";

/// Runtime module used when the manifest is unavailable.
pub const DEFAULT_AOS_MODULE: &str = "SBNb1qPQ1TDwpD_mboxm2YllmMLXpWw4U8P9Ff8W9vk";

/// Older runtime modules still accepted when looking up existing processes.
pub const LEGACY_AOS_MODULES: [&str; 2] = [
    "1SafZGlZT4TLI8xoc0QEQ4MylHhuyQUblxD8xLKvEKI",
    "9afQ1PLf2mrshqCTZEzzJTR2gWaC9zNPnYgYEqg1Pt4",
];

/// Runtime version and module to spawn.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Manifest {
    /// Runtime version, sent as `aos-Version`.
    version: String,
    /// Runtime module id.
    module: String,
}

impl Manifest {
    /// Creates a manifest.
    pub fn new(version: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            module: module.into(),
        }
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new(DEFAULT_AOS_VERSION, DEFAULT_AOS_MODULE)
    }
}

#[derive(Debug, Deserialize)]
struct PackageJson {
    version: Option<String>,
    aos: Option<AosSection>,
}

#[derive(Debug, Deserialize)]
struct AosSection {
    module: Option<String>,
}

impl From<PackageJson> for Manifest {
    fn from(pkg: PackageJson) -> Self {
        let defaults = Manifest::default();
        Manifest {
            version: pkg.version.unwrap_or(defaults.version),
            module: pkg.aos.and_then(|a| a.module).unwrap_or(defaults.module),
        }
    }
}

/// Source of the files game creation needs.
#[async_trait::async_trait]
pub trait Artifacts: Send + Sync + std::fmt::Debug {
    /// Current runtime manifest. Never fails; falls back to defaults.
    async fn manifest(&self) -> Manifest;

    /// Game contract source code.
    async fn contract_source(&self) -> Result<String, ProvisioningError>;
}

/// Fetches artifacts over HTTP.
#[derive(Debug, Clone)]
pub struct HttpArtifacts {
    manifest_url: String,
    contract_url: String,
    client: reqwest::Client,
}

impl HttpArtifacts {
    /// Creates a fetcher from configuration.
    ///
    /// Fails when no contract source transaction is configured.
    pub fn new(config: &ClientConfig) -> Result<Self, ProvisioningError> {
        let txid = config.require("contract_src_txid")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(*config.request_timeout_ms()))
            .build()
            .map_err(|e| ProvisioningError::new(ProvisioningErrorKind::Artifact(e.to_string())))?;
        Ok(Self {
            manifest_url: config.manifest_url().clone(),
            contract_url: format!("{}/{}", config.arweave_url().trim_end_matches('/'), txid),
            client,
        })
    }

    async fn fetch_manifest(&self) -> Result<Manifest, reqwest::Error> {
        let pkg: PackageJson = self
            .client
            .get(&self.manifest_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(pkg.into())
    }
}

#[async_trait::async_trait]
impl Artifacts for HttpArtifacts {
    #[instrument(skip(self), fields(url = %self.manifest_url))]
    async fn manifest(&self) -> Manifest {
        match self.fetch_manifest().await {
            Ok(manifest) => {
                debug!(version = %manifest.version, module = %manifest.module, "Resolved runtime manifest");
                manifest
            }
            Err(e) => {
                warn!(error = %e, "Manifest unavailable, using defaults");
                Manifest::default()
            }
        }
    }

    #[instrument(skip(self), fields(url = %self.contract_url))]
    async fn contract_source(&self) -> Result<String, ProvisioningError> {
        let fetch = async {
            self.client
                .get(&self.contract_url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
        };
        let source = fetch
            .await
            .map_err(|e: reqwest::Error| ProvisioningError::new(ProvisioningErrorKind::Artifact(e.to_string())))?;
        debug!(bytes = source.len(), "Fetched contract source");
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_fills_missing_fields() {
        let pkg: PackageJson = serde_json::from_str(r#"{"version":"2.0.1"}"#).unwrap();
        let manifest = Manifest::from(pkg);
        assert_eq!(manifest.version(), "2.0.1");
        assert_eq!(manifest.module(), DEFAULT_AOS_MODULE);
    }

    #[test]
    fn test_manifest_reads_module() {
        let pkg: PackageJson =
            serde_json::from_str(r#"{"version":"2.0.1","aos":{"module":"mod-1"}}"#).unwrap();
        assert_eq!(Manifest::from(pkg), Manifest::new("2.0.1", "mod-1"));
    }

    #[test]
    fn test_http_artifacts_require_contract_txid() {
        assert!(HttpArtifacts::new(&ClientConfig::default()).is_err());
    }
}
