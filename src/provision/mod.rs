//! Game creation.
//!
//! Creating a game checks the name on the router, finds or spawns a
//! process for the owner, loads the game contract into it and announces it
//! on the router. Loading and announcing are retried with a fixed delay;
//! the name check is not.

mod artifacts;
mod error;
mod retry;

pub use artifacts::{
    Artifacts, HttpArtifacts, Manifest, DEFAULT_AOS_MODULE, DEFAULT_AOS_VERSION,
    LEGACY_AOS_MODULES,
};
pub use error::{ProvisioningError, ProvisioningErrorKind};
pub use retry::{Exhausted, RetryPolicy};

use crate::config::ClientConfig;
use crate::discovery::Discovery;
use crate::gateway::{Action, Gateway, ProcessId, Signer, SpawnRequest, Tag};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Data sent with a freshly spawned process.
const SPAWN_DATA: &str = "1984";

/// Creates game processes and registers them for discovery.
#[derive(Debug, Clone)]
pub struct Provisioner {
    gateway: Arc<dyn Gateway>,
    discovery: Discovery,
    artifacts: Arc<dyn Artifacts>,
    scheduler: String,
    policy: RetryPolicy,
}

impl Provisioner {
    /// Creates a provisioner.
    ///
    /// Fails when no router process is configured.
    pub fn new(
        gateway: Arc<dyn Gateway>,
        artifacts: Arc<dyn Artifacts>,
        config: &ClientConfig,
    ) -> Result<Self, ProvisioningError> {
        let router = ProcessId::new(config.require("router_process")?);
        Ok(Self {
            discovery: Discovery::new(Arc::clone(&gateway), router),
            gateway,
            artifacts,
            scheduler: config.scheduler().clone(),
            policy: RetryPolicy::new(*config.provision_attempts(), config.provision_backoff()),
        })
    }

    /// Creates a game named `name` owned by the signer's wallet.
    ///
    /// A process the owner already spawned under this name is reused.
    #[instrument(skip(self, signer), fields(owner = signer.address()))]
    pub async fn create_game(
        &self,
        name: &str,
        signer: &dyn Signer,
    ) -> Result<ProcessId, ProvisioningError> {
        if self.discovery.is_registered(name).await? {
            return Err(ProvisioningError::new(ProvisioningErrorKind::NameTaken(
                name.to_string(),
            )));
        }

        let manifest = self.artifacts.manifest().await;
        let modules: Vec<String> = std::iter::once(manifest.module().clone())
            .chain(LEGACY_AOS_MODULES.iter().map(|m| m.to_string()))
            .collect();
        let process = match self
            .gateway
            .find_process(name, &modules, signer.address())
            .await?
        {
            Some(existing) => {
                info!(process_id = %existing, "Reusing existing process");
                existing
            }
            None => self.spawn(name, &manifest, signer).await?,
        };

        self.load_contract(&process, signer).await?;
        self.announce(&process, name, signer).await?;
        info!(process_id = %process, "Game created");
        Ok(process)
    }

    async fn spawn(
        &self,
        name: &str,
        manifest: &Manifest,
        signer: &dyn Signer,
    ) -> Result<ProcessId, ProvisioningError> {
        let request = SpawnRequest {
            module: manifest.module().clone(),
            scheduler: self.scheduler.clone(),
            tags: vec![
                Tag::new("App-Name", "aos"),
                Tag::new("Name", name),
                Tag::new("aos-Version", manifest.version().as_str()),
            ],
            data: SPAWN_DATA.to_string(),
        };
        let process = self.gateway.spawn(&request, signer).await?;
        info!(process_id = %process, version = %manifest.version(), "Spawned process");
        Ok(process)
    }

    #[instrument(skip(self, signer), fields(process_id = %process))]
    async fn load_contract(
        &self,
        process: &ProcessId,
        signer: &dyn Signer,
    ) -> Result<(), ProvisioningError> {
        let gateway = self.gateway.as_ref();
        let artifacts = self.artifacts.as_ref();
        self.policy
            .run("Load contract", || async move {
                let source = artifacts.contract_source().await?;
                debug!(bytes = source.len(), "Evaluating contract source");
                gateway
                    .submit(process, &Action::new("Eval").with_data(source), signer)
                    .await?
                    .check_evaluated()?;
                Ok::<_, ProvisioningError>(())
            })
            .await
            .map_err(|e| exhausted("Load contract", e))
    }

    #[instrument(skip(self, signer), fields(process_id = %process))]
    async fn announce(
        &self,
        process: &ProcessId,
        name: &str,
        signer: &dyn Signer,
    ) -> Result<(), ProvisioningError> {
        let discovery = &self.discovery;
        self.policy
            .run("Register game", || async move {
                discovery.register(process, name, signer).await
            })
            .await
            .map_err(|e| exhausted("Register game", e))
    }
}

#[track_caller]
fn exhausted<E: std::fmt::Display>(step: &'static str, e: Exhausted<E>) -> ProvisioningError {
    ProvisioningError::new(ProvisioningErrorKind::RetriesExhausted {
        step,
        attempts: e.attempts,
        last: e.last.to_string(),
    })
}
