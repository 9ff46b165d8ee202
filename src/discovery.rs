//! Game discovery through the router process.

use crate::gateway::{Action, Gateway, GatewayError, ProcessId, Signer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A game announced on the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameListing {
    /// Wallet that created the game.
    pub owner: String,
    /// Game name, unique on the router.
    pub name: String,
    /// Game process address.
    pub id: ProcessId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisteredResponse {
    is_registered: bool,
}

/// Client for the router process that maps game names to processes.
#[derive(Debug, Clone)]
pub struct Discovery {
    gateway: Arc<dyn Gateway>,
    router: ProcessId,
}

impl Discovery {
    /// Creates a client for `router`.
    pub fn new(gateway: Arc<dyn Gateway>, router: ProcessId) -> Self {
        Self { gateway, router }
    }

    /// Router process address.
    pub fn router(&self) -> &ProcessId {
        &self.router
    }

    /// Whether a game named `name` is already registered.
    #[instrument(skip(self), fields(router = %self.router))]
    pub async fn is_registered(&self, name: &str) -> Result<bool, GatewayError> {
        let action = Action::new("Is-Registered").with_tag("Game-Name", name);
        let result = self.gateway.query(&self.router, &action).await?;
        let response: RegisteredResponse = serde_json::from_str(result.first_data()?)?;
        debug!(registered = response.is_registered, "Checked game name");
        Ok(response.is_registered)
    }

    /// Lists every registered game.
    #[instrument(skip(self), fields(router = %self.router))]
    pub async fn list_games(&self) -> Result<Vec<GameListing>, GatewayError> {
        let result = self.gateway.query(&self.router, &Action::new("Get-Games")).await?;
        let games: Vec<GameListing> = serde_json::from_str(result.first_data()?)?;
        debug!(count = games.len(), "Listed games");
        Ok(games)
    }

    /// Announces `process` under `name`.
    #[instrument(skip(self, signer), fields(router = %self.router, process_id = %process))]
    pub async fn register(
        &self,
        process: &ProcessId,
        name: &str,
        signer: &dyn Signer,
    ) -> Result<(), GatewayError> {
        let action = Action::new("Register")
            .with_tag("Process-Id", process.as_str())
            .with_tag("Game-Name", name);
        self.gateway
            .submit(&self.router, &action, signer)
            .await?
            .check()?;
        info!(name, "Game registered on router");
        Ok(())
    }
}
