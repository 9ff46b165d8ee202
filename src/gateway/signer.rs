//! Wallet signing seam.

use super::{GatewayError, ProcessId, Tag};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Unsigned message body handed to a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataItemDraft {
    /// Recipient process; absent for spawns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ProcessId>,
    /// All tags, including `Action` or spawn metadata.
    pub tags: Vec<Tag>,
    /// Message body.
    pub data: String,
}

/// A signed message ticket ready for the messenger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignedDataItem {
    /// Message id derived from the signature.
    pub id: String,
    /// Encoded, signed bytes.
    pub raw: Vec<u8>,
}

/// Produces signed message tickets on behalf of a wallet.
#[async_trait::async_trait]
pub trait Signer: Send + Sync + std::fmt::Debug {
    /// Wallet address the signatures belong to.
    fn address(&self) -> &str;

    /// Signs a draft.
    async fn sign(&self, draft: &DataItemDraft) -> Result<SignedDataItem, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct AddressResponse {
    address: String,
}

/// Signer backed by a local wallet bridge over HTTP.
///
/// The bridge exposes `GET /address` and `POST /sign`.
#[derive(Debug, Clone)]
pub struct BridgeSigner {
    base_url: String,
    address: String,
    client: reqwest::Client,
}

impl BridgeSigner {
    /// Connects to the bridge and reads the active wallet address.
    #[instrument(skip_all, fields(base_url = %base_url))]
    pub async fn connect(base_url: String, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let response: AddressResponse = client
            .get(format!("{}/address", base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        info!(address = %response.address, "Wallet connected");
        Ok(Self {
            base_url,
            address: response.address,
            client,
        })
    }
}

#[async_trait::async_trait]
impl Signer for BridgeSigner {
    fn address(&self) -> &str {
        &self.address
    }

    #[instrument(skip(self, draft), fields(target = ?draft.target))]
    async fn sign(&self, draft: &DataItemDraft) -> Result<SignedDataItem, GatewayError> {
        let signed: SignedDataItem = self
            .client
            .post(format!("{}/sign", self.base_url))
            .json(draft)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(id = %signed.id, bytes = signed.raw.len(), "Draft signed");
        Ok(signed)
    }
}
