//! Remote action gateway.
//!
//! The [`Gateway`] trait is the only path to the network for game logic.
//! [`HttpGateway`] speaks the messenger/compute unit HTTP API; tests plug
//! in scripted implementations.

mod error;
mod event;
mod http;
mod message;
mod signer;

pub use error::{GatewayError, GatewayErrorKind};
pub use event::{RemoteEvent, StatePayload};
pub use http::HttpGateway;
pub use message::{
    clean_error_output, Action, ActionResult, Cursor, ProcessId, QueryResult, ResultEdge,
    ResultNode, ResultsPage, ResultsQuery, SortOrder, SpawnRequest, Tag, TaggedMessage,
};
pub use signer::{BridgeSigner, DataItemDraft, SignedDataItem, Signer};

/// Sends actions to remote processes and reads their results.
///
/// Implementations never retry. `submit` returns the process's error output
/// alongside its messages; callers must surface it (see
/// [`ActionResult::check`]).
#[async_trait::async_trait]
pub trait Gateway: Send + Sync + std::fmt::Debug {
    /// Signs and sends an action, then waits for its correlated result.
    async fn submit(
        &self,
        process: &ProcessId,
        action: &Action,
        signer: &dyn Signer,
    ) -> Result<ActionResult, GatewayError>;

    /// Evaluates an action read-only, without a signature.
    async fn query(&self, process: &ProcessId, action: &Action) -> Result<QueryResult, GatewayError>;

    /// Reads a page of the process's result log.
    async fn results(
        &self,
        process: &ProcessId,
        query: &ResultsQuery,
    ) -> Result<ResultsPage, GatewayError>;

    /// Spawns a new process and returns its address.
    async fn spawn(
        &self,
        request: &SpawnRequest,
        signer: &dyn Signer,
    ) -> Result<ProcessId, GatewayError>;

    /// Looks up a process previously spawned by `owner` under `name`.
    async fn find_process(
        &self,
        name: &str,
        modules: &[String],
        owner: &str,
    ) -> Result<Option<ProcessId>, GatewayError>;
}
