//! Gateway over the messenger and compute unit HTTP APIs.

use super::{
    Action, ActionResult, DataItemDraft, Gateway, GatewayError, ProcessId, QueryResult,
    ResultsPage, ResultsQuery, Signer, SpawnRequest, Tag, TaggedMessage,
};
use crate::config::ClientConfig;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const SDK_TAG: &str = "ao_tictactoe";
const ANCHOR: &str = "0";
// Dry-runs are unsigned; the compute unit only needs placeholder ids.
const DRY_RUN_ID: &str = "1234";

#[derive(Debug, Deserialize)]
struct MessengerResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ComputeResult {
    #[serde(rename = "Messages", default)]
    messages: Vec<TaggedMessage>,
    #[serde(rename = "Output", default)]
    output: serde_json::Value,
    #[serde(rename = "Error", default)]
    error: Option<String>,
}

impl ComputeResult {
    /// Error text, from `Error` or the evaluation's `Output.data.output`.
    fn error_output(&self) -> Option<String> {
        if let Some(error) = self.error.as_ref().filter(|e| !e.trim().is_empty()) {
            return Some(error.clone());
        }
        self.output
            .pointer("/data/output")
            .and_then(|o| o.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    transactions: GraphQlConnection,
}

#[derive(Debug, Deserialize)]
struct GraphQlConnection {
    edges: Vec<GraphQlEdge>,
}

#[derive(Debug, Deserialize)]
struct GraphQlEdge {
    node: GraphQlNode,
}

#[derive(Debug, Deserialize)]
struct GraphQlNode {
    id: String,
}

const FIND_PROCESS_QUERY: &str = "query ($owners: [String!], $tags: [TagFilter!]) { \
    transactions(owners: $owners, tags: $tags, first: 1) { edges { node { id } } } }";

/// HTTP gateway.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    messenger_url: String,
    compute_url: String,
    graphql_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    /// Creates a gateway from client configuration.
    #[instrument(skip(config), fields(compute_url = %config.compute_url()))]
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(*config.request_timeout_ms()))
            .build()?;
        info!("Creating HTTP gateway");
        Ok(Self {
            messenger_url: config.messenger_url().clone(),
            compute_url: config.compute_url().clone(),
            graphql_url: config.graphql_url().clone(),
            client,
        })
    }

    fn protocol_tags(kind: &str) -> Vec<Tag> {
        vec![
            Tag::new("Data-Protocol", "ao"),
            Tag::new("Variant", "ao.TN.1"),
            Tag::new("Type", kind),
            Tag::new("SDK", SDK_TAG),
        ]
    }

    /// Posts a signed item to the messenger, returning the item id it assigned.
    async fn deliver(&self, draft: &DataItemDraft, signer: &dyn Signer) -> Result<String, GatewayError> {
        let signed = signer.sign(draft).await?;
        let response: MessengerResponse = self
            .client
            .post(format!("{}/", self.messenger_url))
            .header("Content-Type", "application/octet-stream")
            .header("Accept", "application/json")
            .body(signed.raw)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(id = %response.id, "Messenger accepted item");
        Ok(response.id)
    }
}

#[async_trait::async_trait]
impl Gateway for HttpGateway {
    #[instrument(skip(self, signer), fields(process_id = %process, action = %action.name()))]
    async fn submit(
        &self,
        process: &ProcessId,
        action: &Action,
        signer: &dyn Signer,
    ) -> Result<ActionResult, GatewayError> {
        let mut tags = Self::protocol_tags("Message");
        tags.extend(action.wire_tags());
        let draft = DataItemDraft {
            target: Some(process.clone()),
            tags,
            data: action.data().unwrap_or(DRY_RUN_ID).to_string(),
        };
        let message_id = self.deliver(&draft, signer).await?;

        let result: ComputeResult = self
            .client
            .get(format!("{}/result/{}", self.compute_url, message_id))
            .query(&[("process-id", process.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let error_output = result.error_output();
        if error_output.is_some() {
            warn!(message_id = %message_id, "Action produced error output");
        }
        info!(message_id = %message_id, messages = result.messages.len(), "Action evaluated");
        let error = result.error.filter(|e| !e.trim().is_empty());
        Ok(ActionResult {
            messages: result.messages,
            error_output,
            error,
        })
    }

    #[instrument(skip(self), fields(process_id = %process, action = %action.name()))]
    async fn query(&self, process: &ProcessId, action: &Action) -> Result<QueryResult, GatewayError> {
        let body = serde_json::json!({
            "Id": DRY_RUN_ID,
            "Target": process.as_str(),
            "Owner": DRY_RUN_ID,
            "Anchor": ANCHOR,
            "Data": action.data().unwrap_or(DRY_RUN_ID),
            "Tags": Self::protocol_tags("Message")
                .into_iter()
                .chain(action.wire_tags())
                .collect::<Vec<_>>(),
        });

        let result: ComputeResult = self
            .client
            .post(format!("{}/dry-run", self.compute_url))
            .query(&[("process-id", process.as_str())])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = result.error_output() {
            return Err(GatewayError::rejection(super::clean_error_output(&error)));
        }
        debug!(messages = result.messages.len(), "Dry-run complete");
        Ok(QueryResult {
            messages: result.messages,
        })
    }

    #[instrument(skip(self), fields(process_id = %process, cursor = ?query.from))]
    async fn results(
        &self,
        process: &ProcessId,
        query: &ResultsQuery,
    ) -> Result<ResultsPage, GatewayError> {
        let mut params = vec![
            ("sort", query.sort.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(cursor) = &query.from {
            params.push(("from", cursor.to_string()));
        }

        let page: ResultsPage = self
            .client
            .get(format!("{}/results/{}", self.compute_url, process))
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(edges = page.edges.len(), "Fetched result page");
        Ok(page)
    }

    #[instrument(skip(self, request, signer), fields(module = %request.module))]
    async fn spawn(
        &self,
        request: &SpawnRequest,
        signer: &dyn Signer,
    ) -> Result<ProcessId, GatewayError> {
        let mut tags = Self::protocol_tags("Process");
        tags.push(Tag::new("Module", request.module.clone()));
        tags.push(Tag::new("Scheduler", request.scheduler.clone()));
        tags.extend(request.tags.iter().cloned());
        let draft = DataItemDraft {
            target: None,
            tags,
            data: request.data.clone(),
        };
        let id = self.deliver(&draft, signer).await?;
        info!(process_id = %id, "Process spawned");
        Ok(ProcessId::new(id))
    }

    #[instrument(skip(self, modules))]
    async fn find_process(
        &self,
        name: &str,
        modules: &[String],
        owner: &str,
    ) -> Result<Option<ProcessId>, GatewayError> {
        let body = serde_json::json!({
            "query": FIND_PROCESS_QUERY,
            "variables": {
                "owners": [owner],
                "tags": [
                    { "name": "App-Name", "values": ["aos"] },
                    { "name": "Data-Protocol", "values": ["ao"] },
                    { "name": "Type", "values": ["Process"] },
                    { "name": "Module", "values": modules },
                    { "name": "Name", "values": [name] },
                ],
            },
        });

        let response: GraphQlResponse = self
            .client
            .post(&self.graphql_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let found = response
            .data
            .and_then(|d| d.transactions.edges.into_iter().next())
            .map(|edge| ProcessId::new(edge.node.id));
        debug!(found = ?found, "Process lookup complete");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compute(json: &str) -> ComputeResult {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_error_output_from_nested_output() {
        let result = compute(r#"{"Messages": [], "Output": {"data": {"output": "Not your turn"}}}"#);
        assert_eq!(result.error_output().as_deref(), Some("Not your turn"));
    }

    #[test]
    fn test_error_field_wins() {
        let result = compute(r#"{"Messages": [], "Output": "", "Error": "boom"}"#);
        assert_eq!(result.error_output().as_deref(), Some("boom"));
    }

    #[test]
    fn test_plain_output_is_not_an_error() {
        let result = compute(r#"{"Messages": [], "Output": {"data": "New message"}}"#);
        assert_eq!(result.error_output(), None);
    }

    #[test]
    fn test_no_error_output() {
        let result = compute(r#"{"Messages": [{"Tags": [{"name": "Action", "value": "Draw"}], "Data": ""}]}"#);
        assert_eq!(result.error_output(), None);
        assert_eq!(result.messages.len(), 1);
    }
}
