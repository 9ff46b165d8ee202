//! Scripted gateway and signer shared by the integration tests.

#![allow(dead_code)]

use ao_tictactoe::{
    Action, ActionResult, DataItemDraft, Gateway, GatewayError, ProcessId, QueryResult,
    ResultEdge, ResultNode, ResultsPage, ResultsQuery, SignedDataItem, Signer, SpawnRequest, Tag,
    TaggedMessage,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Game process used throughout the tests.
pub const GAME: &str = "game-process";
/// Router process used throughout the tests.
pub const ROUTER: &str = "router-process";
/// Local wallet.
pub const ME: &str = "abc";
/// Human opponent.
pub const OPPONENT: &str = "xyz";

/// Builds a tagged message.
pub fn message(tags: &[(&str, &str)], data: &str) -> TaggedMessage {
    TaggedMessage::new(tags.iter().map(|(n, v)| Tag::new(*n, *v)).collect(), data)
}

/// Builds a result-log edge holding one message.
pub fn edge(cursor: &str, message: TaggedMessage) -> ResultEdge {
    ResultEdge {
        cursor: cursor.into(),
        node: ResultNode {
            messages: vec![message],
        },
    }
}

/// Builds a result-log page.
pub fn page(edges: Vec<ResultEdge>) -> ResultsPage {
    ResultsPage { edges }
}

/// Reply messages with no error output.
pub fn reply(messages: Vec<TaggedMessage>) -> ActionResult {
    ActionResult {
        messages,
        error_output: None,
        error: None,
    }
}

/// State body for a match between `ME` (X) and `OPPONENT` (O).
pub fn playing_state(board: &str, current: &str) -> String {
    format!(
        r#"{{"Board":{},"Players":{{"{}":"X","{}":"O"}},"CurrentPlayer":"{}","State":"PLAY"}}"#,
        board, ME, OPPONENT, current
    )
}

/// An empty board in wire form.
pub const EMPTY_BOARD: &str = "[null,null,null,null,null,null,null,null,null]";

/// A recorded signed action.
#[derive(Debug, Clone)]
pub struct Submitted {
    pub process: ProcessId,
    pub action: Action,
}

/// Gateway answering from scripts and recording every call.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    submits: Mutex<VecDeque<Result<ActionResult, GatewayError>>>,
    queries: Mutex<HashMap<String, VecDeque<String>>>,
    pages: Mutex<VecDeque<Result<ResultsPage, GatewayError>>>,
    existing: Mutex<Option<ProcessId>>,
    spawn_id: Mutex<Option<ProcessId>>,
    pub submitted: Mutex<Vec<Submitted>>,
    pub result_queries: Mutex<Vec<ResultsQuery>>,
    pub spawned: Mutex<Vec<SpawnRequest>>,
    pub lookups: Mutex<Vec<(String, Vec<String>, String)>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the outcome of the next `submit`.
    pub fn push_submit(&self, result: Result<ActionResult, GatewayError>) {
        self.submits.lock().unwrap().push_back(result);
    }

    /// Queues a query answer for `action`. The last answer repeats.
    pub fn push_query(&self, action: &str, data: impl Into<String>) {
        self.queries
            .lock()
            .unwrap()
            .entry(action.to_string())
            .or_default()
            .push_back(data.into());
    }

    /// Queues the next results page. An empty queue yields empty pages.
    pub fn push_page(&self, page: Result<ResultsPage, GatewayError>) {
        self.pages.lock().unwrap().push_back(page);
    }

    /// Makes `find_process` report an existing process.
    pub fn set_existing(&self, process: &str) {
        *self.existing.lock().unwrap() = Some(ProcessId::from(process));
    }

    /// Process id returned by `spawn`.
    pub fn set_spawn_id(&self, process: &str) {
        *self.spawn_id.lock().unwrap() = Some(ProcessId::from(process));
    }

    /// Names of all submitted actions, in order.
    pub fn submitted_actions(&self) -> Vec<String> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.action.name().to_string())
            .collect()
    }

    pub fn submit_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn results_count(&self) -> usize {
        self.result_queries.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Gateway for ScriptedGateway {
    async fn submit(
        &self,
        process: &ProcessId,
        action: &Action,
        _signer: &dyn Signer,
    ) -> Result<ActionResult, GatewayError> {
        self.submitted.lock().unwrap().push(Submitted {
            process: process.clone(),
            action: action.clone(),
        });
        self.submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ActionResult::default()))
    }

    async fn query(
        &self,
        _process: &ProcessId,
        action: &Action,
    ) -> Result<QueryResult, GatewayError> {
        let mut queries = self.queries.lock().unwrap();
        let Some(answers) = queries.get_mut(action.name()) else {
            return Err(GatewayError::remote_call(format!(
                "No scripted answer for {}",
                action.name()
            )));
        };
        let data = if answers.len() > 1 {
            answers.pop_front().unwrap()
        } else {
            answers.front().cloned().unwrap_or_default()
        };
        Ok(QueryResult {
            messages: vec![TaggedMessage::new(Vec::new(), data)],
        })
    }

    async fn results(
        &self,
        _process: &ProcessId,
        query: &ResultsQuery,
    ) -> Result<ResultsPage, GatewayError> {
        self.result_queries.lock().unwrap().push(query.clone());
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ResultsPage::default()))
    }

    async fn spawn(
        &self,
        request: &SpawnRequest,
        _signer: &dyn Signer,
    ) -> Result<ProcessId, GatewayError> {
        self.spawned.lock().unwrap().push(request.clone());
        self.spawn_id
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| GatewayError::remote_call("Spawn failed"))
    }

    async fn find_process(
        &self,
        name: &str,
        modules: &[String],
        owner: &str,
    ) -> Result<Option<ProcessId>, GatewayError> {
        self.lookups
            .lock()
            .unwrap()
            .push((name.to_string(), modules.to_vec(), owner.to_string()));
        Ok(self.existing.lock().unwrap().clone())
    }
}

/// Signer that never touches a wallet.
#[derive(Debug)]
pub struct TestSigner {
    address: String,
}

impl TestSigner {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Signer for TestSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(&self, _draft: &DataItemDraft) -> Result<SignedDataItem, GatewayError> {
        Ok(SignedDataItem {
            id: "signed".to_string(),
            raw: Vec::new(),
        })
    }
}
