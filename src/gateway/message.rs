//! Tagged messages exchanged with remote processes.

use super::GatewayError;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Address of a remote process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(String);

impl ProcessId {
    /// Wraps a process address.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProcessId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Pagination token into a process's result log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Cursor {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// A named string attribute on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name.
    pub name: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Creates a tag.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A message produced by a remote process.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaggedMessage {
    /// Message tags.
    #[serde(rename = "Tags", default)]
    pub tags: Vec<Tag>,
    /// Message body, usually JSON.
    #[serde(rename = "Data", default, deserialize_with = "data_as_string")]
    pub data: String,
    /// Recipient, when the process addressed one.
    #[serde(rename = "Target", default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl TaggedMessage {
    /// Creates a message from tags and data.
    pub fn new(tags: Vec<Tag>, data: impl Into<String>) -> Self {
        Self {
            tags,
            data: data.into(),
            target: None,
        }
    }

    /// Value of the first tag named `name`.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }

    /// First value found among several alternative tag names.
    pub fn tag_any(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.tag(name))
    }

    /// Whether any tag carries `value`, regardless of its name.
    pub fn has_value(&self, value: &str) -> bool {
        self.tags.iter().any(|t| t.value == value)
    }

    /// The `Action` discriminator.
    pub fn action(&self) -> Option<&str> {
        self.tag("Action")
    }
}

// Data is sometimes an already-decoded JSON value rather than a string.
fn data_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// An outgoing action: the `Action` tag plus parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    name: String,
    tags: Vec<Tag>,
    data: Option<String>,
}

impl Action {
    /// Creates an action with the given `Action` tag value.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            data: None,
        }
    }

    /// Adds a parameter tag.
    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }

    /// Attaches a message body.
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// The `Action` tag value.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter tags, without the `Action` tag.
    pub fn params(&self) -> &[Tag] {
        &self.tags
    }

    /// Message body.
    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// All tags as sent on the wire, `Action` first.
    pub fn wire_tags(&self) -> Vec<Tag> {
        std::iter::once(Tag::new("Action", self.name.clone()))
            .chain(self.tags.iter().cloned())
            .collect()
    }
}

/// Result of a signed action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionResult {
    /// Messages the process emitted while handling the action.
    pub messages: Vec<TaggedMessage>,
    /// Raw error output, if the process printed any.
    pub error_output: Option<String>,
    /// The compute unit's `Error` field, set when evaluation itself failed.
    pub error: Option<String>,
}

impl ActionResult {
    /// Cleaned rejection text, if the process produced error output.
    pub fn rejection(&self) -> Option<String> {
        self.error_output
            .as_deref()
            .map(clean_error_output)
            .filter(|s| !s.is_empty())
    }

    /// Fails with a rejection when the process produced error output.
    #[track_caller]
    pub fn check(&self) -> Result<(), GatewayError> {
        match self.rejection() {
            Some(message) => Err(GatewayError::rejection(message)),
            None => Ok(()),
        }
    }

    /// Fails only when evaluation itself failed.
    ///
    /// Printed output is ignored, so this suits actions like `Eval` whose
    /// normal result is output.
    #[track_caller]
    pub fn check_evaluated(&self) -> Result<(), GatewayError> {
        match self
            .error
            .as_deref()
            .map(clean_error_output)
            .filter(|s| !s.is_empty())
        {
            Some(message) => Err(GatewayError::rejection(message)),
            None => Ok(()),
        }
    }

    /// The first emitted message, which carries the reply discriminator.
    pub fn reply(&self) -> Option<&TaggedMessage> {
        self.messages.first()
    }
}

/// Result of a read-only query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryResult {
    /// Messages the process would emit.
    pub messages: Vec<TaggedMessage>,
}

impl QueryResult {
    /// Body of the first message, which carries the answer.
    #[track_caller]
    pub fn first_data(&self) -> Result<&str, GatewayError> {
        self.messages
            .first()
            .map(|m| m.data.as_str())
            .ok_or_else(|| GatewayError::remote_call("Query returned no messages"))
    }
}

/// Sort order for result-log pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum SortOrder {
    /// Oldest first.
    #[display("ASC")]
    Ascending,
    /// Newest first.
    #[default]
    #[display("DESC")]
    Descending,
}

/// Request for a page of a process's result log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsQuery {
    /// Continue from this position.
    pub from: Option<Cursor>,
    /// Page size.
    pub limit: usize,
    /// Page order.
    pub sort: SortOrder,
}

/// One entry in the result log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEdge {
    /// Position of this entry.
    pub cursor: Cursor,
    /// The evaluation result.
    pub node: ResultNode,
}

/// Messages emitted by one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResultNode {
    /// Emitted messages.
    #[serde(rename = "Messages", default)]
    pub messages: Vec<TaggedMessage>,
}

/// A page of the result log.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResultsPage {
    /// Entries in the requested order.
    #[serde(default)]
    pub edges: Vec<ResultEdge>,
}

/// A request to spawn a new process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Runtime module id.
    pub module: String,
    /// Scheduler unit address.
    pub scheduler: String,
    /// Extra process tags.
    pub tags: Vec<Tag>,
    /// Initial process data.
    pub data: String,
}

/// Strips terminal colour codes and Lua chunk prefixes from error output.
///
/// `"\u{1b}[31m[string \"aos\"]:12: Not your turn\u{1b}[0m"` becomes
/// `"Not your turn"`.
#[instrument]
pub fn clean_error_output(raw: &str) -> String {
    let mut plain = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' && chars.peek() == Some(&'[') {
            chars.next();
            for code in chars.by_ref() {
                if code.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            plain.push(c);
        }
    }

    let mut text = plain.trim();
    if let Some(rest) = text.strip_prefix("[string \"")
        && let Some(end) = rest.find("\"]:")
    {
        let after = &rest[end + 3..];
        text = match after.find(':') {
            Some(colon) if after[..colon].chars().all(|c| c.is_ascii_digit()) => after[colon + 1..].trim(),
            _ => after.trim(),
        };
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_error_output() {
        assert_eq!(
            clean_error_output("\u{1b}[31m[string \"aos\"]:12: Not your turn\u{1b}[0m"),
            "Not your turn"
        );
        assert_eq!(clean_error_output("  Cell taken \n"), "Cell taken");
    }

    #[test]
    fn test_rejection_ignores_blank_output() {
        let result = ActionResult {
            messages: vec![],
            error_output: Some("\u{1b}[0m  ".to_string()),
            error: None,
        };
        assert_eq!(result.rejection(), None);
        assert!(result.check().is_ok());
    }

    #[test]
    fn test_check_evaluated_ignores_printed_output() {
        let printed = ActionResult {
            error_output: Some("Handlers added".to_string()),
            ..Default::default()
        };
        assert!(printed.check().is_err());
        assert!(printed.check_evaluated().is_ok());

        let failed = ActionResult {
            error_output: Some("[string \"aos\"]:3: syntax error".to_string()),
            error: Some("[string \"aos\"]:3: syntax error".to_string()),
            ..Default::default()
        };
        let err = failed.check_evaluated().unwrap_err();
        assert!(err.is_rejection());
    }

    #[test]
    fn test_message_tag_lookup() {
        let message = TaggedMessage::new(
            vec![Tag::new("Action", "CurrentTurn"), Tag::new("CurrentPlayer", "abc")],
            "{}",
        );
        assert_eq!(message.action(), Some("CurrentTurn"));
        assert_eq!(message.tag_any(&["Current-Player", "CurrentPlayer"]), Some("abc"));
        assert!(message.has_value("abc"));
        assert!(!message.has_value("Registered"));
    }

    #[test]
    fn test_data_accepts_json_object() {
        let message: TaggedMessage =
            serde_json::from_str(r#"{"Tags": [], "Data": {"isRegistered": true}}"#).unwrap();
        assert_eq!(message.data, r#"{"isRegistered":true}"#);
    }

    #[test]
    fn test_action_wire_tags() {
        let action = Action::new("Make-Move").with_tag("Position", "5");
        let tags = action.wire_tags();
        assert_eq!(tags[0], Tag::new("Action", "Make-Move"));
        assert_eq!(tags[1], Tag::new("Position", "5"));
    }
}
