//! A2A wire types: agent cards, messages, tasks and JSON-RPC envelopes

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROTOCOL_VERSION: &str = "0.2.5";
pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";
pub const AGENT_CARD_PATH_ALT: &str = "/.well-known/agent-card.json";

/// JSON-RPC error codes
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const TASK_NOT_FOUND: i64 = -32001;
    pub const TASK_NOT_CANCELABLE: i64 = -32002;
}

/// Self-description an agent publishes at its well-known path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    /// Endpoint receiving JSON-RPC requests
    pub url: String,
    pub version: String,
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    #[serde(default)]
    pub default_input_modes: Vec<String>,
    #[serde(default)]
    pub default_output_modes: Vec<String>,
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
}

fn default_protocol_version() -> String {
    PROTOCOL_VERSION.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    #[serde(default)]
    pub streaming: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

impl AgentSkill {
    pub fn new(id: &str, name: &str, description: &str, tags: &[&str], examples: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            examples: examples.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// Piece of message content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text { text: String },
    /// File and data parts are accepted but not interpreted
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageKind {
    #[default]
    #[serde(rename = "message")]
    Message,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub kind: MessageKind,
    pub message_id: String,
    pub role: Role,
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

impl Message {
    fn with_text(role: Role, text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Message,
            message_id: uuid::Uuid::new_v4().to_string(),
            role,
            parts: vec![Part::Text { text: text.into() }],
            task_id: None,
            context_id: None,
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::with_text(Role::User, text)
    }

    pub fn agent_text(text: impl Into<String>) -> Self {
        Self::with_text(Role::Agent, text)
    }

    /// Text parts joined with newlines
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                Part::Unsupported => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Submitted,
    Working,
    Completed,
    Canceled,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub state: TaskState,
    /// RFC 3339 time of the last transition
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

impl TaskStatus {
    pub fn now(state: TaskState, message: Option<Message>) -> Self {
        Self {
            state,
            timestamp: Utc::now().to_rfc3339(),
            message,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskKind {
    #[default]
    #[serde(rename = "task")]
    Task,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub kind: TaskKind,
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub history: Vec<Message>,
}

impl Task {
    /// Most recent message sent by the agent
    pub fn last_agent_message(&self) -> Option<&Message> {
        self.history.iter().rev().find(|m| m.role == Role::Agent)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum StatusUpdateKind {
    #[default]
    #[serde(rename = "status-update")]
    StatusUpdate,
}

/// Final event of a `message/stream` call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    #[serde(default)]
    pub kind: StatusUpdateKind,
    pub task_id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(rename = "final")]
    pub is_final: bool,
}

/// Result of `message/send`: either a direct reply or the task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SendMessageResult {
    Task(Task),
    Message(Message),
}

impl SendMessageResult {
    /// The agent's reply, taking the last agent message of a task
    pub fn into_reply(self) -> Option<Message> {
        match self {
            Self::Message(message) => Some(message),
            Self::Task(task) => task.last_agent_message().cloned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSendParams {
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIdParams {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(Value::String(uuid::Uuid::new_v4().to_string())),
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_uses_camel_case_wire_names() {
        let mut message = Message::agent_text("hello");
        message.task_id = Some("t1".to_string());
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["kind"], "message");
        assert_eq!(json["role"], "agent");
        assert_eq!(json["taskId"], "t1");
        assert!(json.get("contextId").is_none());
        assert_eq!(json["parts"][0], json!({"kind": "text", "text": "hello"}));
    }

    #[test]
    fn unknown_parts_are_tolerated() {
        let message: Message = serde_json::from_value(json!({
            "kind": "message",
            "messageId": "m1",
            "role": "user",
            "parts": [
                {"kind": "text", "text": "first"},
                {"kind": "data", "data": {"x": 1}},
                {"kind": "text", "text": "second"}
            ]
        }))
        .unwrap();
        assert_eq!(message.parts[1], Part::Unsupported);
        assert_eq!(message.text(), "first\nsecond");
    }

    #[test]
    fn send_result_distinguishes_task_from_message() {
        let task = Task {
            kind: TaskKind::Task,
            id: "t1".to_string(),
            context_id: "c1".to_string(),
            status: TaskStatus::now(TaskState::Completed, None),
            history: vec![
                Message::user_text("search for rust"),
                Message::agent_text("working..."),
                Message::agent_text("done"),
            ],
        };
        let as_task: SendMessageResult =
            serde_json::from_value(serde_json::to_value(&task).unwrap()).unwrap();
        assert!(matches!(as_task, SendMessageResult::Task(_)));
        assert_eq!(as_task.into_reply().unwrap().text(), "done");

        let as_message: SendMessageResult =
            serde_json::from_value(serde_json::to_value(Message::agent_text("hi")).unwrap())
                .unwrap();
        assert!(matches!(as_message, SendMessageResult::Message(_)));
    }

    #[test]
    fn status_update_serializes_final_flag() {
        let event = TaskStatusUpdateEvent {
            kind: StatusUpdateKind::StatusUpdate,
            task_id: "t1".to_string(),
            context_id: "c1".to_string(),
            status: TaskStatus::now(TaskState::Completed, None),
            is_final: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "status-update");
        assert_eq!(json["final"], true);
        assert_eq!(json["status"]["state"], "completed");
    }
}
