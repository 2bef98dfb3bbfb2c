//! Chat message model shared by the agents and the LLM providers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A message in an LLM conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub content: MessageContent,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Role of the message sender
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    /// Tool execution result
    Tool,
}

/// Content of a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    /// Text mixed with tool calls or tool results
    MultiModal(Vec<ContentBlock>),
}

/// A block of content within a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },

    /// Tool call requested by the model
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Result sent back for a tool call
    ToolResult {
        tool_use_id: String,
        is_error: Option<bool>,
        content: String,
    },
}

impl LlmMessage {
    fn text(role: MessageRole, content: String) -> Self {
        Self {
            role,
            content: MessageContent::Text(content),
            metadata: None,
        }
    }

    pub fn system<S: Into<String>>(content: S) -> Self {
        Self::text(MessageRole::System, content.into())
    }

    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::text(MessageRole::User, content.into())
    }

    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::text(MessageRole::Assistant, content.into())
    }

    /// Tool message carrying one result for the call `tool_use_id`
    pub fn tool_result<S: Into<String>>(tool_use_id: &str, content: S, is_error: bool) -> Self {
        Self {
            role: MessageRole::Tool,
            content: MessageContent::MultiModal(vec![ContentBlock::ToolResult {
                tool_use_id: tool_use_id.to_string(),
                is_error: Some(is_error),
                content: content.into(),
            }]),
            metadata: None,
        }
    }

    /// Text content of the message, joining text blocks with newlines
    pub fn get_text(&self) -> Option<String> {
        match &self.content {
            MessageContent::Text(text) => Some(text.clone()),
            MessageContent::MultiModal(blocks) => {
                let parts: Vec<&str> = blocks
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("\n"))
                }
            }
        }
    }

    pub fn has_tool_use(&self) -> bool {
        !self.get_tool_uses().is_empty()
    }

    /// Tool call blocks requested by the model
    pub fn get_tool_uses(&self) -> Vec<&ContentBlock> {
        match &self.content {
            MessageContent::Text(_) => Vec::new(),
            MessageContent::MultiModal(blocks) => blocks
                .iter()
                .filter(|block| matches!(block, ContentBlock::ToolUse { .. }))
                .collect(),
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}
