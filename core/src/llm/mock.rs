//! Scripted LLM client for tests

use super::client::{ChatOptions, FinishReason, LlmClient, LlmResponse, ToolDefinition};
use super::message::{ContentBlock, LlmMessage, MessageContent, MessageRole};
use crate::error::{LlmError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One recorded `chat_completion` call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<LlmMessage>,
    pub tool_names: Vec<String>,
}

impl RecordedCall {
    /// Text of every message in the call, one per line
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .filter_map(|m| m.get_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Returns queued responses in order and errors once they run out
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<LlmResponse>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A client whose every call fails
    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn text_response(text: &str) -> LlmResponse {
    LlmResponse {
        message: LlmMessage::assistant(text),
        usage: None,
        model: "mock-model".to_string(),
        finish_reason: Some(FinishReason::Stop),
    }
}

pub fn tool_call_response(id: &str, name: &str, input: serde_json::Value) -> LlmResponse {
    LlmResponse {
        message: LlmMessage {
            role: MessageRole::Assistant,
            content: MessageContent::MultiModal(vec![ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            }]),
            metadata: None,
        },
        usage: None,
        model: "mock-model".to_string(),
        finish_reason: Some(FinishReason::ToolCalls),
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        tools: Option<Vec<ToolDefinition>>,
        _options: Option<ChatOptions>,
    ) -> Result<LlmResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages,
            tool_names: tools
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.function.name)
                .collect(),
        });
        self.responses.lock().unwrap().pop_front().ok_or_else(|| {
            LlmError::ApiError {
                status: 503,
                message: "Connection refused".to_string(),
            }
            .into()
        })
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
