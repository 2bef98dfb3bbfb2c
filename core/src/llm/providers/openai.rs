//! OpenAI-compatible chat client using the async-openai library
//!
//! Ollama exposes the same chat completions API under `/v1`, so this client
//! serves both the local runtime and hosted OpenAI-compatible endpoints.

use crate::config::ResolvedLlmConfig;
use crate::error::{LlmError, Result};
use crate::llm::{
    ChatOptions, ContentBlock, FinishReason, LlmClient, LlmMessage, LlmResponse, MessageContent,
    MessageRole, ToolDefinition, Usage,
};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
        ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessage,
        ChatCompletionRequestToolMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, FunctionCall, FunctionObject, Stop,
    },
    Client,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

/// Chat client for any OpenAI-compatible endpoint
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    provider: String,
}

impl OpenAiClient {
    /// Create a client from a resolved LLM config
    pub fn new(config: &ResolvedLlmConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|message| LlmError::InvalidRequest { message })?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(config.effective_api_key())
            .with_api_base(config.base_url.trim_end_matches('/'));

        let mut client = Client::with_config(openai_config);
        if !config.headers.is_empty() {
            client = client.with_http_client(http_client_with_headers(config)?);
        }

        Ok(Self {
            client,
            model: config.model.clone(),
            provider: config.protocol.as_str().to_string(),
        })
    }

    /// Convert our message model to async-openai request messages
    fn convert_messages(
        &self,
        messages: Vec<LlmMessage>,
    ) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut converted = Vec::with_capacity(messages.len());

        for message in messages {
            match message.role {
                MessageRole::System => {
                    converted.push(ChatCompletionRequestMessage::System(
                        ChatCompletionRequestSystemMessage {
                            content: text_of(&message.content).into(),
                            name: None,
                        },
                    ));
                }
                MessageRole::User => {
                    converted.push(ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessage {
                            content: text_of(&message.content).into(),
                            name: None,
                        },
                    ));
                }
                MessageRole::Assistant => {
                    converted.push(ChatCompletionRequestMessage::Assistant(
                        assistant_message(&message.content),
                    ));
                }
                MessageRole::Tool => {
                    let MessageContent::MultiModal(blocks) = &message.content else {
                        return Err(LlmError::InvalidRequest {
                            message: "Tool message must contain a tool result".to_string(),
                        }
                        .into());
                    };
                    let before = converted.len();
                    for block in blocks {
                        if let ContentBlock::ToolResult {
                            tool_use_id,
                            content,
                            ..
                        } = block
                        {
                            converted.push(ChatCompletionRequestMessage::Tool(
                                ChatCompletionRequestToolMessage {
                                    content: ChatCompletionRequestToolMessageContent::Text(
                                        content.clone(),
                                    ),
                                    tool_call_id: tool_use_id.clone(),
                                },
                            ));
                        }
                    }
                    if converted.len() == before {
                        return Err(LlmError::InvalidRequest {
                            message: "Tool message must contain a tool result".to_string(),
                        }
                        .into());
                    }
                }
            }
        }

        Ok(converted)
    }

    fn convert_tools(&self, tools: Vec<ToolDefinition>) -> Vec<ChatCompletionTool> {
        tools
            .into_iter()
            .map(|tool| ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: FunctionObject {
                    name: tool.function.name,
                    description: Some(tool.function.description),
                    parameters: Some(tool.function.parameters),
                    strict: None,
                },
            })
            .collect()
    }

    /// Convert an async-openai response to our response type
    fn convert_response(&self, response: CreateChatCompletionResponse) -> Result<LlmResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidRequest {
                message: "No choices in response".to_string(),
            })?;

        let mut blocks = Vec::new();
        if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
            blocks.push(ContentBlock::Text { text });
        }
        for tool_call in choice.message.tool_calls.unwrap_or_default() {
            // Small local models sometimes emit arguments that are not valid JSON
            let input = serde_json::from_str(&tool_call.function.arguments)
                .unwrap_or_else(|_| Value::String(tool_call.function.arguments.clone()));
            blocks.push(ContentBlock::ToolUse {
                id: tool_call.id,
                name: tool_call.function.name,
                input,
            });
        }

        let content = match blocks.as_slice() {
            [] => MessageContent::Text(String::new()),
            [ContentBlock::Text { text }] => MessageContent::Text(text.clone()),
            _ => MessageContent::MultiModal(blocks),
        };

        let finish_reason = choice.finish_reason.map(|reason| match reason {
            async_openai::types::FinishReason::Stop => FinishReason::Stop,
            async_openai::types::FinishReason::Length => FinishReason::Length,
            async_openai::types::FinishReason::ToolCalls
            | async_openai::types::FinishReason::FunctionCall => FinishReason::ToolCalls,
            async_openai::types::FinishReason::ContentFilter => FinishReason::ContentFilter,
        });

        Ok(LlmResponse {
            message: LlmMessage {
                role: MessageRole::Assistant,
                content,
                metadata: None,
            },
            usage: response.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: response.model,
            finish_reason,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        tools: Option<Vec<ToolDefinition>>,
        options: Option<ChatOptions>,
    ) -> Result<LlmResponse> {
        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder
            .model(&self.model)
            .messages(self.convert_messages(messages)?);

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            tracing::debug!("{} request with {} tools enabled", self.provider, tools.len());
            request_builder.tools(self.convert_tools(tools));
        }

        if let Some(opts) = options {
            if let Some(max_tokens) = opts.max_tokens {
                request_builder.max_tokens(max_tokens);
            }
            if let Some(temperature) = opts.temperature {
                request_builder.temperature(temperature);
            }
            if let Some(top_p) = opts.top_p {
                request_builder.top_p(top_p);
            }
            if let Some(stop) = opts.stop.filter(|s| !s.is_empty()) {
                request_builder.stop(Stop::StringArray(stop));
            }
        }

        let request = request_builder.build().map_err(|e| LlmError::InvalidRequest {
            message: format!("Failed to build request: {}", e),
        })?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            tracing::error!("{} chat completion failed: {}", self.provider, e);
            LlmError::ApiError {
                // async-openai doesn't expose status codes
                status: 500,
                message: e.to_string(),
            }
        })?;

        let response = self.convert_response(response)?;
        for block in response.message.get_tool_uses() {
            if let ContentBlock::ToolUse { id, name, .. } = block {
                tracing::debug!("Tool call: {} (id: {})", name, id);
            }
        }
        Ok(response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        &self.provider
    }
}

fn text_of(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::MultiModal(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn assistant_message(content: &MessageContent) -> ChatCompletionRequestAssistantMessage {
    let text = text_of(content);
    let tool_calls: Vec<ChatCompletionMessageToolCall> = match content {
        MessageContent::Text(_) => Vec::new(),
        MessageContent::MultiModal(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ChatCompletionMessageToolCall {
                    id: id.clone(),
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionCall {
                        name: name.clone(),
                        arguments: input.to_string(),
                    },
                }),
                _ => None,
            })
            .collect(),
    };

    ChatCompletionRequestAssistantMessage {
        content: (!text.is_empty()).then(|| ChatCompletionRequestAssistantMessageContent::Text(text)),
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        ..Default::default()
    }
}

fn http_client_with_headers(config: &ResolvedLlmConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    for (key, value) in &config.headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| LlmError::InvalidRequest {
            message: format!("Invalid header name '{}': {}", key, e),
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| LlmError::InvalidRequest {
            message: format!("Invalid value for header '{}': {}", key, e),
        })?;
        headers.insert(name, value);
    }
    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;
    use serde_json::json;

    fn client() -> OpenAiClient {
        let config = ResolvedLlmConfig::new(
            Protocol::Ollama,
            "http://localhost:11434/v1".to_string(),
            String::new(),
            "mistral-small:7b".to_string(),
        );
        OpenAiClient::new(&config).unwrap()
    }

    #[test]
    fn ollama_client_needs_no_api_key() {
        let client = client();
        assert_eq!(client.model_name(), "mistral-small:7b");
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn converts_tool_round_trip_messages() {
        let assistant = LlmMessage {
            role: MessageRole::Assistant,
            content: MessageContent::MultiModal(vec![ContentBlock::ToolUse {
                id: "call_1".to_string(),
                name: "search_google".to_string(),
                input: json!({"query": "rust async"}),
            }]),
            metadata: None,
        };
        let messages = vec![
            LlmMessage::system("You are helpful"),
            LlmMessage::user("find rust async"),
            assistant,
            LlmMessage::tool_result("call_1", "🔍 results", false),
        ];

        let converted = client().convert_messages(messages).unwrap();
        assert_eq!(converted.len(), 4);
        match &converted[2] {
            ChatCompletionRequestMessage::Assistant(msg) => {
                assert!(msg.content.is_none());
                let calls = msg.tool_calls.as_ref().unwrap();
                assert_eq!(calls[0].function.name, "search_google");
                assert_eq!(calls[0].function.arguments, r#"{"query":"rust async"}"#);
            }
            other => panic!("unexpected message {:?}", other),
        }
        match &converted[3] {
            ChatCompletionRequestMessage::Tool(msg) => assert_eq!(msg.tool_call_id, "call_1"),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn plain_tool_text_is_rejected() {
        let message = LlmMessage {
            role: MessageRole::Tool,
            content: MessageContent::Text("orphan".to_string()),
            metadata: None,
        };
        assert!(client().convert_messages(vec![message]).is_err());
    }

    #[test]
    fn response_with_tool_calls_becomes_multimodal() {
        let response: CreateChatCompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000u32,
            "model": "mistral-small:7b",
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "search_and_scrape", "arguments": "{\"query\":\"tokio\"}"}
                    }]
                }
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }))
        .unwrap();

        let converted = client().convert_response(response).unwrap();
        assert_eq!(converted.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(converted.usage.unwrap().total_tokens, 15);
        let uses = converted.message.get_tool_uses();
        assert_eq!(uses.len(), 1);
        match uses[0] {
            ContentBlock::ToolUse { name, input, .. } => {
                assert_eq!(name, "search_and_scrape");
                assert_eq!(input["query"], "tokio");
            }
            _ => unreachable!(),
        }
    }
}
