//! LLM client abstractions and implementations

pub mod client;
pub mod message;
#[cfg(test)]
pub(crate) mod mock;
pub mod ollama;
pub mod providers;

pub use client::{
    ChatOptions, FinishReason, FunctionDefinition, LlmClient, LlmResponse, ToolDefinition, Usage,
};
pub use message::{ContentBlock, LlmMessage, MessageContent, MessageRole};
pub use ollama::{model_suggestions, recommended_models, OllamaProbe, OllamaStatus};
pub use providers::{create_client, OpenAiClient};
