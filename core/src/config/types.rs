//! Resolved LLM connection types
//!
//! Core only sees configuration that is already resolved; file discovery,
//! `env:` references and flag overrides live in the CLI.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Placeholder key sent to Ollama, which ignores authentication
pub const OLLAMA_PLACEHOLDER_KEY: &str = "ollama";

/// Wire protocol of the chat completion endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Local Ollama runtime, reached through its OpenAI-compatible `/v1` API
    #[serde(rename = "ollama")]
    Ollama,
    /// Any other OpenAI-compatible API
    #[serde(rename = "openai_compat")]
    OpenAICompat,
    /// Unknown provider prefix; no client can be built for it
    #[serde(rename = "custom")]
    Custom(String),
}

impl Protocol {
    pub fn as_str(&self) -> &str {
        match self {
            Protocol::Ollama => "ollama",
            Protocol::OpenAICompat => "openai_compat",
            Protocol::Custom(name) => name,
        }
    }

    pub fn requires_api_key(&self) -> bool {
        *self != Protocol::Ollama
    }
}

impl std::str::FromStr for Protocol {
    type Err = std::convert::Infallible;

    /// Accepts the provider prefix of a model string such as `ollama_chat/llama3.1:8b`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "ollama" | "ollama_chat" => Protocol::Ollama,
            "openai" | "openai_compat" => Protocol::OpenAICompat,
            _ => Protocol::Custom(s.to_string()),
        })
    }
}

/// Sampling parameters sent with each completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelParams {
    pub max_tokens: Option<u32>,
    /// 0.0 to 2.0
    pub temperature: Option<f32>,
    /// 0.0 to 1.0
    pub top_p: Option<f32>,
    pub stop_sequences: Option<Vec<String>>,
}

/// Everything the OpenAI-compatible client needs to talk to a model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedLlmConfig {
    pub protocol: Protocol,
    pub base_url: String,
    /// Empty for Ollama; see [`ResolvedLlmConfig::effective_api_key`]
    pub api_key: String,
    /// Bare model name, without the provider prefix
    pub model: String,
    #[serde(default)]
    pub params: ModelParams,
    /// Extra HTTP headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl ResolvedLlmConfig {
    pub fn new(protocol: Protocol, base_url: String, api_key: String, model: String) -> Self {
        Self {
            protocol,
            base_url,
            api_key,
            model,
            params: ModelParams::default(),
            headers: HashMap::new(),
        }
    }

    pub fn with_params(self, params: ModelParams) -> Self {
        Self { params, ..self }
    }

    /// The API key to send, substituting the placeholder where none is needed
    pub fn effective_api_key(&self) -> &str {
        if self.api_key.is_empty() && !self.protocol.requires_api_key() {
            OLLAMA_PLACEHOLDER_KEY
        } else {
            &self.api_key
        }
    }

    /// First problem found, as a message for the user
    pub fn validate(&self) -> Result<(), String> {
        let problem = if self.api_key.is_empty() && self.protocol.requires_api_key() {
            Some("API key cannot be empty")
        } else if self.model.is_empty() {
            Some("Model name cannot be empty")
        } else if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            Some("Base URL must start with http:// or https://")
        } else if self.params.temperature.is_some_and(|t| !(0.0..=2.0).contains(&t)) {
            Some("Temperature must be between 0.0 and 2.0")
        } else if self.params.top_p.is_some_and(|p| !(0.0..=1.0).contains(&p)) {
            Some("Top-p must be between 0.0 and 1.0")
        } else {
            None
        };

        match problem {
            Some(message) => Err(message.to_string()),
            None => Ok(()),
        }
    }
}
