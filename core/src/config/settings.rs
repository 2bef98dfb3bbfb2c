//! Runtime settings shared by the three agents
//!
//! Every section deserializes with defaults so a partial JSON config file is
//! valid. The CLI layers environment variables and flags on top.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::types::{ModelParams, Protocol, ResolvedLlmConfig};

/// Model prefixes used by LiteLLM-style model strings
const MODEL_PREFIXES: &[&str] = &["ollama_chat/", "ollama/"];

/// Session timeouts above a year are accepted but flagged
const MAX_SESSION_TIMEOUT_SECS: u64 = 365 * 24 * 60 * 60;

/// Local Ollama runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    /// Ollama server address
    pub api_base: String,
    /// Model used by the conversational agent
    pub default_model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate per reply
    pub max_tokens: u32,
    /// Context window of the model
    pub context_window: u32,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:11434".to_string(),
            default_model: "ollama_chat/mistral-small:7b".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            context_window: 8192,
        }
    }
}

impl OllamaSettings {
    /// Model name as Ollama knows it, without any routing prefix
    pub fn model_name(&self) -> &str {
        strip_model_prefix(&self.default_model)
    }

    /// Resolve the LLM config for the conversational agent
    pub fn to_llm_config(&self) -> ResolvedLlmConfig {
        self.llm_config_for(self.model_name(), self.temperature, self.max_tokens)
    }

    /// Resolve an LLM config for a helper agent with its own sampling settings
    pub fn llm_config_for(&self, model: &str, temperature: f32, max_tokens: u32) -> ResolvedLlmConfig {
        let base_url = format!("{}/v1", self.api_base.trim_end_matches('/'));
        ResolvedLlmConfig::new(
            Protocol::Ollama,
            base_url,
            String::new(),
            strip_model_prefix(model).to_string(),
        )
        .with_params(ModelParams {
            max_tokens: Some(max_tokens),
            temperature: Some(temperature),
            ..Default::default()
        })
    }
}

/// Strip an `ollama_chat/` or `ollama/` routing prefix from a model string
pub fn strip_model_prefix(model: &str) -> &str {
    MODEL_PREFIXES
        .iter()
        .find_map(|prefix| model.strip_prefix(prefix))
        .unwrap_or(model)
}

/// Conversation memory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Maximum number of persisted interactions
    pub max_history: usize,
    /// Seconds after which in-session entries expire
    pub session_timeout_secs: u64,
    /// Whether interactions are persisted and searched across sessions
    pub enable_cross_session: bool,
    /// Directory holding `persistent_memory.json`
    pub memory_dir: PathBuf,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            max_history: 100,
            session_timeout_secs: 3600,
            enable_cross_session: true,
            memory_dir: PathBuf::from("memory_data"),
        }
    }
}

/// Where each agent listens and how the base agent reaches the helpers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    /// Bind host for all servers
    pub host: String,
    /// Port of the conversational agent's web interface
    pub base_port: u16,
    /// Port of the search agent
    pub search_port: u16,
    /// Port of the scraper agent
    pub scraper_port: u16,
    /// Explicit URL of the search agent (defaults to localhost:search_port)
    pub search_agent_url: Option<String>,
    /// Explicit URL of the scraper agent (defaults to localhost:scraper_port)
    pub scraper_agent_url: Option<String>,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            base_port: 8000,
            search_port: 8001,
            scraper_port: 8002,
            search_agent_url: None,
            scraper_agent_url: None,
        }
    }
}

impl EndpointSettings {
    /// Base URL the conversational agent uses to reach the search agent
    pub fn search_url(&self) -> String {
        self.search_agent_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.search_port))
    }

    /// Base URL the conversational agent uses to reach the scraper agent
    pub fn scraper_url(&self) -> String {
        self.scraper_agent_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.scraper_port))
    }

    /// Public URL of the web interface
    pub fn base_url(&self) -> String {
        format!("http://localhost:{}", self.base_port)
    }
}

/// Google Custom Search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Custom Search JSON API key
    pub api_key: Option<String>,
    /// Programmable Search Engine id (`cx`)
    pub engine_id: Option<String>,
    /// Upper bound on results the API may return
    pub max_results: u32,
    /// Results requested per query
    pub results_per_query: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Model used to summarize results (defaults to the Ollama default model)
    pub model_override: Option<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            engine_id: None,
            max_results: 10,
            results_per_query: 5,
            timeout_secs: 30,
            model_override: None,
        }
    }
}

impl SearchSettings {
    /// Whether both credentials are present
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
            && self.engine_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Web scraper settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    /// Maximum URLs scraped per request
    pub max_urls: usize,
    /// Maximum characters of extracted content kept per page
    pub max_content_length: usize,
    /// Pages with less extracted text than this are discarded
    pub min_content_length: usize,
    /// Per-page request timeout in seconds
    pub timeout_secs: u64,
    /// User agent sent with page requests
    pub user_agent: String,
    /// Model used to summarize pages (defaults to the Ollama default model)
    pub model_override: Option<String>,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            max_urls: 3,
            max_content_length: 10_000,
            min_content_length: 100,
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (compatible; WebScraperBot/1.0)".to_string(),
            model_override: None,
        }
    }
}

/// Input limits for the conversational agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Maximum characters per user message
    pub max_input_length: usize,
    /// Requests allowed per session per minute on the web interface
    pub rate_limit_per_minute: usize,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            max_input_length: 1000,
            rate_limit_per_minute: 60,
        }
    }
}

/// Behaviour of the conversational agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum LLM calls per user message
    pub max_steps: usize,
    /// Whether conversation memory feeds the prompt
    pub enable_memory: bool,
    /// Replaces the built-in instruction when set
    pub system_prompt: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: 5,
            enable_memory: true,
            system_prompt: None,
        }
    }
}

/// All settings for the agent mesh
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ollama: OllamaSettings,
    pub memory: MemorySettings,
    pub endpoints: EndpointSettings,
    pub search: SearchSettings,
    pub scraper: ScraperSettings,
    pub security: SecuritySettings,
    pub agent: AgentSettings,
}

/// Outcome of [`Settings::validate`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Settings {
    /// LLM config for the search agent's summarizer
    pub fn search_llm_config(&self) -> ResolvedLlmConfig {
        let model = self
            .search
            .model_override
            .as_deref()
            .unwrap_or(&self.ollama.default_model);
        self.ollama.llm_config_for(model, 0.3, 1024)
    }

    /// LLM config for the scraper agent's summarizer
    pub fn scraper_llm_config(&self) -> ResolvedLlmConfig {
        let model = self
            .scraper
            .model_override
            .as_deref()
            .unwrap_or(&self.ollama.default_model);
        self.ollama.llm_config_for(model, 0.3, 2048)
    }

    /// Check the settings for conflicts and questionable values
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let ports = [
            ("web interface", self.endpoints.base_port),
            ("search agent", self.endpoints.search_port),
            ("scraper agent", self.endpoints.scraper_port),
        ];
        for (i, (name_a, port_a)) in ports.iter().enumerate() {
            for (name_b, port_b) in &ports[i + 1..] {
                if port_a == port_b {
                    errors.push(format!(
                        "The {} and {} cannot share port {}",
                        name_a, name_b, port_a
                    ));
                }
            }
        }

        if !self.ollama.api_base.starts_with("http://")
            && !self.ollama.api_base.starts_with("https://")
        {
            errors.push(format!(
                "Ollama API base must start with http:// or https://: {}",
                self.ollama.api_base
            ));
        }

        if self.ollama.default_model.trim().is_empty() {
            errors.push("Default model cannot be empty".to_string());
        }

        if !(0.0..=1.0).contains(&self.ollama.temperature) {
            warnings.push("Temperature should be between 0 and 1".to_string());
        }

        if self.ollama.max_tokens < 100 {
            warnings.push("Max tokens seems low, responses might be truncated".to_string());
        }

        if self.memory.max_history < 10 {
            warnings.push("Max history is very low, context might be limited".to_string());
        }

        if self.memory.session_timeout_secs > MAX_SESSION_TIMEOUT_SECS {
            warnings.push(format!(
                "Session timeout of {}s is longer than a year; session memory will never expire",
                self.memory.session_timeout_secs
            ));
        }

        if !self.search.is_configured() {
            warnings.push(
                "GOOGLE_SEARCH_API_KEY or GOOGLE_SEARCH_ENGINE_ID is not set; \
                 the search agent will report a configuration error"
                    .to_string(),
            );
        }

        ValidationReport {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}
