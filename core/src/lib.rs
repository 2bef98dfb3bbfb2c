//! # agentmesh Core
//!
//! Core library for agentmesh - a local conversational agent that delegates
//! web search and content scraping to two helper agents.
//!
//! The pieces in here are glue: an LLM client for a local Ollama runtime, a
//! thin Agent-to-Agent (A2A) JSON-RPC client and server, a Google Custom
//! Search client, an HTML content extractor and a small conversation memory.

// Core modules
pub mod a2a;
pub mod agent;
pub mod config;
pub mod error;
pub mod health;
pub mod llm;
pub mod memory;
pub mod scraper;
pub mod search;
pub mod tools;
pub mod util;

// Re-export commonly used types
pub use agent::{ChatAgent, ChatReply};
pub use health::HealthReport;
pub use config::{ModelParams, Protocol, ResolvedLlmConfig, Settings};
pub use memory::MemoryStore;

/// Current version of the agentmesh-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing on stderr with a filter directive (e.g. "info", "debug")
///
/// Stdout is left to command output.
pub fn init_tracing(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}
