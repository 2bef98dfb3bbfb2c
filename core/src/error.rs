//! Error types for agentmesh core
//!
//! Each subsystem has its own enum; [`Error`] wraps them so `?` works across
//! module boundaries. Turning these into words for the user is the job of
//! [`crate::agent::friendly_error`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("A2A error: {0}")]
    A2a(#[from] A2aError),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport failure talking to Ollama, Google or another agent
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A delegated request ran past its deadline
    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("{0}")]
    Generic(String),
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The completion call failed; async-openai does not surface the status
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {name}")]
    NotFound { name: String },

    #[error("Invalid tool parameters: {message}")]
    InvalidParameters { message: String },
}

/// Rejected input or a reply loop that never settled
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Input too long: {length} characters (max {max})")]
    InputTooLong { length: usize, max: usize },

    #[error("No response produced after {steps} steps")]
    NoResponse { steps: usize },
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Google Search is not configured")]
    NotConfigured,

    #[error("Google API error {status}: {message}")]
    Api { status: u16, message: String },
}

#[derive(Error, Debug)]
pub enum A2aError {
    #[error("Failed to fetch agent card from {url}: {message}")]
    CardUnavailable { url: String, message: String },

    /// JSON-RPC error object returned by the remote agent
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Unexpected RPC response: {message}")]
    UnexpectedResponse { message: String },
}

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Failed to persist memory to {path}: {message}")]
    PersistFailed { path: String, message: String },

    #[error("Failed to load memory from {path}: {message}")]
    LoadFailed { path: String, message: String },
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Generic(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Generic(msg.to_owned())
    }
}
