//! Configuration types for agentmesh core
//!
//! Only exports pure data types. All discovery and loading logic is in the CLI layer.

pub mod settings;
pub mod types;

pub use settings::{
    AgentSettings, EndpointSettings, MemorySettings, OllamaSettings, ScraperSettings,
    SearchSettings, SecuritySettings, Settings, ValidationReport,
};
pub use types::{ModelParams, Protocol, ResolvedLlmConfig};
