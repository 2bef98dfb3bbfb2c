//! CLI command implementations

pub mod chat;
pub mod memory;
pub mod models;
pub mod run;
pub mod serve;
pub mod start;
pub mod tools;
pub mod validate;

pub use chat::chat_command;
pub use memory::{memory_command, MemoryAction};
pub use models::models_command;
pub use run::run_command;
pub use serve::{serve_command, AgentKind};
pub use start::start_command;
pub use tools::tools_command;
pub use validate::validate_command;
