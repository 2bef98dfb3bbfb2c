//! The conversational agent: LLM step loop, delegation tools and memory

pub mod core;
pub mod errors;
pub mod execution;
pub mod prompt;

pub use core::ChatAgent;
pub use errors::friendly_error;
pub use execution::ChatReply;
pub use prompt::{build_system_prompt, BASE_INSTRUCTION};
