//! Result of one conversational turn

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    /// Final answer shown to the user
    pub text: String,

    /// LLM calls made for this turn
    pub steps: usize,

    /// Tools invoked, in first-use order
    pub tools_used: Vec<String>,

    pub duration_ms: u64,

    /// Whether remembered context was added to the prompt
    pub memory_context_used: bool,

    pub model: String,
}
