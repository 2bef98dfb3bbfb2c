//! Memory entry and statistics types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// One user/assistant exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryEntry {
    #[serde(default = "new_entry_id")]
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_message: String,
    pub assistant_response: String,
    pub session_id: String,
    /// Short fingerprint of the exchange text
    pub context_hash: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl MemoryEntry {
    pub fn new(
        user_message: &str,
        assistant_response: &str,
        session_id: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: new_entry_id(),
            timestamp: Utc::now(),
            user_message: user_message.to_string(),
            assistant_response: assistant_response.to_string(),
            session_id: session_id.to_string(),
            context_hash: context_hash(&format!("{}{}", user_message, assistant_response)),
            metadata,
        }
    }
}

fn new_entry_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// First 8 hex chars of the SHA-256 of the lowercased text
pub fn context_hash(text: &str) -> String {
    let digest = Sha256::digest(text.to_lowercase().as_bytes());
    digest
        .iter()
        .take(4)
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

/// Counters reported by `MemoryStore::stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_current_session_memories: usize,
    pub total_persistent_memories: usize,
    pub recent_interactions_last_hour: usize,
    pub unique_sessions: usize,
    pub memory_enabled: bool,
    pub max_history_limit: usize,
}
