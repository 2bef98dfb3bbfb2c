//! Conversation memory for the conversational agent

pub mod entry;
pub mod profile;
pub mod store;

pub use entry::{context_hash, MemoryEntry, MemoryStats};
pub use profile::{extract_user_profile, UserProfile};
pub use store::MemoryStore;
