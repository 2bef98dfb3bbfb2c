//! In-process session memory with optional JSON persistence

use crate::config::MemorySettings;
use crate::error::{MemoryError, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

use super::entry::{MemoryEntry, MemoryStats};
use super::profile::{extract_user_profile, UserProfile};

const MEMORY_FILE: &str = "persistent_memory.json";

/// Conversation memory shared by all sessions of one agent process
pub struct MemoryStore {
    settings: MemorySettings,
    session: RwLock<Vec<MemoryEntry>>,
    persistent: RwLock<Vec<MemoryEntry>>,
    file_path: PathBuf,
}

impl MemoryStore {
    /// Open the store, creating the memory directory and loading persisted entries
    pub async fn open(settings: MemorySettings) -> Result<Self> {
        fs::create_dir_all(&settings.memory_dir)
            .await
            .map_err(|e| MemoryError::LoadFailed {
                path: settings.memory_dir.display().to_string(),
                message: e.to_string(),
            })?;

        let file_path = settings.memory_dir.join(MEMORY_FILE);
        let mut persistent = match read_entries(&file_path).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Could not load persistent memory: {}", e);
                Vec::new()
            }
        };
        trim_to_newest(&mut persistent, settings.max_history);
        tracing::debug!(
            "Loaded {} persistent memories from {}",
            persistent.len(),
            file_path.display()
        );

        Ok(Self {
            settings,
            session: RwLock::new(Vec::new()),
            persistent: RwLock::new(persistent),
            file_path,
        })
    }

    pub fn settings(&self) -> &MemorySettings {
        &self.settings
    }

    /// Record an exchange
    pub async fn add_interaction(
        &self,
        user_message: &str,
        assistant_response: &str,
        session_id: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<MemoryEntry> {
        let entry = MemoryEntry::new(user_message, assistant_response, session_id, metadata);

        {
            let mut session = self.session.write().await;
            if let Some(cutoff) = session_cutoff(Utc::now(), self.settings.session_timeout_secs) {
                session.retain(|e| e.timestamp >= cutoff);
            }
            session.push(entry.clone());
        }

        if self.settings.enable_cross_session {
            let mut persistent = self.persistent.write().await;
            persistent.push(entry.clone());
            trim_to_newest(&mut persistent, self.settings.max_history);
            self.save(&persistent).await?;
        }

        Ok(entry)
    }

    /// Last `limit` exchanges of a session, oldest first
    pub async fn session_history(&self, session_id: &str, limit: Option<usize>) -> Vec<MemoryEntry> {
        let session = self.session.read().await;
        let entries: Vec<MemoryEntry> = session
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect();
        match limit {
            Some(limit) if entries.len() > limit => entries[entries.len() - limit..].to_vec(),
            _ => entries,
        }
    }

    /// Keyword search over session and persistent memory
    pub async fn search(&self, query: &str, limit: usize) -> Vec<MemoryEntry> {
        self.scored(query)
            .await
            .into_iter()
            .take(limit)
            .map(|(_, entry)| entry)
            .collect()
    }

    async fn scored(&self, query: &str) -> Vec<(f64, MemoryEntry)> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        let query_words: HashSet<&str> = query.split_whitespace().collect();

        let session = self.session.read().await;
        let persistent = self.persistent.read().await;

        let mut seen = HashSet::new();
        let mut hits: Vec<(f64, MemoryEntry)> = session
            .iter()
            .chain(persistent.iter())
            .filter(|entry| seen.insert(entry.id.clone()))
            .filter_map(|entry| {
                let score = relevance(&query, &query_words, entry);
                (score >= 0.1).then(|| (score, entry.clone()))
            })
            .collect();

        hits.sort_by(|(a_score, a), (b_score, b)| {
            b_score
                .total_cmp(a_score)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        hits
    }

    /// Memory context to prepend to the prompt for `query`
    pub async fn context_for_query(&self, query: &str, session_id: &str) -> String {
        let mut lines = Vec::new();

        let recent = self.session_history(session_id, Some(3)).await;
        if !recent.is_empty() {
            lines.push("Recent conversation:".to_string());
            for entry in &recent {
                lines.push(format!("User: {}", entry.user_message));
                lines.push(format!("Assistant: {}", entry.assistant_response));
            }
        }

        if self.settings.enable_cross_session {
            let related: Vec<MemoryEntry> = self
                .scored(query)
                .await
                .into_iter()
                .map(|(_, entry)| entry)
                .filter(|entry| entry.session_id != session_id)
                .take(3)
                .collect();
            if !related.is_empty() {
                lines.push("\nRelevant past conversations:".to_string());
                for entry in &related {
                    lines.push(format!("Previous context: {}", entry.user_message));
                    lines.push(format!("Previous response: {}", entry.assistant_response));
                }
            }
        }

        lines.join("\n")
    }

    /// Forget a session's in-process history. Returns the number of entries removed.
    pub async fn clear_session(&self, session_id: &str) -> usize {
        let mut session = self.session.write().await;
        let before = session.len();
        session.retain(|e| e.session_id != session_id);
        before - session.len()
    }

    /// Remove a session from both session and persistent memory
    pub async fn purge_session(&self, session_id: &str) -> Result<usize> {
        let mut removed = self.clear_session(session_id).await;
        let mut persistent = self.persistent.write().await;
        let before = persistent.len();
        persistent.retain(|e| e.session_id != session_id);
        removed += before - persistent.len();
        self.save(&persistent).await?;
        Ok(removed)
    }

    /// Every entry known to the store, for profile extraction and export
    pub async fn all_entries(&self) -> Vec<MemoryEntry> {
        let session = self.session.read().await;
        let persistent = self.persistent.read().await;
        let mut seen = HashSet::new();
        session
            .iter()
            .chain(persistent.iter())
            .filter(|e| seen.insert(e.id.clone()))
            .cloned()
            .collect()
    }

    /// Details the user shared in this session or in persisted conversations
    pub async fn user_profile(&self, session_id: &str) -> UserProfile {
        let mut entries = self.session_history(session_id, None).await;
        let known: HashSet<String> = entries.iter().map(|e| e.id.clone()).collect();
        entries.extend(
            self.persistent
                .read()
                .await
                .iter()
                .filter(|e| !known.contains(&e.id))
                .cloned(),
        );
        extract_user_profile(&entries)
    }

    pub async fn stats(&self) -> MemoryStats {
        let session = self.session.read().await;
        let persistent = self.persistent.read().await;
        let hour_ago = Utc::now() - Duration::hours(1);

        MemoryStats {
            total_current_session_memories: session.len(),
            total_persistent_memories: persistent.len(),
            recent_interactions_last_hour: session.iter().filter(|e| e.timestamp > hour_ago).count(),
            unique_sessions: session
                .iter()
                .map(|e| e.session_id.as_str())
                .collect::<HashSet<_>>()
                .len(),
            memory_enabled: self.settings.enable_cross_session,
            max_history_limit: self.settings.max_history,
        }
    }

    /// Write all entries to `path` as JSON. Returns the number written.
    pub async fn export(&self, path: &Path) -> Result<usize> {
        let entries = self.all_entries().await;
        let json = serde_json::to_string_pretty(&entries)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, json)
            .await
            .map_err(|e| MemoryError::PersistFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(entries.len())
    }

    /// Merge entries from a JSON export into persistent memory. Returns the number added.
    pub async fn import(&self, path: &Path) -> Result<usize> {
        let imported = read_entries(path).await?;

        let mut persistent = self.persistent.write().await;
        let known: HashSet<String> = persistent.iter().map(|e| e.id.clone()).collect();
        let before = persistent.len();
        persistent.extend(imported.into_iter().filter(|e| !known.contains(&e.id)));
        let added = persistent.len() - before;
        trim_to_newest(&mut persistent, self.settings.max_history);
        self.save(&persistent).await?;

        tracing::info!("Imported {} memories from {}", added, path.display());
        Ok(added)
    }

    async fn save(&self, entries: &[MemoryEntry]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.file_path, json)
            .await
            .map_err(|e| MemoryError::PersistFailed {
                path: self.file_path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}

/// Oldest timestamp a session entry may carry, or `None` when the timeout
/// is too long to represent and nothing expires
fn session_cutoff(now: DateTime<Utc>, timeout_secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(timeout_secs).ok()?;
    now.checked_sub_signed(Duration::try_seconds(secs)?)
}

fn relevance(query: &str, query_words: &HashSet<&str>, entry: &MemoryEntry) -> f64 {
    let user = entry.user_message.to_lowercase();
    let response = entry.assistant_response.to_lowercase();

    let mut score = 0.0;
    if user.contains(query) {
        score += 1.0;
    }
    if response.contains(query) {
        score += 0.5;
    }

    let entry_words: HashSet<&str> = user
        .split_whitespace()
        .chain(response.split_whitespace())
        .collect();
    score += query_words.intersection(&entry_words).count() as f64 * 0.1;
    score
}

/// Keep the `max` newest entries in chronological order
fn trim_to_newest(entries: &mut Vec<MemoryEntry>, max: usize) {
    entries.sort_by_key(|e| e.timestamp);
    if entries.len() > max {
        let excess = entries.len() - max;
        entries.drain(..excess);
    }
}

async fn read_entries(path: &Path) -> Result<Vec<MemoryEntry>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| MemoryError::LoadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    serde_json::from_str(&content).map_err(|e| {
        MemoryError::LoadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> MemorySettings {
        MemorySettings {
            memory_dir: dir.path().join("memory"),
            ..Default::default()
        }
    }

    async fn add(store: &MemoryStore, user: &str, assistant: &str, session: &str) -> MemoryEntry {
        store
            .add_interaction(user, assistant, session, HashMap::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn persists_and_reloads_interactions() {
        let dir = TempDir::new().unwrap();
        {
            let store = MemoryStore::open(settings(&dir)).await.unwrap();
            add(&store, "What is Rust?", "A systems language.", "s1").await;
        }

        let reopened = MemoryStore::open(settings(&dir)).await.unwrap();
        let stats = reopened.stats().await;
        assert_eq!(stats.total_persistent_memories, 1);
        assert_eq!(stats.total_current_session_memories, 0);
        assert!(dir.path().join("memory").join(MEMORY_FILE).exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        let memory_dir = dir.path().join("memory");
        std::fs::create_dir_all(&memory_dir).unwrap();
        std::fs::write(memory_dir.join(MEMORY_FILE), "{not json").unwrap();

        let store = MemoryStore::open(settings(&dir)).await.unwrap();
        assert_eq!(store.stats().await.total_persistent_memories, 0);
    }

    #[tokio::test]
    async fn persistent_memory_keeps_newest_entries() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(MemorySettings {
            max_history: 2,
            ..settings(&dir)
        })
        .await
        .unwrap();

        add(&store, "first", "one", "s1").await;
        add(&store, "second", "two", "s1").await;
        add(&store, "third", "three", "s1").await;

        let all = store.persistent.read().await.clone();
        let users: Vec<&str> = all.iter().map(|e| e.user_message.as_str()).collect();
        assert_eq!(users, vec!["second", "third"]);
    }

    #[tokio::test]
    async fn cross_session_disabled_skips_persistence() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(MemorySettings {
            enable_cross_session: false,
            ..settings(&dir)
        })
        .await
        .unwrap();

        add(&store, "hello", "hi", "s1").await;
        assert_eq!(store.stats().await.total_persistent_memories, 0);
        assert_eq!(store.session_history("s1", None).await.len(), 1);
    }

    #[tokio::test]
    async fn search_scores_and_deduplicates() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(settings(&dir)).await.unwrap();

        add(&store, "tell me about tokio runtime", "It schedules tasks.", "s1").await;
        add(&store, "what about async", "tokio is an async runtime", "s1").await;
        add(&store, "weather today", "Sunny.", "s1").await;

        let hits = store.search("tokio", 5).await;
        // each entry lives in both session and persistent memory
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].user_message, "tell me about tokio runtime");
        assert_eq!(hits[1].user_message, "what about async");

        assert!(store.search("", 5).await.is_empty());
        assert!(store.search("volcano", 5).await.is_empty());
    }

    #[tokio::test]
    async fn session_history_returns_latest_turns() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(settings(&dir)).await.unwrap();
        for i in 0..5 {
            add(&store, &format!("q{}", i), &format!("a{}", i), "s1").await;
        }
        add(&store, "other", "session", "s2").await;

        let history = store.session_history("s1", Some(2)).await;
        let users: Vec<&str> = history.iter().map(|e| e.user_message.as_str()).collect();
        assert_eq!(users, vec!["q3", "q4"]);
        assert_eq!(store.clear_session("s1").await, 5);
        assert!(store.session_history("s1", None).await.is_empty());
    }

    #[tokio::test]
    async fn context_includes_other_sessions_only_when_relevant() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(settings(&dir)).await.unwrap();

        add(&store, "I love hiking trails", "Great hobby!", "old").await;
        add(&store, "hiking gear advice", "Get boots.", "current").await;

        let context = store.context_for_query("hiking", "current").await;
        assert!(context.starts_with("Recent conversation:\nUser: hiking gear advice"));
        assert!(context.contains("\nRelevant past conversations:"));
        assert!(context.contains("Previous context: I love hiking trails"));
        assert!(!context.contains("Previous context: hiking gear advice"));

        let unrelated = store.context_for_query("quantum", "current").await;
        assert!(!unrelated.contains("Relevant past conversations"));

        assert_eq!(store.context_for_query("quantum", "fresh").await, "");
    }

    #[tokio::test]
    async fn export_then_import_merges_by_id() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(settings(&dir)).await.unwrap();
        add(&store, "keep me", "kept", "s1").await;

        let export_path = dir.path().join("backup").join("memories.json");
        assert_eq!(store.export(&export_path).await.unwrap(), 1);

        let other_dir = TempDir::new().unwrap();
        let other = MemoryStore::open(settings(&other_dir)).await.unwrap();
        assert_eq!(other.import(&export_path).await.unwrap(), 1);
        assert_eq!(other.import(&export_path).await.unwrap(), 0);
        assert_eq!(other.stats().await.total_persistent_memories, 1);
    }

    #[tokio::test]
    async fn expired_session_entries_are_dropped_on_next_add() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(MemorySettings {
            session_timeout_secs: 60,
            ..settings(&dir)
        })
        .await
        .unwrap();

        add(&store, "old question", "old answer", "s1").await;
        store.session.write().await[0].timestamp = Utc::now() - Duration::hours(2);
        add(&store, "new question", "new answer", "s1").await;

        let history = store.session_history("s1", None).await;
        let users: Vec<&str> = history.iter().map(|e| e.user_message.as_str()).collect();
        assert_eq!(users, vec!["new question"]);
        assert_eq!(store.stats().await.total_persistent_memories, 2);
    }

    #[tokio::test]
    async fn huge_session_timeouts_never_expire() {
        for timeout in [10_000_000_000_000_000, i64::MAX as u64, u64::MAX] {
            let dir = TempDir::new().unwrap();
            let store = MemoryStore::open(MemorySettings {
                session_timeout_secs: timeout,
                ..settings(&dir)
            })
            .await
            .unwrap();

            add(&store, "first", "one", "s").await;
            add(&store, "second", "two", "s").await;
            assert_eq!(store.session_history("s", None).await.len(), 2, "timeout {}", timeout);
        }
    }

    #[test]
    fn session_cutoff_handles_range_limits() {
        let now = Utc::now();
        assert_eq!(session_cutoff(now, 60), Some(now - Duration::seconds(60)));
        assert_eq!(session_cutoff(now, 0), Some(now));
        assert_eq!(session_cutoff(now, u64::MAX), None);
        assert_eq!(session_cutoff(now, 10_000_000_000_000_000), None);
    }

    #[tokio::test]
    async fn purge_removes_persisted_session() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(settings(&dir)).await.unwrap();
        add(&store, "a", "b", "s1").await;
        add(&store, "c", "d", "s2").await;

        add(&store, "my name is bob", "Hi Bob", "s2").await;
        assert_eq!(store.user_profile("s2").await.name.as_deref(), Some("Bob"));

        assert_eq!(store.purge_session("s1").await.unwrap(), 2);
        let stats = store.stats().await;
        assert_eq!(stats.total_persistent_memories, 2);
        assert_eq!(stats.unique_sessions, 1);
    }
}
