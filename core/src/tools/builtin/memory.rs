//! Tools that let the agent report its status and manage its own memory

use crate::config::Settings;
use crate::error::Result;
use crate::health::HealthReport;
use crate::impl_tool_factory;
use crate::memory::MemoryStore;
use crate::tools::{Tool, ToolCall, ToolExample, ToolResult};
use crate::util::format_timestamp;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

const AGENT_NAME: &str = "base_ai_agent";

/// Session used when a call arrives without one
const DEFAULT_SESSION: &str = "default_session";

const SEARCH_LIMIT: usize = 5;

/// Items of each profile list shown to the user
const PROFILE_ITEMS: usize = 3;

fn session_of(call: &ToolCall) -> &str {
    call.session_id.as_deref().unwrap_or(DEFAULT_SESSION)
}

fn no_parameters() -> serde_json::Value {
    json!({"type": "object", "properties": {}})
}

/// What the status tool reports on
#[derive(Clone)]
pub struct StatusSource {
    pub settings: Arc<Settings>,
    pub memory: Option<Arc<MemoryStore>>,
}

/// Tool reporting Ollama, memory and configuration health
pub struct AgentStatusTool {
    source: StatusSource,
}

impl AgentStatusTool {
    pub fn new(source: StatusSource) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for AgentStatusTool {
    fn name(&self) -> &str {
        "get_agent_status"
    }

    fn description(&self) -> &str {
        "Get the current status of the agent: model, Ollama availability, memory statistics \
         and configuration problems."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        no_parameters()
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let settings = &self.source.settings;
        let report = HealthReport::collect(settings, self.source.memory.as_deref()).await;
        let status = json!({
            "system": {
                "agent_name": AGENT_NAME,
                "version": report.version,
                "model": settings.ollama.default_model,
                "memory_enabled": self.source.memory.is_some(),
                "uptime": "Available since session start",
            },
            "ollama": report.ollama,
            "memory": report.memory,
            "configuration": report.configuration,
            "timestamp": report.timestamp,
            "healthy": report.is_healthy(),
        });
        let output = serde_json::to_string_pretty(&status)?;
        Ok(ToolResult::success(call.id, output))
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample {
            description: "Check whether the agent is healthy".to_string(),
            parameters: json!({}),
            expected_result: "JSON status with system, ollama, memory and configuration sections"
                .to_string(),
        }]
    }
}

impl_tool_factory!(
    AgentStatusToolFactory,
    AgentStatusTool,
    StatusSource,
    "get_agent_status",
    "Report the agent's model, Ollama, memory and configuration status"
);

/// Tool saving something the user asked the agent to remember
pub struct RememberInformationTool {
    memory: Arc<MemoryStore>,
}

impl RememberInformationTool {
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for RememberInformationTool {
    fn name(&self) -> &str {
        "remember_information"
    }

    fn description(&self) -> &str {
        "Save important information to memory so it can be recalled in later conversations. \
         Use it when the user explicitly asks you to remember something."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "information": {
                    "type": "string",
                    "description": "The information to remember"
                }
            },
            "required": ["information"]
        })
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let information: String = call.get_parameter("information")?;
        let metadata = HashMap::from([
            ("type".to_string(), json!("manual_memory")),
            ("importance".to_string(), json!("high")),
        ]);
        let saved = self
            .memory
            .add_interaction(
                &format!("User wants to remember: {}", information),
                &format!("I've saved this information: {}", information),
                session_of(&call),
                metadata,
            )
            .await;

        let output = match saved {
            Ok(_) => format!(
                "I've successfully saved this information to my memory: {}",
                information
            ),
            Err(e) => {
                tracing::error!("Error saving to memory: {}", e);
                "I had trouble saving that information, but I'll try to remember it for this conversation."
                    .to_string()
            }
        };
        Ok(ToolResult::success(call.id, output))
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample {
            description: "Keep a fact for later sessions".to_string(),
            parameters: json!({"information": "My project deadline is March 3rd"}),
            expected_result: "Confirmation that the information was saved".to_string(),
        }]
    }
}

impl_tool_factory!(
    RememberInformationToolFactory,
    RememberInformationTool,
    Arc<MemoryStore>,
    "remember_information",
    "Save information the user wants remembered"
);

/// Tool searching past conversations
pub struct SearchMyMemoryTool {
    memory: Arc<MemoryStore>,
}

impl SearchMyMemoryTool {
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for SearchMyMemoryTool {
    fn name(&self) -> &str {
        "search_my_memory"
    }

    fn description(&self) -> &str {
        "Search memory for past conversations about a topic. Use it when the user refers to \
         something discussed before."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        super::search_google::query_schema("What to look for in past conversations")
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let query: String = call.get_parameter("query")?;
        let memories = self.memory.search(&query, SEARCH_LIMIT).await;

        if memories.is_empty() {
            return Ok(ToolResult::success(
                call.id,
                format!(
                    "I don't have any relevant memories about '{}'. This might be the first time we've discussed this topic.",
                    query
                ),
            ));
        }

        let mut lines = vec![format!(
            "Here's what I found in my memory about '{}':\n",
            query
        )];
        for memory in &memories {
            lines.push(format!(
                "From our conversation on {}:",
                format_timestamp(memory.timestamp)
            ));
            lines.push(format!("User: {}", memory.user_message));
            lines.push(format!("Me: {}", memory.assistant_response));
            lines.push("---".to_string());
        }
        Ok(ToolResult::success(call.id, lines.join("\n")))
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample {
            description: "Recall an earlier discussion".to_string(),
            parameters: json!({"query": "deadline"}),
            expected_result: "Matching past exchanges with their dates".to_string(),
        }]
    }
}

impl_tool_factory!(
    SearchMyMemoryToolFactory,
    SearchMyMemoryTool,
    Arc<MemoryStore>,
    "search_my_memory",
    "Search past conversations"
);

/// Tool describing what the agent knows about the user
pub struct UserProfileTool {
    memory: Arc<MemoryStore>,
}

impl UserProfileTool {
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for UserProfileTool {
    fn name(&self) -> &str {
        "get_user_profile"
    }

    fn description(&self) -> &str {
        "Get what is known about the user (name, preferences, interests) from past conversations."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        no_parameters()
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let profile = self.memory.user_profile(session_of(&call)).await;

        let mut lines = Vec::new();
        if let Some(name) = &profile.name {
            lines.push(format!("Name: {}", name));
        }
        if !profile.preferences.is_empty() {
            let shown: Vec<&str> = profile
                .preferences
                .iter()
                .take(PROFILE_ITEMS)
                .map(String::as_str)
                .collect();
            lines.push(format!("Preferences: {}", shown.join(", ")));
        }
        if !profile.interests.is_empty() {
            let shown: Vec<&str> = profile
                .interests
                .iter()
                .take(PROFILE_ITEMS)
                .map(String::as_str)
                .collect();
            lines.push(format!("Interests: {}", shown.join(", ")));
        }

        let output = if lines.is_empty() {
            "I don't have specific profile information yet. Feel free to share more about yourself!"
                .to_string()
        } else {
            format!(
                "Based on our conversations, here's what I know about you:\n{}",
                lines.join("\n")
            )
        };
        Ok(ToolResult::success(call.id, output))
    }
}

impl_tool_factory!(
    UserProfileToolFactory,
    UserProfileTool,
    Arc<MemoryStore>,
    "get_user_profile",
    "Describe what is known about the user"
);

/// Tool forgetting the current session's history
pub struct ClearMyMemoryTool {
    memory: Arc<MemoryStore>,
}

impl ClearMyMemoryTool {
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for ClearMyMemoryTool {
    fn name(&self) -> &str {
        "clear_my_memory"
    }

    fn description(&self) -> &str {
        "Clear memory for the current session. Persistent memory from other sessions is kept. \
         Use it only when the user asks you to forget the conversation."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        no_parameters()
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let session_id = session_of(&call);
        let removed = self.memory.clear_session(session_id).await;
        tracing::info!("Cleared {} session memories for {}", removed, session_id);
        Ok(ToolResult::success(
            call.id,
            "I've cleared my memory for this session. My persistent memory across sessions remains intact.",
        ))
    }
}

impl_tool_factory!(
    ClearMyMemoryToolFactory,
    ClearMyMemoryTool,
    Arc<MemoryStore>,
    "clear_my_memory",
    "Forget the current session"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemorySettings;
    use tempfile::TempDir;

    async fn store_in(dir: &TempDir) -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::open(MemorySettings {
                memory_dir: dir.path().to_path_buf(),
                ..Default::default()
            })
            .await
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn remember_saves_a_tagged_entry_in_the_calling_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let tool = RememberInformationTool::new(store.clone());

        let call = ToolCall::new(
            "remember_information",
            json!({"information": "my cat is called Miso"}),
        )
        .in_session("s1");
        let result = tool.execute(call).await.unwrap();
        assert!(result.success);
        assert_eq!(
            result.content,
            "I've successfully saved this information to my memory: my cat is called Miso"
        );

        let history = store.session_history("s1", None).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].user_message, "User wants to remember: my cat is called Miso");
        assert_eq!(history[0].metadata["type"], "manual_memory");
        assert_eq!(history[0].metadata["importance"], "high");
    }

    #[tokio::test]
    async fn calls_without_a_session_use_the_default_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let tool = RememberInformationTool::new(store.clone());

        tool.execute(ToolCall::new("remember_information", json!({"information": "x"})))
            .await
            .unwrap();
        assert_eq!(store.session_history(DEFAULT_SESSION, None).await.len(), 1);
    }

    #[tokio::test]
    async fn memory_search_lists_matches_or_says_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        store
            .add_interaction("How do I pin a tokio version?", "Use =1.40", "s1", HashMap::new())
            .await
            .unwrap();
        let tool = SearchMyMemoryTool::new(store);

        let found = tool
            .execute(ToolCall::new("search_my_memory", json!({"query": "tokio"})))
            .await
            .unwrap();
        assert!(found
            .content
            .starts_with("Here's what I found in my memory about 'tokio':\n\nFrom our conversation on "));
        assert!(found.content.contains("User: How do I pin a tokio version?\nMe: Use =1.40\n---"));

        let missing = tool
            .execute(ToolCall::new("search_my_memory", json!({"query": "kubernetes"})))
            .await
            .unwrap();
        assert_eq!(
            missing.content,
            "I don't have any relevant memories about 'kubernetes'. This might be the first time we've discussed this topic."
        );
    }

    #[tokio::test]
    async fn profile_reports_known_details() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let tool = UserProfileTool::new(store.clone());

        let empty = tool
            .execute(ToolCall::new("get_user_profile", json!({})).in_session("s1"))
            .await
            .unwrap();
        assert_eq!(
            empty.content,
            "I don't have specific profile information yet. Feel free to share more about yourself!"
        );

        store
            .add_interaction("My name is Ada", "Nice to meet you", "s1", HashMap::new())
            .await
            .unwrap();
        let known = tool
            .execute(ToolCall::new("get_user_profile", json!({})).in_session("s1"))
            .await
            .unwrap();
        assert!(known
            .content
            .starts_with("Based on our conversations, here's what I know about you:\nName: Ada"));
    }

    #[tokio::test]
    async fn clearing_forgets_only_the_calling_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        store.add_interaction("a", "b", "s1", HashMap::new()).await.unwrap();
        store.add_interaction("c", "d", "s2", HashMap::new()).await.unwrap();
        let tool = ClearMyMemoryTool::new(store.clone());

        let result = tool
            .execute(ToolCall::new("clear_my_memory", json!({})).in_session("s1"))
            .await
            .unwrap();
        assert_eq!(
            result.content,
            "I've cleared my memory for this session. My persistent memory across sessions remains intact."
        );
        assert!(store.session_history("s1", None).await.is_empty());
        assert_eq!(store.session_history("s2", None).await.len(), 1);
        assert_eq!(store.stats().await.total_persistent_memories, 2);
    }

    #[tokio::test]
    async fn status_reports_an_unreachable_ollama_as_unhealthy() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.ollama.api_base = "http://127.0.0.1:9".to_string();
        let tool = AgentStatusTool::new(StatusSource {
            settings: Arc::new(settings),
            memory: Some(store_in(&dir).await),
        });

        let result = tool
            .execute(ToolCall::new("get_agent_status", json!({})))
            .await
            .unwrap();
        assert!(result.success);
        let status: serde_json::Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(status["system"]["agent_name"], AGENT_NAME);
        assert_eq!(status["system"]["memory_enabled"], true);
        assert_eq!(status["ollama"]["service_running"], false);
        assert_eq!(status["healthy"], false);
        assert!(status["memory"].is_object());
    }
}
