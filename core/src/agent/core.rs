//! ChatAgent implementation

use crate::agent::execution::ChatReply;
use crate::agent::prompt::{build_system_prompt, BASE_INSTRUCTION};
use crate::config::{AgentSettings, Settings};
use crate::error::{AgentError, Result};
use crate::llm::{create_client, ChatOptions, ContentBlock, LlmClient, LlmMessage};
use crate::memory::MemoryStore;
use crate::tools::{ToolCall, ToolExecutor, ToolRegistry, ToolResult};
use crate::util::{estimate_token_count, sanitize_input};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The conversational agent behind the CLI and the web interface
pub struct ChatAgent {
    llm_client: Arc<dyn LlmClient>,
    tool_executor: ToolExecutor,
    memory: Option<Arc<MemoryStore>>,
    config: AgentSettings,
    max_input_length: usize,
    options: ChatOptions,
}

impl ChatAgent {
    pub fn new(
        llm_client: Arc<dyn LlmClient>,
        tool_executor: ToolExecutor,
        memory: Option<Arc<MemoryStore>>,
        settings: &Settings,
    ) -> Self {
        Self {
            llm_client,
            tool_executor,
            memory,
            config: settings.agent.clone(),
            max_input_length: settings.security.max_input_length,
            options: ChatOptions::from(&settings.ollama.to_llm_config().params),
        }
    }

    /// Build the agent against the local Ollama model with the delegation,
    /// status and memory tools
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let llm_client = create_client(&settings.ollama.to_llm_config())?;
        let memory = if settings.agent.enable_memory {
            Some(Arc::new(MemoryStore::open(settings.memory.clone()).await?))
        } else {
            None
        };
        let tool_executor =
            ToolRegistry::for_agent(settings, memory.clone()).create_executor_with_all();

        info!(
            "Chat agent ready: model {}, tools [{}], memory {}",
            llm_client.model_name(),
            tool_executor.list_tools().join(", "),
            if memory.is_some() { "enabled" } else { "disabled" }
        );
        Ok(Self::new(llm_client, tool_executor, memory, settings))
    }

    pub fn memory(&self) -> Option<&Arc<MemoryStore>> {
        self.memory.as_ref()
    }

    pub fn model_name(&self) -> &str {
        self.llm_client.model_name()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_executor.list_tools()
    }

    /// Answer one user message within `session_id`
    pub async fn reply(&self, session_id: &str, user_text: &str) -> Result<ChatReply> {
        let start_time = Instant::now();
        let text = self.validate_input(user_text)?;

        let (context, profile) = match &self.memory {
            Some(memory) => {
                let context = memory.context_for_query(&text, session_id).await;
                let profile = memory.user_profile(session_id).await;
                let profile = if profile.is_empty() {
                    String::new()
                } else {
                    profile.summary()
                };
                (context, profile)
            }
            None => (String::new(), String::new()),
        };
        let memory_context_used = !context.is_empty() || !profile.is_empty();

        let instruction = self
            .config
            .system_prompt
            .as_deref()
            .unwrap_or(BASE_INSTRUCTION);
        let system_prompt = build_system_prompt(instruction, &context, &profile)?;
        debug!(
            "Prompt for session {}: ~{} tokens",
            session_id,
            estimate_token_count(&system_prompt) + estimate_token_count(&text)
        );
        let mut messages = vec![LlmMessage::system(system_prompt), LlmMessage::user(text.clone())];

        let (answer, steps, tools_used) = self.run_steps(session_id, &mut messages).await?;
        let duration_ms = start_time.elapsed().as_millis() as u64;

        if let Some(memory) = &self.memory {
            let metadata = HashMap::from([
                ("model".to_string(), json!(self.model_name())),
                ("response_time_ms".to_string(), json!(duration_ms)),
                ("tools_used".to_string(), json!(tools_used)),
                ("memory_enhanced".to_string(), json!(memory_context_used)),
            ]);
            if let Err(e) = memory
                .add_interaction(&text, &answer, session_id, metadata)
                .await
            {
                warn!("Failed to save interaction to memory: {}", e);
            }
        }

        Ok(ChatReply {
            text: answer,
            steps,
            tools_used,
            duration_ms,
            memory_context_used,
            model: self.model_name().to_string(),
        })
    }

    fn validate_input(&self, user_text: &str) -> Result<String> {
        let text = sanitize_input(user_text);
        if text.is_empty() {
            return Err(AgentError::InvalidInput {
                message: "Please enter a message.".to_string(),
            }
            .into());
        }
        let length = text.chars().count();
        if length > self.max_input_length {
            return Err(AgentError::InputTooLong {
                length,
                max: self.max_input_length,
            }
            .into());
        }
        Ok(text)
    }

    /// Call the model until it answers in text, running requested tools in between
    ///
    /// The last step is offered no tools so the model has to answer.
    async fn run_steps(
        &self,
        session_id: &str,
        messages: &mut Vec<LlmMessage>,
    ) -> Result<(String, usize, Vec<String>)> {
        let max_steps = self.config.max_steps.max(1);
        let tool_definitions = self.tool_executor.get_tool_definitions();
        let mut tools_used: Vec<String> = Vec::new();

        for step in 1..=max_steps {
            let last_step = step == max_steps;
            let tools = (!last_step && !tool_definitions.is_empty()).then(|| tool_definitions.clone());

            debug!("Step {}/{}: calling {}", step, max_steps, self.model_name());
            let response = self
                .llm_client
                .chat_completion(messages.clone(), tools, Some(self.options.clone()))
                .await?;

            if !last_step && response.message.has_tool_use() {
                let calls: Vec<ToolCall> = response
                    .message
                    .get_tool_uses()
                    .into_iter()
                    .filter_map(|block| match block {
                        ContentBlock::ToolUse { id, name, input } => {
                            Some(
                                ToolCall::with_id(id.as_str(), name.as_str(), input.clone())
                                    .in_session(session_id),
                            )
                        }
                        _ => None,
                    })
                    .collect();
                messages.push(response.message);

                for call in calls {
                    if !tools_used.contains(&call.name) {
                        tools_used.push(call.name.clone());
                    }
                    let call_id = call.id.clone();
                    let result = match self.tool_executor.execute(call).await {
                        Ok(result) => result,
                        Err(e) => ToolResult::error(call_id.as_str(), e.to_string().as_str()),
                    };
                    debug!(
                        "Tool result for {} ({} ms, success: {})",
                        call_id,
                        result.duration_ms.unwrap_or_default(),
                        result.success
                    );
                    messages.push(LlmMessage::tool_result(
                        &call_id,
                        result.content,
                        !result.success,
                    ));
                }
                continue;
            }

            match response.message.get_text() {
                Some(text) if !text.trim().is_empty() => return Ok((text, step, tools_used)),
                _ => break,
            }
        }

        Err(AgentError::NoResponse { steps: max_steps }.into())
    }
}
