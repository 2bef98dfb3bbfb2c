//! Tool trait and the executor the agent loop dispatches through

use crate::error::{Result, ToolError};
use crate::llm::{FunctionDefinition, ToolDefinition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Something the model can call by name
#[async_trait]
pub trait Tool: Send + Sync {
    /// Function name advertised to the model
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(&self, call: ToolCall) -> Result<ToolResult>;

    /// Sample invocations, shown by `agentmesh tools`
    fn examples(&self) -> Vec<ToolExample> {
        Vec::new()
    }
}

/// A function call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Arguments object as sent by the model
    pub parameters: serde_json::Value,
    /// Conversation the call belongs to, set by the agent loop
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Outcome of one tool call, fed back to the model as a tool message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub success: bool,
    pub content: String,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExample {
    pub description: String,
    pub parameters: serde_json::Value,
    pub expected_result: String,
}

/// Tools keyed by name
pub struct ToolExecutor {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolCall {
    /// Call with a freshly generated id
    pub fn new<S: Into<String>>(name: S, parameters: serde_json::Value) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name.into(), parameters)
    }

    /// Call with the id the model assigned to it
    pub fn with_id<S: Into<String>>(id: S, name: S, parameters: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parameters,
            session_id: None,
        }
    }

    pub fn in_session(self, session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..self
        }
    }

    /// Deserialize one argument, failing on a missing key or wrong type
    pub fn get_parameter<T>(&self, key: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let Some(raw) = self.parameters.get(key) else {
            return Err(ToolError::InvalidParameters {
                message: format!("Missing parameter: {}", key),
            }
            .into());
        };
        T::deserialize(raw).map_err(|_| {
            ToolError::InvalidParameters {
                message: format!("Invalid parameter type for: {}", key),
            }
            .into()
        })
    }
}

impl ToolResult {
    pub fn success(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            success: true,
            content: content.into(),
            duration_ms: None,
        }
    }

    /// Failed call; the content is prefixed with `Error: ` for the model
    pub fn error(tool_call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            success: false,
            content: format!("Error: {}", error.into()),
            duration_ms: None,
        }
    }

    pub fn with_duration(self, duration_ms: u64) -> Self {
        Self {
            duration_ms: Some(duration_ms),
            ..self
        }
    }
}

impl ToolExecutor {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Add a tool, replacing any tool of the same name
    pub fn register_tool(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get_tool(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(Box::as_ref)
    }

    /// Registered tool names in sorted order
    pub fn list_tools(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run a call and time it
    ///
    /// Unknown tools are an error; failures inside a tool become error results.
    pub async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let Some(tool) = self.get_tool(&call.name) else {
            return Err(ToolError::NotFound { name: call.name }.into());
        };

        debug!("Executing tool {} ({})", call.name, call.id);
        let started = Instant::now();
        let call_id = call.id.clone();
        let outcome = tool.execute(call).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        Ok(match outcome {
            Ok(result) => result.with_duration(elapsed_ms),
            Err(e) => ToolResult::error(call_id, e.to_string()).with_duration(elapsed_ms),
        })
    }

    /// Function definitions advertised with every chat completion
    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.list_tools()
            .into_iter()
            .filter_map(|name| self.get_tool(name))
            .map(|tool| ToolDefinition {
                tool_type: "function".to_string(),
                function: FunctionDefinition {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    parameters: tool.parameters_schema(),
                },
            })
            .collect()
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}
