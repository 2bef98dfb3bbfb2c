//! Web search through the search agent

use crate::error::Result;
use crate::impl_tool_factory;
use crate::tools::{Tool, ToolCall, ToolExample, ToolResult};
use async_trait::async_trait;
use serde_json::json;

use super::delegate::HelperAgents;

/// Tool returning the search agent's summary of Google results
pub struct SearchGoogleTool {
    agents: HelperAgents,
}

impl SearchGoogleTool {
    pub fn new(agents: HelperAgents) -> Self {
        Self { agents }
    }
}

pub(crate) fn query_schema(description: &str) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": description
            }
        },
        "required": ["query"]
    })
}

#[async_trait]
impl Tool for SearchGoogleTool {
    fn name(&self) -> &str {
        "search_google"
    }

    fn description(&self) -> &str {
        "Search Google using the Google Search Agent. Returns a summary of the top results \
         with their links. Use it for simple searches when the user asks for current information."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        query_schema("What to search for")
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let query: String = call.get_parameter("query")?;
        match self.agents.search(&query).await {
            Ok(reply) => Ok(ToolResult::success(call.id, format!("🔍 {}", reply))),
            Err(e) => Ok(ToolResult::error(
                call.id,
                format!(
                    "❌ Search failed: {}. Make sure the Google Search Agent is running on port {} and properly configured as an A2A server.",
                    e,
                    self.agents.search_port()
                ),
            )),
        }
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample {
            description: "Look up recent news".to_string(),
            parameters: json!({"query": "latest Rust release"}),
            expected_result: "Summarized search results with links".to_string(),
        }]
    }
}

impl_tool_factory!(
    SearchGoogleToolFactory,
    SearchGoogleTool,
    "search_google",
    "Search Google through the search agent"
);
