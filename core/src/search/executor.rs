//! The search agent: Google results summarized by the local model

use crate::a2a::{AgentCapabilities, AgentCard, AgentExecutor, AgentSkill, EventQueue, RequestContext};
use crate::a2a::types::PROTOCOL_VERSION;
use crate::config::{EndpointSettings, Settings};
use crate::error::Result;
use crate::llm::{create_client, ChatOptions, LlmClient, LlmMessage};
use crate::util::render_template;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::google::{GoogleSearchClient, SearchResult};
use super::query::extract_search_query;

/// Links offered for scraping when the summary does not list any
const SCRAPABLE_LINKS: usize = 3;

const SUMMARY_PROMPT: &str = r#"You are a helpful search assistant. Summarize these search results in a clear, informative way:

Search query: {{query}}

Search results:
{{results}}

Please provide:
1. A brief summary of what was found
2. Key information from the search results
3. The most relevant links

Format your response to be helpful and easy to read.

IMPORTANT: At the end, include a section called "SCRAPABLE_URLS:" followed by the URLs that would be good for web scraping to get more detailed information. List each URL on a new line."#;

pub struct SearchAgentExecutor {
    search: Option<GoogleSearchClient>,
    llm: Arc<dyn LlmClient>,
    options: ChatOptions,
}

impl SearchAgentExecutor {
    pub fn new(search: Option<GoogleSearchClient>, llm: Arc<dyn LlmClient>, options: ChatOptions) -> Self {
        Self {
            search,
            llm,
            options,
        }
    }

    /// Build the executor from settings
    ///
    /// Missing Google credentials are not fatal: the agent still starts and
    /// answers every request with a configuration error.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let search = match GoogleSearchClient::new(&settings.search) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("{}. The search agent will return error messages.", e);
                None
            }
        };
        let llm_config = settings.search_llm_config();
        let llm = create_client(&llm_config)?;
        Ok(Self::new(search, llm, ChatOptions::from(&llm_config.params)))
    }

    async fn respond(&self, text: &str) -> String {
        let query = extract_search_query(text);
        if query.is_empty() {
            return "❌ No search query provided. Please specify what you want to search for."
                .to_string();
        }

        let Some(search) = &self.search else {
            return "❌ Google Search is not configured. Missing GOOGLE_SEARCH_API_KEY or GOOGLE_SEARCH_ENGINE_ID."
                .to_string();
        };

        info!("Searching Google for '{}'", query);
        let results = match search.search(&query).await {
            Ok(response) => response.results,
            Err(e) => {
                error!("Google search failed: {}", e);
                return format!("❌ Search failed: {}", e);
            }
        };

        if results.is_empty() {
            return format!(
                "🔍 No search results found for '{}'. This might be due to API configuration issues or the query being too specific.",
                query
            );
        }

        match self.summarize(&query, &results).await {
            Ok(summary) => format!(
                "🔍 **Search Results for '{}':**\n\n{}",
                query,
                with_scrapable_urls(summary, &results)
            ),
            Err(e) => {
                error!("Error formatting results with the model: {}", e);
                simple_format(&query, &results)
            }
        }
    }

    async fn summarize(&self, query: &str, results: &[SearchResult]) -> Result<String> {
        let results_text: String = results
            .iter()
            .enumerate()
            .map(|(i, r)| format!("\n{}. **{}**\n   URL: {}\n   {}\n", i + 1, r.title, r.link, r.snippet))
            .collect();
        let prompt = render_template(
            SUMMARY_PROMPT,
            &json!({ "query": query, "results": results_text }),
        )?;

        let response = self
            .llm
            .chat_completion(vec![LlmMessage::user(prompt)], None, Some(self.options.clone()))
            .await?;

        match response.message.get_text() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err("The model returned an empty summary".into()),
        }
    }
}

#[async_trait]
impl AgentExecutor for SearchAgentExecutor {
    async fn execute(&self, ctx: &RequestContext, queue: &EventQueue) -> Result<()> {
        let reply = self.respond(&ctx.user_text()).await;
        queue.enqueue_text(reply);
        Ok(())
    }

    async fn cancel(&self, _ctx: &RequestContext, queue: &EventQueue) -> Result<()> {
        queue.enqueue_text("🛑 Search operation cancelled.");
        Ok(())
    }
}

/// Append a `SCRAPABLE_URLS:` section with the top links when the summary has none
fn with_scrapable_urls(summary: String, results: &[SearchResult]) -> String {
    if summary.contains("SCRAPABLE_URLS:") {
        return summary;
    }
    let links: Vec<&str> = results
        .iter()
        .take(SCRAPABLE_LINKS)
        .map(|r| r.link.as_str())
        .collect();
    format!("{}\n\nSCRAPABLE_URLS:\n{}", summary.trim_end(), links.join("\n"))
}

/// Plain listing used when the model is unavailable
fn simple_format(query: &str, results: &[SearchResult]) -> String {
    let mut formatted = format!("🔍 **Search Results for '{}':**\n\n", query);
    for (i, result) in results.iter().enumerate() {
        formatted.push_str(&format!(
            "**{}. {}**\n🔗 {}\n📄 {}\n\n",
            i + 1,
            result.title,
            result.link,
            result.snippet
        ));
    }
    formatted.push_str("\n**SCRAPABLE_URLS:**\n");
    for result in results.iter().take(SCRAPABLE_LINKS) {
        formatted.push_str(&result.link);
        formatted.push('\n');
    }
    formatted
}

/// Card published by the search agent
pub fn search_agent_card(endpoints: &EndpointSettings) -> AgentCard {
    AgentCard {
        name: "Google Search Agent".to_string(),
        description: "Specialized agent for performing Google web searches and retrieving current information"
            .to_string(),
        url: format!("{}/", endpoints.search_url().trim_end_matches('/')),
        version: "1.0.0".to_string(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        default_input_modes: vec!["text".to_string()],
        default_output_modes: vec!["text".to_string()],
        capabilities: AgentCapabilities { streaming: true },
        skills: vec![AgentSkill::new(
            "google_search",
            "Google Search",
            "Performs Google web searches and returns current information from the internet",
            &["search", "web", "google", "current", "internet"],
            &[
                "Search for artificial intelligence",
                "Find information about Python programming",
                "What is the latest news about climate change?",
                "Search for restaurant reviews in San Francisco",
            ],
        )],
    }
}
