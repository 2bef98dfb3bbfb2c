//! Search, then scrape the most relevant result pages

use crate::error::Result;
use crate::impl_tool_factory;
use crate::scraper::extract_urls;
use crate::tools::{Tool, ToolCall, ToolExample, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashSet;
use tracing::info;

use super::delegate::HelperAgents;
use super::search_google::query_schema;

const MAX_SCRAPE_URLS: usize = 3;

/// Tool combining the search agent's summary with a scrape of the top pages
pub struct SearchAndScrapeTool {
    agents: HelperAgents,
}

impl SearchAndScrapeTool {
    pub fn new(agents: HelperAgents) -> Self {
        Self { agents }
    }
}

/// Up to three URLs worth scraping from a search reply
///
/// URLs found anywhere in the text come first, followed by the lines of a
/// `SCRAPABLE_URLS:` section.
pub fn urls_from_search_result(text: &str) -> Vec<String> {
    let mut urls = extract_urls(text);
    if let Some((_, section)) = text.split_once("SCRAPABLE_URLS:") {
        urls.extend(
            section
                .lines()
                .map(str::trim)
                .filter(|line| line.starts_with("http"))
                .map(str::to_string),
        );
    }

    let mut seen = HashSet::new();
    urls.retain(|url| seen.insert(url.clone()));
    urls.truncate(MAX_SCRAPE_URLS);
    urls
}

#[async_trait]
impl Tool for SearchAndScrapeTool {
    fn name(&self) -> &str {
        "search_and_scrape"
    }

    fn description(&self) -> &str {
        "Search Google and then scrape the top results for comprehensive information. \
         Use it when the user asks for current information that needs page content."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        query_schema("What to search for and read about")
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let query: String = call.get_parameter("query")?;

        let search_result = match self.agents.search(&query).await {
            Ok(reply) => format!("🔍 {}", reply),
            Err(e) => {
                return Ok(ToolResult::error(
                    call.id,
                    format!(
                        "❌ Search and scrape failed: {}. Make sure both Google Search Agent (port {}) and Web Scraper Agent (port {}) are running.",
                        e,
                        self.agents.search_port(),
                        self.agents.scraper_port()
                    ),
                ))
            }
        };

        let urls = urls_from_search_result(&search_result);
        if urls.is_empty() {
            return Ok(ToolResult::success(
                call.id,
                format!(
                    "{}\n\n⚠️ No URLs found for scraping. Search results only.",
                    search_result
                ),
            ));
        }

        info!("Scraping {} URL(s) from search results", urls.len());
        let scrape_result = match self.agents.scrape(&urls).await {
            Ok(reply) => reply,
            Err(e) => format!(
                "❌ Web scraping failed: {}. Make sure the Web Scraper Agent is running on port {}.",
                e,
                self.agents.scraper_port()
            ),
        };

        Ok(ToolResult::success(
            call.id,
            format!(
                "{}\n\n🌐 **Detailed Content Analysis:**\n\n{}",
                search_result, scrape_result
            ),
        ))
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample {
            description: "Research a current topic in depth".to_string(),
            parameters: json!({"query": "what's new in the latest tokio release"}),
            expected_result: "Search summary followed by an analysis of the top pages".to_string(),
        }]
    }
}

impl_tool_factory!(
    SearchAndScrapeToolFactory,
    SearchAndScrapeTool,
    "search_and_scrape",
    "Search Google and scrape the top results through the helper agents"
);
