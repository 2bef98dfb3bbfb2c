//! The scraper agent: fetch pages concurrently and summarize them

use crate::a2a::types::PROTOCOL_VERSION;
use crate::a2a::{AgentCapabilities, AgentCard, AgentExecutor, AgentSkill, EventQueue, RequestContext};
use crate::config::{EndpointSettings, Settings};
use crate::error::Result;
use crate::llm::{create_client, ChatOptions, LlmClient, LlmMessage};
use crate::util::{render_template, truncate_text};
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use super::extract::extract_urls;
use super::fetch::{PageFetcher, ScrapeOutcome};

const PROMPT_PAGE_CHARS: usize = 1000;
const PREVIEW_CHARS: usize = 300;

const SUMMARY_PROMPT: &str = r#"You are a web content summarizer. Analyze the following scraped web content and provide a comprehensive summary:

{{content}}

Please provide:
1. A brief overview of the main topics covered
2. Key insights and important information from each source
3. A synthesis of the information across all sources
4. Relevant conclusions or takeaways

Format your response to be clear, informative, and well-structured with appropriate headings."#;

/// A successfully scraped page
struct Page<'a> {
    url: &'a str,
    title: &'a str,
    content: &'a str,
}

pub struct ScraperAgentExecutor {
    fetcher: PageFetcher,
    llm: Arc<dyn LlmClient>,
    options: ChatOptions,
    max_urls: usize,
}

impl ScraperAgentExecutor {
    pub fn new(
        fetcher: PageFetcher,
        llm: Arc<dyn LlmClient>,
        options: ChatOptions,
        max_urls: usize,
    ) -> Self {
        Self {
            fetcher,
            llm,
            options,
            max_urls,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let llm_config = settings.scraper_llm_config();
        Ok(Self::new(
            PageFetcher::new(&settings.scraper)?,
            create_client(&llm_config)?,
            ChatOptions::from(&llm_config.params),
            settings.scraper.max_urls,
        ))
    }

    /// Fetch every URL concurrently, keeping input order
    async fn scrape(&self, urls: &[String]) -> Vec<ScrapeOutcome> {
        join_all(urls.iter().map(|url| self.fetcher.fetch(url))).await
    }

    async fn summarize(&self, outcomes: &[ScrapeOutcome]) -> String {
        let pages: Vec<Page> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                ScrapeOutcome::Success {
                    url,
                    title,
                    content,
                } => Some(Page {
                    url,
                    title,
                    content,
                }),
                _ => None,
            })
            .collect();

        if pages.is_empty() {
            return "❌ Failed to extract content from any of the provided URLs.".to_string();
        }

        match self.llm_summary(&pages, outcomes).await {
            Ok(summary) => {
                let sources: String = pages
                    .iter()
                    .enumerate()
                    .map(|(i, page)| format!("{}. [{}]({})\n", i + 1, page.title, page.url))
                    .collect();
                format!(
                    "🌐 **Web Content Summary:**\n\n{}\n\n📋 **Sources:**\n{}",
                    summary, sources
                )
            }
            Err(e) => {
                error!("Error creating summary with the model: {}", e);
                simple_summary(&pages)
            }
        }
    }

    async fn llm_summary(&self, pages: &[Page<'_>], outcomes: &[ScrapeOutcome]) -> Result<String> {
        let mut content = String::from("Web scraping results:\n\n");
        for (i, page) in pages.iter().enumerate() {
            content.push_str(&format!(
                "{}. **{}**\n   URL: {}\n   Content: {}...\n\n",
                i + 1,
                page.title,
                page.url,
                truncate_text(page.content, PROMPT_PAGE_CHARS, "")
            ));
        }

        let failures: Vec<String> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                ScrapeOutcome::Failed { url, error } => Some(format!("- {}: {}\n", url, error)),
                ScrapeOutcome::Skipped { url, reason } => Some(format!("- {}: {}\n", url, reason)),
                ScrapeOutcome::Success { .. } => None,
            })
            .collect();
        if !failures.is_empty() {
            content.push_str("\nFailed to scrape:\n");
            content.push_str(&failures.concat());
        }

        let prompt = render_template(SUMMARY_PROMPT, &json!({ "content": content }))?;
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
impl AgentExecutor for ScraperAgentExecutor {
    async fn execute(&self, ctx: &RequestContext, queue: &EventQueue) -> Result<()> {
        let mut urls = extract_urls(&ctx.user_text());
        if urls.is_empty() {
            queue.enqueue_text("❌ No URLs provided for scraping. Please provide URLs to scrape.");
            return Ok(());
        }

        if urls.len() > self.max_urls {
            urls.truncate(self.max_urls);
            queue.enqueue_text(format!(
                "📝 Limiting to first {} URLs for performance...",
                self.max_urls
            ));
        }

        info!("Scraping {} URL(s)", urls.len());
        let outcomes = self.scrape(&urls).await;
        queue.enqueue_text(self.summarize(&outcomes).await);
        Ok(())
    }

    async fn cancel(&self, _ctx: &RequestContext, queue: &EventQueue) -> Result<()> {
        queue.enqueue_text("🛑 Web scraping operation cancelled.");
        Ok(())
    }
}

/// Listing with short previews, used when the model is unavailable
fn simple_summary(pages: &[Page]) -> String {
    let mut summary = String::from("🌐 **Web Content Summary:**\n\n");
    for (i, page) in pages.iter().enumerate() {
        summary.push_str(&format!(
            "**{}. {}**\n🔗 {}\n📄 {}\n\n",
            i + 1,
            page.title,
            page.url,
            truncate_text(page.content, PREVIEW_CHARS, "...")
        ));
    }
    summary
}

/// Card published by the scraper agent
pub fn scraper_agent_card(endpoints: &EndpointSettings) -> AgentCard {
    AgentCard {
        name: "Web Scraper Agent".to_string(),
        description: "Specialized agent for scraping web content and providing intelligent summaries"
            .to_string(),
        url: format!("{}/", endpoints.scraper_url().trim_end_matches('/')),
        version: "1.0.0".to_string(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        default_input_modes: vec!["text".to_string()],
        default_output_modes: vec!["text".to_string()],
        capabilities: AgentCapabilities { streaming: false },
        skills: vec![AgentSkill::new(
            "web_scraper",
            "Web Content Scraper",
            "Scrapes web pages and extracts meaningful content with AI-powered summarization",
            &["scraping", "web", "content", "summarization", "analysis"],
            &[
                "Scrape content from https://example.com",
                "Extract information from these URLs: https://site1.com, https://site2.com",
                "Summarize the content of https://news.example.com/article",
                "Get detailed information from web pages",
            ],
        )],
    }
}
