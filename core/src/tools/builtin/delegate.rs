//! A2A calls from the conversational agent to the helper agents

use crate::a2a::{A2aClient, AGENT_CARD_PATH};
use crate::config::EndpointSettings;
use crate::error::Result;
use std::time::Duration;
use tracing::debug;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(60);

/// Where the helper agents live and how to reach them
#[derive(Debug, Clone)]
pub struct HelperAgents {
    http: reqwest::Client,
    endpoints: EndpointSettings,
}

impl HelperAgents {
    pub fn new(endpoints: &EndpointSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoints: endpoints.clone(),
        }
    }

    pub fn search_port(&self) -> u16 {
        self.endpoints.search_port
    }

    pub fn scraper_port(&self) -> u16 {
        self.endpoints.scraper_port
    }

    /// Ask the search agent and return its reply text
    pub async fn search(&self, query: &str) -> Result<String> {
        self.ask(&self.endpoints.search_url(), query, SEARCH_TIMEOUT).await
    }

    /// Ask the scraper agent to scrape `urls`
    pub async fn scrape(&self, urls: &[String]) -> Result<String> {
        let request = format!("Scrape these URLs:\n{}", urls.join("\n"));
        self.ask(&self.endpoints.scraper_url(), &request, SCRAPE_TIMEOUT)
            .await
    }

    async fn ask(&self, base_url: &str, text: &str, limit: Duration) -> Result<String> {
        debug!("Delegating to {} ({}s limit)", base_url, limit.as_secs());
        tokio::time::timeout(limit, async {
            let client =
                A2aClient::from_agent_card_url(self.http.clone(), base_url, AGENT_CARD_PATH).await?;
            let reply = client.send_message(text).await?;
            Ok(reply.text())
        })
        .await?
    }
}
