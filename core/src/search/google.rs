//! Google Custom Search JSON API client

use crate::config::SearchSettings;
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const GOOGLE_CSE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
const MAX_RESULTS_PER_REQUEST: u32 = 10;

/// A single search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub display_link: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    /// Google's estimate, reported as a string by the API
    pub total_results: Option<String>,
    /// Seconds the search took on Google's side
    pub search_time: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    items: Vec<ApiItem>,
    search_information: Option<ApiSearchInformation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    display_link: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSearchInformation {
    total_results: Option<String>,
    search_time: Option<f64>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for `GET /customsearch/v1`
#[derive(Debug, Clone)]
pub struct GoogleSearchClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
    results_per_query: u32,
}

impl GoogleSearchClient {
    pub fn new(settings: &SearchSettings) -> Result<Self> {
        let (Some(api_key), Some(engine_id)) = (
            settings.api_key.as_deref().filter(|k| !k.is_empty()),
            settings.engine_id.as_deref().filter(|id| !id.is_empty()),
        ) else {
            return Err(SearchError::NotConfigured.into());
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: GOOGLE_CSE_ENDPOINT.to_string(),
            api_key: api_key.to_string(),
            engine_id: engine_id.to_string(),
            results_per_query: settings.results_per_query.min(settings.max_results),
        })
    }

    /// Point the client at another endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Search with the configured result count
    pub async fn search(&self, query: &str) -> Result<SearchResponse> {
        self.search_with_limit(query, self.results_per_query).await
    }

    pub async fn search_with_limit(&self, query: &str, num: u32) -> Result<SearchResponse> {
        let num = num.clamp(1, MAX_RESULTS_PER_REQUEST);
        debug!("Google search for '{}' (num={})", query, num);

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", &num.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let api: ApiResponse = response.json().await?;
        let (total_results, search_time) = api
            .search_information
            .map(|info| (info.total_results, info.search_time))
            .unwrap_or_default();

        Ok(SearchResponse {
            results: api
                .items
                .into_iter()
                .map(|item| SearchResult {
                    title: item.title,
                    link: item.link,
                    snippet: item.snippet,
                    display_link: item.display_link,
                })
                .collect(),
            total_results,
            search_time,
        })
    }
}
