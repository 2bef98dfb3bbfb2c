//! Downloading pages and turning them into scrape outcomes

use crate::config::ScraperSettings;
use crate::error::Result;
use std::time::Duration;
use tracing::{error, info};

use super::extract::extract_content;

/// Result of scraping a single URL
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    Success {
        url: String,
        title: String,
        content: String,
    },
    Failed {
        url: String,
        error: String,
    },
    Skipped {
        url: String,
        reason: String,
    },
}

impl ScrapeOutcome {
    pub fn url(&self) -> &str {
        match self {
            Self::Success { url, .. } | Self::Failed { url, .. } | Self::Skipped { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// HTTP client configured for polite scraping
#[derive(Debug, Clone)]
pub struct PageFetcher {
    http: reqwest::Client,
    settings: ScraperSettings,
}

impl PageFetcher {
    pub fn new(settings: &ScraperSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            settings: settings.clone(),
        })
    }

    pub async fn fetch(&self, url: &str) -> ScrapeOutcome {
        info!("Scraping URL: {}", url);
        let failed = |error: String| ScrapeOutcome::Failed {
            url: url.to_string(),
            error,
        };

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Error scraping {}: {}", url, e);
                return failed(e.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            return failed(format!("HTTP {}", status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();
        if !content_type.contains("text/html") {
            return ScrapeOutcome::Skipped {
                url: url.to_string(),
                reason: format!("Unsupported content type: {}", content_type),
            };
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(e) => {
                error!("Error reading {}: {}", url, e);
                return failed(e.to_string());
            }
        };

        match extract_content(&html, url, &self.settings) {
            Some(page) => ScrapeOutcome::Success {
                url: url.to_string(),
                title: page.title,
                content: page.content,
            },
            None => failed("Failed to extract meaningful content".to_string()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{http::header, response::IntoResponse, routing::get, Router};

    pub(crate) fn article_html(title: &str) -> String {
        format!(
            "<html><head><title>{title}</title></head><body><nav>skip</nav>\
             <article><p>{}</p></article></body></html>",
            format!("{title} explains things in detail. ").repeat(10)
        )
    }

    /// Spawn a small site with HTML, JSON, error and empty pages
    pub(crate) async fn spawn_site() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = Router::new()
            .route(
                "/guide",
                get(|| async { axum::response::Html(article_html("Tokio Guide")) }),
            )
            .route(
                "/book",
                get(|| async { axum::response::Html(article_html("Rust Book")) }),
            )
            .route(
                "/data.json",
                get(|| async { ([(header::CONTENT_TYPE, "application/json")], "{}").into_response() }),
            )
            .route(
                "/empty",
                get(|| async { axum::response::Html("<html><body><p>tiny</p></body></html>") }),
            );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        base
    }

    #[tokio::test]
    async fn outcomes_cover_success_skip_and_failures() {
        let base = spawn_site().await;
        let fetcher = PageFetcher::new(&ScraperSettings::default()).unwrap();

        match fetcher.fetch(&format!("{base}/guide")).await {
            ScrapeOutcome::Success { title, content, .. } => {
                assert_eq!(title, "Tokio Guide");
                assert!(content.starts_with("Tokio Guide explains things"));
                assert!(!content.contains("skip"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert_eq!(
            fetcher.fetch(&format!("{base}/data.json")).await,
            ScrapeOutcome::Skipped {
                url: format!("{base}/data.json"),
                reason: "Unsupported content type: application/json".to_string(),
            }
        );

        assert_eq!(
            fetcher.fetch(&format!("{base}/missing")).await,
            ScrapeOutcome::Failed {
                url: format!("{base}/missing"),
                error: "HTTP 404".to_string(),
            }
        );

        let empty = fetcher.fetch(&format!("{base}/empty")).await;
        assert!(matches!(
            empty,
            ScrapeOutcome::Failed { ref error, .. } if error == "Failed to extract meaningful content"
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let fetcher = PageFetcher::new(&ScraperSettings::default()).unwrap();
        let outcome = fetcher.fetch(&url).await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.url(), url);
    }
}
