//! Status checks against a local Ollama runtime

use crate::config::settings::strip_model_prefix;
use crate::config::OllamaSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// What the probe found out about the Ollama service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaStatus {
    pub service_running: bool,
    pub api_accessible: bool,
    /// Whether the configured model is installed
    pub model_available: bool,
    pub available_models: Vec<String>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    #[serde(default)]
    name: String,
}

/// HTTP probe for the Ollama `/api` endpoints
#[derive(Debug, Clone)]
pub struct OllamaProbe {
    http: reqwest::Client,
    api_base: String,
    model: String,
}

impl OllamaProbe {
    pub fn new(settings: &OllamaSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            model: settings.model_name().to_string(),
        }
    }

    /// Check that the service answers and the configured model is installed
    pub async fn status(&self) -> OllamaStatus {
        let mut status = OllamaStatus::default();

        let version = self
            .http
            .get(format!("{}/api/version", self.api_base))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;
        match version {
            Ok(response) if response.status().is_success() => {
                status.service_running = true;
                status.api_accessible = true;
            }
            Ok(response) => {
                status.error = Some(format!("Ollama API returned HTTP {}", response.status()));
                return status;
            }
            Err(e) => {
                tracing::debug!("Ollama version probe failed: {}", e);
                status.error = Some(e.to_string());
                return status;
            }
        }

        match self.installed_models().await {
            Ok(models) => {
                status.model_available = models.iter().any(|m| m.starts_with(&self.model));
                status.available_models = models;
            }
            Err(e) => status.error = Some(e.to_string()),
        }

        status
    }

    /// Names of the installed models
    pub async fn installed_models(&self) -> Result<Vec<String>, reqwest::Error> {
        let tags: TagsResponse = self
            .http
            .get(format!("{}/api/tags", self.api_base))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Whether some installed model matches `model` after prefix stripping
    pub async fn has_model(&self, model: &str) -> bool {
        let wanted = strip_model_prefix(model);
        self.installed_models()
            .await
            .map(|models| models.iter().any(|m| m.starts_with(wanted)))
            .unwrap_or(false)
    }
}

/// Models known to run well on a 16 GB laptop
pub fn recommended_models() -> &'static [&'static str] {
    &[
        "mistral-small:7b",
        "llama3.1:8b",
        "llama3.1:7b",
        "codellama:7b",
        "gemma2:7b",
    ]
}

/// Model suggestions keyed by use case
pub fn model_suggestions(current: Option<&str>) -> Vec<(&'static str, String)> {
    let mut suggestions = vec![
        (
            "fastest",
            "llama3.1:7b - Fastest responses, good for quick interactions".to_string(),
        ),
        (
            "balanced",
            "mistral-small:7b - Best balance of speed and quality (recommended)".to_string(),
        ),
        (
            "quality",
            "llama3.1:8b - Higher quality responses, slightly slower".to_string(),
        ),
        (
            "coding",
            "codellama:7b - Optimized for code generation and programming tasks".to_string(),
        ),
        (
            "lightweight",
            "gemma2:7b - Efficient Google model, good for basic tasks".to_string(),
        ),
    ];
    if let Some(current) = current {
        suggestions.push(("current", format!("Currently using: {}", current)));
    }
    suggestions
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{routing::get, Json, Router};
    use serde_json::json;

    pub(crate) async fn spawn_fake_ollama() -> String {
        let app = Router::new()
            .route("/api/version", get(|| async { Json(json!({"version": "0.5.1"})) }))
            .route(
                "/api/tags",
                get(|| async {
                    Json(json!({"models": [
                        {"name": "mistral-small:7b-instruct-q4"},
                        {"name": "gemma2:7b"}
                    ]}))
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn reports_running_service_and_model() {
        let settings = OllamaSettings {
            api_base: spawn_fake_ollama().await,
            ..Default::default()
        };
        let probe = OllamaProbe::new(&settings);

        let status = probe.status().await;
        assert!(status.service_running);
        assert!(status.api_accessible);
        assert!(status.model_available);
        assert_eq!(status.available_models.len(), 2);
        assert!(status.error.is_none());

        assert!(probe.has_model("ollama_chat/gemma2:7b").await);
        assert!(!probe.has_model("codellama:7b").await);
    }

    #[tokio::test]
    async fn unreachable_service_is_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let settings = OllamaSettings {
            api_base: format!("http://{}", addr),
            ..Default::default()
        };
        let status = OllamaProbe::new(&settings).status().await;
        assert!(!status.service_running);
        assert!(!status.model_available);
        assert!(status.error.is_some());
    }

    #[test]
    fn suggestions_mention_current_model() {
        let suggestions = model_suggestions(Some("gemma2:7b"));
        assert_eq!(suggestions.len(), 6);
        assert_eq!(suggestions[5].1, "Currently using: gemma2:7b");
        assert_eq!(recommended_models()[0], "mistral-small:7b");
    }
}
