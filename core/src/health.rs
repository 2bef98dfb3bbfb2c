//! Health report served by the web interface and printed by the CLI

use crate::config::{Settings, ValidationReport};
use crate::llm::{OllamaProbe, OllamaStatus};
use crate::memory::{MemoryStats, MemoryStore};
use crate::util::format_timestamp;
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: String,
    pub ollama: OllamaStatus,
    /// Absent when memory is disabled
    pub memory: Option<MemoryStats>,
    pub configuration: ValidationReport,
    pub version: String,
}

impl HealthReport {
    /// Probe Ollama and gather memory and configuration state
    ///
    /// Healthy means Ollama answers and the configuration has no errors.
    pub async fn collect(settings: &Settings, memory: Option<&MemoryStore>) -> Self {
        let ollama = OllamaProbe::new(&settings.ollama).status().await;
        let configuration = settings.validate();
        let memory = match memory {
            Some(store) => Some(store.stats().await),
            None => None,
        };

        let status = if ollama.service_running && configuration.valid {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        Self {
            status,
            timestamp: format_timestamp(Utc::now()),
            ollama,
            memory,
            configuration,
            version: crate::VERSION.to_string(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemorySettings;
    use crate::llm::ollama::tests::spawn_fake_ollama;

    #[tokio::test]
    async fn healthy_with_running_ollama_and_valid_config() {
        let mut settings = Settings::default();
        settings.ollama.api_base = spawn_fake_ollama().await;
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::open(MemorySettings {
            memory_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .await
        .unwrap();

        let report = HealthReport::collect(&settings, Some(&store)).await;
        assert!(report.is_healthy());
        assert!(report.memory.is_some());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["ollama"]["service_running"], true);
    }

    #[tokio::test]
    async fn unhealthy_when_ports_collide() {
        let mut settings = Settings::default();
        settings.ollama.api_base = spawn_fake_ollama().await;
        settings.endpoints.scraper_port = settings.endpoints.search_port;

        let report = HealthReport::collect(&settings, None).await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(!report.configuration.errors.is_empty());
        assert!(report.memory.is_none());
    }
}
