//! Setup validation command

use agentmesh_core::llm::{OllamaProbe, OllamaStatus};
use agentmesh_core::Settings;
use anyhow::Result;
use std::path::Path;
use tracing::info;

const WRITE_PROBE_FILE: &str = ".agentmesh_write_test";

/// Outcome of one validation check
#[derive(Debug, Clone, PartialEq)]
struct Check {
    name: &'static str,
    passed: bool,
    detail: String,
}

impl Check {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            detail: detail.into(),
        }
    }

    fn print(&self) {
        let mark = if self.passed { "✅" } else { "❌" };
        println!("{} {}: {}", mark, self.name, self.detail);
    }
}

/// Check the local setup and exit with status 1 if anything failed
pub async fn validate_command(config_loader: crate::config::CliConfigLoader) -> Result<()> {
    info!("Validating setup");
    println!("🤖 agentmesh setup validation");
    println!("Checking system requirements and setup...\n");

    let settings = config_loader.load().await?;
    let ollama = OllamaProbe::new(&settings.ollama).status().await;

    let checks = vec![
        check_env_file(Path::new(".env")),
        check_ollama_binary(),
        check_ollama_api(&settings, &ollama),
        check_model_installed(&settings, &ollama),
        check_configuration(&settings),
        check_search_credentials(&settings),
        check_memory_dir(&settings.memory.memory_dir).await,
    ];
    for check in &checks {
        check.print();
    }

    let (passed, total) = tally(&checks);
    println!("\n{}", "=".repeat(60));
    println!("Passed: {}/{} checks", passed, total);
    if passed == total {
        println!("✅ All checks passed! System is ready.");
        Ok(())
    } else {
        println!("❌ Some checks failed. Please address the issues above.");
        std::process::exit(1);
    }
}

fn tally(checks: &[Check]) -> (usize, usize) {
    (checks.iter().filter(|c| c.passed).count(), checks.len())
}

fn check_env_file(path: &Path) -> Check {
    if path.is_file() {
        Check::pass(".env file", "found")
    } else {
        Check::fail(".env file", "not found (copy .env.example and fill it in)")
    }
}

fn check_ollama_binary() -> Check {
    match which::which("ollama") {
        Ok(path) => Check::pass("Ollama binary", path.display().to_string()),
        Err(_) => Check::fail("Ollama binary", "not found in PATH, install it from https://ollama.ai"),
    }
}

fn check_ollama_api(settings: &Settings, ollama: &OllamaStatus) -> Check {
    if ollama.api_accessible {
        Check::pass("Ollama API", format!("running at {}", settings.ollama.api_base))
    } else {
        Check::fail(
            "Ollama API",
            format!(
                "not reachable at {} ({})",
                settings.ollama.api_base,
                ollama.error.as_deref().unwrap_or("no response")
            ),
        )
    }
}

fn check_model_installed(settings: &Settings, ollama: &OllamaStatus) -> Check {
    let model = settings.ollama.model_name();
    if ollama.model_available {
        Check::pass("Model", format!("{} is installed", model))
    } else {
        Check::fail("Model", format!("{} is not installed, run: ollama pull {}", model, model))
    }
}

fn check_configuration(settings: &Settings) -> Check {
    let report = settings.validate();
    if report.valid {
        let detail = if report.warnings.is_empty() {
            "valid".to_string()
        } else {
            format!("valid with warnings: {}", report.warnings.join("; "))
        };
        Check::pass("Configuration", detail)
    } else {
        Check::fail("Configuration", report.errors.join("; "))
    }
}

fn check_search_credentials(settings: &Settings) -> Check {
    if settings.search.is_configured() {
        Check::pass("Google Search credentials", "configured")
    } else {
        Check::fail(
            "Google Search credentials",
            "set GOOGLE_SEARCH_API_KEY and GOOGLE_SEARCH_ENGINE_ID",
        )
    }
}

async fn check_memory_dir(dir: &Path) -> Check {
    let name = "Memory directory";
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        return Check::fail(name, format!("cannot create {}: {}", dir.display(), e));
    }
    let probe = dir.join(WRITE_PROBE_FILE);
    match tokio::fs::write(&probe, b"ok").await {
        Ok(()) => {
            let _ = tokio::fs::remove_file(&probe).await;
            Check::pass(name, format!("{} is writable", dir.display()))
        }
        Err(e) => Check::fail(name, format!("{} is not writable: {}", dir.display(), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_dir_is_created_and_probed() {
        let dir = tempfile::tempdir().unwrap();
        let memory_dir = dir.path().join("memory_data");

        let check = check_memory_dir(&memory_dir).await;
        assert!(check.passed, "{}", check.detail);
        assert!(memory_dir.is_dir());
        assert!(!memory_dir.join(WRITE_PROBE_FILE).exists());
    }

    #[tokio::test]
    async fn memory_dir_under_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain-file");
        std::fs::write(&file, "x").unwrap();

        let check = check_memory_dir(&file.join("memory")).await;
        assert!(!check.passed);
        assert!(check.detail.starts_with("cannot create"));
    }

    #[test]
    fn configuration_errors_fail_the_check() {
        let mut settings = Settings::default();
        settings.endpoints.scraper_port = settings.endpoints.search_port;

        let check = check_configuration(&settings);
        assert!(!check.passed);
        assert!(check.detail.contains("cannot share port 8001"));

        let check = check_configuration(&Settings::default());
        assert!(check.passed);
        assert!(check.detail.starts_with("valid with warnings"));
    }

    #[test]
    fn ollama_checks_follow_probe_status() {
        let settings = Settings::default();
        let down = OllamaStatus {
            error: Some("connection refused".to_string()),
            ..Default::default()
        };
        let api = check_ollama_api(&settings, &down);
        assert!(!api.passed);
        assert!(api.detail.contains("connection refused"));

        let up = OllamaStatus {
            service_running: true,
            api_accessible: true,
            model_available: true,
            available_models: vec!["mistral-small:7b".to_string()],
            error: None,
        };
        assert!(check_ollama_api(&settings, &up).passed);
        assert_eq!(
            check_model_installed(&settings, &up).detail,
            "mistral-small:7b is installed"
        );
    }

    #[test]
    fn tally_counts_passed_checks() {
        let checks = [
            Check::pass("a", ""),
            Check::fail("b", ""),
            Check::pass("c", ""),
        ];
        assert_eq!(tally(&checks), (2, 3));
        assert!(!check_env_file(Path::new("/definitely/not/.env")).passed);
    }
}
