//! Ollama model overview command

use agentmesh_core::llm::{model_suggestions, recommended_models, OllamaProbe};
use anyhow::Result;
use tracing::info;

/// Show the Ollama status, installed and recommended models
pub async fn models_command(config_loader: crate::config::CliConfigLoader) -> Result<()> {
    let settings = config_loader.load().await?;
    let current = settings.ollama.model_name();
    info!("Probing Ollama at {}", settings.ollama.api_base);

    let status = OllamaProbe::new(&settings.ollama).status().await;

    println!("🦙 Ollama at {}", settings.ollama.api_base);
    if status.service_running {
        println!("   ✅ Running");
    } else {
        println!(
            "   ❌ Not reachable: {}",
            status.error.as_deref().unwrap_or("no response")
        );
        println!("   Start it with: ollama serve");
    }

    println!("\n📦 Installed models");
    if status.available_models.is_empty() {
        println!("   (none)");
    }
    for model in &status.available_models {
        let marker = if model.starts_with(current) { " ← current" } else { "" };
        println!("   • {}{}", model, marker);
    }
    if status.service_running && !status.model_available {
        println!("\n⚠️  {} is not installed. Run: ollama pull {}", current, current);
    }

    println!("\n⭐ Recommended models");
    for model in recommended_models() {
        let installed = status.available_models.iter().any(|m| m.starts_with(model));
        let mark = if installed { "✅" } else { "  " };
        println!("   {} {}", mark, model);
    }

    println!("\n💡 Suggestions");
    for (use_case, suggestion) in model_suggestions(Some(current)) {
        println!("   {:<12} {}", use_case, suggestion);
    }

    Ok(())
}
