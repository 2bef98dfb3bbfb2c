//! Single message execution command

use agentmesh_core::agent::friendly_error;
use agentmesh_core::util::generate_session_id;
use agentmesh_core::ChatAgent;
use anyhow::Result;
use tracing::{debug, error, info};

/// Answer one message and print the reply
pub async fn run_command(
    message: String,
    config_loader: crate::config::CliConfigLoader,
) -> Result<()> {
    let settings = config_loader.load().await?;
    info!("🤖 Using model: {}", settings.ollama.model_name());

    let agent = ChatAgent::from_settings(&settings).await?;
    let session_id = generate_session_id();
    debug!("Session: {}", session_id);

    match agent.reply(&session_id, &message).await {
        Ok(reply) => {
            println!("{}", reply.text);
            info!(
                "✅ Answered in {} ms ({} step(s), tools: [{}])",
                reply.duration_ms,
                reply.steps,
                reply.tools_used.join(", ")
            );
            Ok(())
        }
        Err(e) => {
            error!("Failed to answer: {}", e);
            eprintln!("{}", friendly_error(&e));
            std::process::exit(1);
        }
    }
}
