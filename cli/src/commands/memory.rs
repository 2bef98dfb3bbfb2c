//! Memory maintenance commands

use agentmesh_core::util::{format_timestamp, truncate_text};
use agentmesh_core::MemoryStore;
use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::PathBuf;
use tracing::info;

const PREVIEW_CHARS: usize = 160;

#[derive(Debug, Subcommand)]
pub enum MemoryAction {
    /// Show memory statistics
    Stats,
    /// Search remembered conversations
    Search {
        query: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Export all memories to a JSON file
    Export { file: PathBuf },
    /// Merge memories from a JSON export
    Import { file: PathBuf },
    /// Delete every memory of a session
    Clear { session: String },
}

pub async fn memory_command(
    action: MemoryAction,
    config_loader: crate::config::CliConfigLoader,
) -> Result<()> {
    let settings = config_loader.load().await?;
    let store = MemoryStore::open(settings.memory.clone())
        .await
        .context("Failed to open memory store")?;
    run_action(&store, action).await
}

async fn run_action(store: &MemoryStore, action: MemoryAction) -> Result<()> {
    match action {
        MemoryAction::Stats => {
            println!("{}", serde_json::to_string_pretty(&store.stats().await)?);
        }
        MemoryAction::Search { query, limit } => {
            let hits = store.search(&query, limit).await;
            if hits.is_empty() {
                println!("No memories match '{}'.", query);
            }
            for entry in hits {
                println!(
                    "[{}] session {}",
                    format_timestamp(entry.timestamp),
                    entry.session_id
                );
                println!("  User: {}", truncate_text(&entry.user_message, PREVIEW_CHARS, "..."));
                println!(
                    "  Assistant: {}\n",
                    truncate_text(&entry.assistant_response, PREVIEW_CHARS, "...")
                );
            }
        }
        MemoryAction::Export { file } => {
            let count = store.export(&file).await?;
            info!("Exported {} memories to {}", count, file.display());
            println!("📤 Exported {} memories to {}", count, file.display());
        }
        MemoryAction::Import { file } => {
            let count = store
                .import(&file)
                .await
                .with_context(|| format!("Failed to import {}", file.display()))?;
            info!("Imported {} memories from {}", count, file.display());
            println!("📥 Imported {} new memories from {}", count, file.display());
        }
        MemoryAction::Clear { session } => {
            let count = store.purge_session(&session).await?;
            println!("🧹 Removed {} memories of session {}", count, session);
        }
    }
    Ok(())
}
