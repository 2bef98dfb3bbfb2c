//! `agentmesh tools`

use agentmesh_core::tools::ToolRegistry;
use agentmesh_core::MemoryStore;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// List the agent's tools with their sample calls and the agents behind them
pub async fn tools_command(config_loader: crate::config::CliConfigLoader) -> Result<()> {
    let settings = config_loader.load().await?;
    let memory = if settings.agent.enable_memory {
        Some(Arc::new(MemoryStore::open(settings.memory.clone()).await?))
    } else {
        None
    };
    let registry = ToolRegistry::for_agent(&settings, memory);
    info!("{} tools registered", registry.list_tools().len());

    println!("🛠️  Available Tools\n");
    for name in registry.list_tools() {
        let Some((tool_name, description)) = registry.get_tool_info(name) else {
            continue;
        };
        println!("📦 {}", tool_name);
        println!("   {}", description.lines().next().unwrap_or(description));

        let examples = registry
            .create_tool(name)
            .map(|tool| tool.examples())
            .unwrap_or_default();
        for example in examples {
            println!("   e.g. {} → {}", example.parameters, example.description);
        }
        println!();
    }

    println!("🔍 Search agent: {}", settings.endpoints.search_url());
    println!("🌐 Scraper agent: {}", settings.endpoints.scraper_url());

    Ok(())
}
