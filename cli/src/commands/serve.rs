//! Run one agent server

use agentmesh_core::a2a::a2a_router;
use agentmesh_core::config::EndpointSettings;
use agentmesh_core::scraper::{scraper_agent_card, ScraperAgentExecutor};
use agentmesh_core::search::{search_agent_card, SearchAgentExecutor};
use agentmesh_core::{ChatAgent, Settings};
use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::server::{web_router, AppState};

/// The three agents of the mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AgentKind {
    /// Conversational agent with the web interface
    Base,
    /// Google Search agent (A2A)
    Search,
    /// Web scraper agent (A2A)
    Scraper,
}

impl AgentKind {
    pub fn display_name(self) -> &'static str {
        match self {
            AgentKind::Base => "Base AI Agent",
            AgentKind::Search => "Google Search Agent",
            AgentKind::Scraper => "Web Scraper Agent",
        }
    }

    /// Argument accepted by `agentmesh serve`
    pub fn as_arg(self) -> &'static str {
        match self {
            AgentKind::Base => "base",
            AgentKind::Search => "search",
            AgentKind::Scraper => "scraper",
        }
    }

    pub fn port(self, endpoints: &EndpointSettings) -> u16 {
        match self {
            AgentKind::Base => endpoints.base_port,
            AgentKind::Search => endpoints.search_port,
            AgentKind::Scraper => endpoints.scraper_port,
        }
    }

    fn set_port(self, endpoints: &mut EndpointSettings, port: u16) {
        match self {
            AgentKind::Base => endpoints.base_port = port,
            AgentKind::Search => endpoints.search_port = port,
            AgentKind::Scraper => endpoints.scraper_port = port,
        }
    }
}

/// Serve one agent until Ctrl+C
pub async fn serve_command(
    kind: AgentKind,
    port: Option<u16>,
    config_loader: crate::config::CliConfigLoader,
) -> Result<()> {
    let mut settings = config_loader.load().await?;
    if let Some(port) = port {
        kind.set_port(&mut settings.endpoints, port);
    }

    ensure_valid(&settings)?;

    let router = build_router(kind, &settings).await?;
    let listener = bind(kind, &settings.endpoints.host, kind.port(&settings.endpoints)).await?;
    let addr = listener.local_addr()?;

    info!("🚀 {} listening on http://{}", kind.display_name(), addr);
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(kind))
        .await
        .with_context(|| format!("{} server error", kind.display_name()))?;
    Ok(())
}

/// Log configuration warnings and refuse to start on errors
fn ensure_valid(settings: &Settings) -> Result<()> {
    let report = settings.validate();
    for warning in &report.warnings {
        warn!("{}", warning);
    }
    if !report.valid {
        bail!(
            "Configuration errors:\n   - {}",
            report.errors.join("\n   - ")
        );
    }
    Ok(())
}

/// Bind `host` as a name or an IPv4/IPv6 address
async fn bind(kind: AgentKind, host: &str, port: u16) -> Result<TcpListener> {
    TcpListener::bind((host, port)).await.with_context(|| {
        format!("Failed to bind {} to {} port {}", kind.display_name(), host, port)
    })
}

async fn build_router(kind: AgentKind, settings: &Settings) -> Result<axum::Router> {
    let router = match kind {
        AgentKind::Base => {
            let agent = ChatAgent::from_settings(settings).await?;
            web_router(AppState::new(Arc::new(agent), settings.clone()))
        }
        AgentKind::Search => a2a_router(
            search_agent_card(&settings.endpoints),
            Arc::new(SearchAgentExecutor::from_settings(settings)?),
        ),
        AgentKind::Scraper => a2a_router(
            scraper_agent_card(&settings.endpoints),
            Arc::new(ScraperAgentExecutor::from_settings(settings)?),
        ),
    };
    Ok(router)
}

async fn shutdown_signal(kind: AgentKind) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("{} shutting down", kind.display_name());
}
