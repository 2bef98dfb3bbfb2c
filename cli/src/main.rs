//! # agentmesh CLI
//!
//! Command-line interface for agentmesh - a local conversational agent that
//! delegates web search and scraping to two helper agents over A2A.
//!
//! ## Usage
//!
//! - `agentmesh "message"` - Answer a single message
//! - `agentmesh chat` - Start an interactive chat
//! - `agentmesh serve base|search|scraper` - Run one agent
//! - `agentmesh start` - Run and supervise all three agents
//! - `agentmesh validate` - Check the local setup
//! - `agentmesh models` - Show Ollama models
//! - `agentmesh tools` - Show available tools
//! - `agentmesh memory ...` - Inspect and maintain conversation memory

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod server;

use commands::{
    chat_command, memory_command, models_command, run_command, serve_command, start_command,
    tools_command, validate_command, AgentKind, MemoryAction,
};
use config::CliConfigLoader;

/// agentmesh - local conversational agent with search and scraping helpers
#[derive(Parser)]
#[command(name = "agentmesh")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A local conversational agent that delegates web search and scraping to helper agents")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file or directory path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Model override (e.g. ollama_chat/llama3.1:8b)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Ollama server override (e.g. http://localhost:11434)
    #[arg(long, global = true)]
    ollama_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Working directory
    #[arg(long, global = true)]
    working_dir: Option<PathBuf>,

    /// The message to answer (if provided, runs in single-message mode)
    message: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively with the agent
    Chat {
        /// Resume a session id instead of starting a new one
        #[arg(long)]
        session: Option<String>,
    },

    /// Run one agent server
    Serve {
        #[arg(value_enum)]
        agent: AgentKind,

        /// Bind host
        #[arg(long)]
        host: Option<String>,

        /// Port, overriding the configured one
        #[arg(long)]
        port: Option<u16>,
    },

    /// Start and supervise all agents
    Start,

    /// Check the local setup
    Validate,

    /// Show Ollama status and models
    Models,

    /// Show available tools
    Tools,

    /// Inspect and maintain conversation memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
}

/// Build a configuration loader from CLI arguments
fn build_config_loader(cli: &Cli) -> CliConfigLoader {
    let mut loader = CliConfigLoader::new();

    if let Some(config_path) = &cli.config {
        loader = loader.with_config_override(config_path.clone());
    }

    if let Some(model) = &cli.model {
        loader = loader.with_model_override(model.clone());
    }

    if let Some(url) = &cli.ollama_url {
        loader = loader.with_ollama_url_override(url.clone());
    }

    if let Some(Commands::Serve {
        host: Some(host), ..
    }) = &cli.command
    {
        loader = loader.with_host_override(host.clone());
    }

    loader
}

/// Global flags handed to the agents started by `agentmesh start`
fn child_args(cli: &Cli) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(config_path) = &cli.config {
        args.push("--config".to_string());
        args.push(config_path.display().to_string());
    }
    if let Some(model) = &cli.model {
        args.push("--model".to_string());
        args.push(model.clone());
    }
    if let Some(url) = &cli.ollama_url {
        args.push("--ollama-url".to_string());
        args.push(url.clone());
    }
    if cli.verbose {
        args.push("--verbose".to_string());
    }
    args
}

/// `--verbose` wins, then `LOG_LEVEL`, then `RUST_LOG`, then `info`
fn log_filter(verbose: bool) -> String {
    if verbose {
        return "debug".to_string();
    }
    std::env::var("LOG_LEVEL")
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .map(|level| level.trim().to_lowercase())
        .filter(|level| !level.is_empty())
        .unwrap_or_else(|| "info".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Change working directory if specified
    if let Some(working_dir) = &cli.working_dir {
        std::env::set_current_dir(working_dir)?;
    }

    // .env may set LOG_LEVEL, so it is loaded before tracing starts
    let dotenv_path = config::load_dotenv();
    agentmesh_core::init_tracing(&log_filter(cli.verbose));
    if let Some(path) = dotenv_path {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let config_loader = build_config_loader(&cli);
    let start_args = child_args(&cli);

    match (cli.message, cli.command) {
        // If a message is provided, answer it and exit
        (Some(message), None) => run_command(message, config_loader).await,
        // If a message is provided with a subcommand, that's an error
        (Some(_), Some(_)) => {
            tracing::error!("Error: Cannot specify both a message and a subcommand");
            std::process::exit(1);
        }
        (None, Some(Commands::Chat { session })) => chat_command(session, config_loader).await,
        (None, Some(Commands::Serve { agent, port, .. })) => {
            serve_command(agent, port, config_loader).await
        }
        (None, Some(Commands::Start)) => start_command(config_loader, start_args).await,
        (None, Some(Commands::Validate)) => validate_command(config_loader).await,
        (None, Some(Commands::Models)) => models_command(config_loader).await,
        (None, Some(Commands::Tools)) => tools_command(config_loader).await,
        (None, Some(Commands::Memory { action })) => memory_command(action, config_loader).await,
        // Default to interactive chat
        (None, None) => chat_command(None, config_loader).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn start_passes_global_flags_to_children() {
        let cli = Cli::parse_from([
            "agentmesh",
            "--model",
            "llama3.1:8b",
            "-v",
            "--config",
            "conf.json",
            "start",
        ]);
        assert_eq!(
            child_args(&cli),
            vec!["--config", "conf.json", "--model", "llama3.1:8b", "--verbose"]
        );
    }

    #[test]
    fn serve_takes_agent_host_and_port() {
        let cli = Cli::parse_from(["agentmesh", "serve", "scraper", "--port", "9002", "--host", "0.0.0.0"]);
        match cli.command {
            Some(Commands::Serve { agent, host, port }) => {
                assert_eq!(agent, AgentKind::Scraper);
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(9002));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn memory_subcommands_parse() {
        let cli = Cli::parse_from(["agentmesh", "memory", "search", "rust", "--limit", "3"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Memory {
                action: MemoryAction::Search { ref query, limit: 3 }
            }) if query == "rust"
        ));
    }
}
