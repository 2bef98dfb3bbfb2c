//! Interactive chat command

use agentmesh_core::agent::friendly_error;
use agentmesh_core::util::{generate_session_id, truncate_text};
use agentmesh_core::ChatAgent;
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error};

const HISTORY_LIMIT: usize = 10;
const HISTORY_PREVIEW_CHARS: usize = 200;

/// Slash commands understood by the REPL
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    Quit,
    Clear,
    History,
    Stats,
    Profile,
    Help,
    Unknown(String),
}

impl ReplCommand {
    /// `None` when the line is a message for the agent
    fn parse(line: &str) -> Option<Self> {
        let command = line.trim().strip_prefix('/')?;
        let name = command.split_whitespace().next().unwrap_or_default();
        Some(match name.to_lowercase().as_str() {
            "quit" | "exit" | "q" => ReplCommand::Quit,
            "clear" => ReplCommand::Clear,
            "history" => ReplCommand::History,
            "stats" => ReplCommand::Stats,
            "profile" => ReplCommand::Profile,
            "help" | "?" => ReplCommand::Help,
            _ => ReplCommand::Unknown(name.to_string()),
        })
    }
}

/// Start an interactive session with the conversational agent
pub async fn chat_command(
    session: Option<String>,
    config_loader: crate::config::CliConfigLoader,
) -> Result<()> {
    let settings = config_loader.load().await?;
    let agent = ChatAgent::from_settings(&settings).await?;
    let session_id = session.unwrap_or_else(generate_session_id);
    debug!("Interactive session {}", session_id);

    println!("🤖 agentmesh chat");
    println!("   Model: {}", agent.model_name());
    println!("   Tools: {}", agent.tool_names().join(", "));
    println!("   Session: {}", session_id);
    println!("   Type /help for commands, /quit to leave.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match ReplCommand::parse(line) {
            Some(ReplCommand::Quit) => break,
            Some(command) => run_repl_command(&agent, &session_id, command).await?,
            None => match agent.reply(&session_id, line).await {
                Ok(reply) => println!("\n🤖 {}\n", reply.text),
                Err(e) => {
                    error!("Failed to answer: {}", e);
                    println!("\n⚠️  {}\n", friendly_error(&e));
                }
            },
        }
    }

    println!("👋 Goodbye!");
    Ok(())
}

async fn run_repl_command(agent: &ChatAgent, session_id: &str, command: ReplCommand) -> Result<()> {
    let Some(memory) = agent.memory() else {
        match command {
            ReplCommand::Help => print_help(),
            ReplCommand::Unknown(name) => println!("Unknown command: /{}", name),
            _ => println!("Memory is disabled."),
        }
        return Ok(());
    };

    match command {
        ReplCommand::Clear => {
            let cleared = memory.clear_session(session_id).await;
            println!("🧹 Cleared {} memories from this session.\n", cleared);
        }
        ReplCommand::History => {
            let history = memory.session_history(session_id, Some(HISTORY_LIMIT)).await;
            if history.is_empty() {
                println!("No conversation history in this session yet.\n");
            }
            for entry in history {
                println!("[{}]", entry.timestamp.format("%H:%M:%S"));
                println!("  You: {}", truncate_text(&entry.user_message, HISTORY_PREVIEW_CHARS, "..."));
                println!(
                    "  Agent: {}\n",
                    truncate_text(&entry.assistant_response, HISTORY_PREVIEW_CHARS, "...")
                );
            }
        }
        ReplCommand::Stats => {
            let stats = memory.stats().await;
            println!("{}\n", serde_json::to_string_pretty(&stats)?);
        }
        ReplCommand::Profile => {
            let profile = memory.user_profile(session_id).await;
            if profile.is_empty() {
                println!("I don't know anything about you yet.\n");
            } else {
                println!("What I know about you:\n{}\n", profile.summary());
            }
        }
        ReplCommand::Help => print_help(),
        ReplCommand::Unknown(name) => println!("Unknown command: /{}. Type /help.", name),
        ReplCommand::Quit => {}
    }
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  /history   Show this session's recent conversation");
    println!("  /clear     Forget this session's conversation");
    println!("  /stats     Show memory statistics");
    println!("  /profile   Show what the agent knows about you");
    println!("  /quit      Leave the chat\n");
}
