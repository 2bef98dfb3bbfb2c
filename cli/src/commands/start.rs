//! Start and supervise the whole agent mesh

use agentmesh_core::a2a::AGENT_CARD_PATH;
use agentmesh_core::config::EndpointSettings;
use agentmesh_core::llm::OllamaProbe;
use agentmesh_core::Settings;
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

use super::serve::AgentKind;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Helpers first so the base agent finds them when it starts
const START_ORDER: [AgentKind; 3] = [AgentKind::Search, AgentKind::Scraper, AgentKind::Base];

struct RunningAgent {
    kind: AgentKind,
    child: Child,
}

/// Launch all agents, wait for each to answer, and stop them together
///
/// `child_args` are global flags passed on to every `agentmesh serve` child.
pub async fn start_command(
    config_loader: crate::config::CliConfigLoader,
    child_args: Vec<String>,
) -> Result<()> {
    let settings = config_loader.load().await?;

    println!("🔍 Checking requirements...");
    check_requirements(&settings).await?;
    println!("✅ Requirements check passed!\n");

    let exe = std::env::current_exe().context("Cannot locate the agentmesh executable")?;
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;
    let mut agents: Vec<RunningAgent> = Vec::new();

    for kind in START_ORDER {
        println!("🚀 Starting {}...", kind.display_name());
        let url = readiness_url(kind, &settings.endpoints);
        let started = match launch(&exe, kind, &child_args) {
            Ok(mut agent) => {
                let ready = wait_until_ready(&http, &url, READY_TIMEOUT, || {
                    Ok(agent.child.try_wait()?.map(|status| status.to_string()))
                })
                .await;
                agents.push(agent);
                ready
            }
            Err(e) => Err(e),
        };

        if let Err(e) = started {
            error!("❌ {} failed to start: {:#}", kind.display_name(), e);
            stop_all(&mut agents).await;
            return Err(e.context(format!("{} failed to start", kind.display_name())));
        }
        info!("✅ {} is ready at {}", kind.display_name(), url);
    }

    print_service_urls(&settings.endpoints);

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Could not listen for Ctrl+C: {}", e);
            }
            println!("\n🛑 Stopping services...");
        }
        (kind, status) = first_exit(&mut agents) => {
            warn!("{} exited ({}), stopping the other agents", kind.display_name(), status);
        }
    }

    stop_all(&mut agents).await;
    println!("👋 All services stopped. Goodbye!");
    Ok(())
}

/// Ollama must be installed or reachable and the configuration must be free of errors
async fn check_requirements(settings: &Settings) -> Result<()> {
    if !Path::new(".env").exists() {
        warn!("⚠️  .env file not found, using defaults and environment variables");
    }

    let ollama_binary = which::which("ollama").is_ok();
    let ollama = OllamaProbe::new(&settings.ollama).status().await;
    if !ollama_binary && !ollama.service_running {
        bail!(
            "Ollama is not installed or not running at {}. Install it from https://ollama.ai and run `ollama serve`.",
            settings.ollama.api_base
        );
    }
    if ollama.service_running && !ollama.model_available {
        warn!(
            "⚠️  Model {} is not installed. Run: ollama pull {}",
            settings.ollama.model_name(),
            settings.ollama.model_name()
        );
    }

    let report = settings.validate();
    for warning in &report.warnings {
        warn!("⚠️  {}", warning);
    }
    if !report.valid {
        bail!(
            "Configuration errors:\n   - {}",
            report.errors.join("\n   - ")
        );
    }
    Ok(())
}

fn launch(exe: &Path, kind: AgentKind, child_args: &[String]) -> Result<RunningAgent> {
    let mut child = Command::new(exe)
        .args(child_args)
        .args(["serve", kind.as_arg()])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to launch {}", kind.display_name()))?;

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_output(kind, stdout, false));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_output(kind, stderr, true));
    }
    debug!(
        "{} running as pid {}",
        kind.display_name(),
        child.id().unwrap_or_default()
    );

    Ok(RunningAgent { kind, child })
}

async fn forward_output<R>(kind: AgentKind, reader: R, to_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = prefix_line(kind, &line);
        if to_stderr {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

fn prefix_line(kind: AgentKind, line: &str) -> String {
    format!("[{}] {}", kind.display_name(), line.trim_end())
}

/// Wildcard bind addresses are probed over loopback
fn probe_host(host: &str) -> &str {
    match host {
        "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
        other => other,
    }
}

/// Agent card for the helpers, `/health` for the web interface
fn readiness_url(kind: AgentKind, endpoints: &EndpointSettings) -> String {
    let base = format!(
        "http://{}:{}",
        probe_host(&endpoints.host),
        kind.port(endpoints)
    );
    match kind {
        AgentKind::Base => format!("{}/health", base),
        AgentKind::Search | AgentKind::Scraper => format!("{}{}", base, AGENT_CARD_PATH),
    }
}

/// Poll `url` until it answers with success
///
/// `exited` reports the exit status of a process that died during startup.
async fn wait_until_ready<F>(
    http: &reqwest::Client,
    url: &str,
    timeout: Duration,
    mut exited: F,
) -> Result<()>
where
    F: FnMut() -> Result<Option<String>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = exited()? {
            bail!("exited during startup ({})", status);
        }

        match http.get(url).send().await {
            Ok(response) if response.status().is_success() => return Ok(()),
            Ok(response) => debug!("{} answered {}", url, response.status()),
            Err(e) => debug!("{} not answering yet: {}", url, e),
        }

        if Instant::now() >= deadline {
            bail!("not ready after {:?}", timeout);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Resolve when any agent exits
async fn first_exit(agents: &mut [RunningAgent]) -> (AgentKind, String) {
    if agents.is_empty() {
        return std::future::pending().await;
    }
    let waits = agents.iter_mut().map(|agent| {
        Box::pin(async move {
            let status = match agent.child.wait().await {
                Ok(status) => status.to_string(),
                Err(e) => e.to_string(),
            };
            (agent.kind, status)
        })
    });
    futures::future::select_all(waits).await.0
}

/// Stop agents in reverse start order
async fn stop_all(agents: &mut Vec<RunningAgent>) {
    while let Some(mut agent) = agents.pop() {
        if let Ok(Some(_)) = agent.child.try_wait() {
            continue;
        }
        match agent.child.kill().await {
            Ok(()) => println!("   ✅ Stopped {}", agent.kind.display_name()),
            Err(e) => println!("   ⚠️  Error stopping {}: {}", agent.kind.display_name(), e),
        }
    }
}

fn print_service_urls(endpoints: &EndpointSettings) {
    println!("\n🎉 All agents are up!");
    println!("\n📋 Service URLs:");
    println!("   🌐 Web Interface: {}", endpoints.base_url());
    println!("   🔍 Google Search Agent: {}", endpoints.search_url());
    println!("   🌐 Web Scraper Agent: {}", endpoints.scraper_url());
    println!(
        "   📋 Search Agent card: {}{}",
        endpoints.search_url(),
        AGENT_CARD_PATH
    );
    println!(
        "   📋 Scraper Agent card: {}{}",
        endpoints.scraper_url(),
        AGENT_CARD_PATH
    );
    println!("\n💡 Try:");
    println!("   • Simple search: 'Search Google for Rust tutorials'");
    println!("   • Search + scraping: 'Search for latest AI developments and summarize'");
    println!("\n⏹️  Press Ctrl+C to stop all services");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};

    #[test]
    fn readiness_urls_follow_agent_kind() {
        let endpoints = EndpointSettings {
            host: "0.0.0.0".to_string(),
            ..Default::default()
        };
        assert_eq!(
            readiness_url(AgentKind::Search, &endpoints),
            "http://127.0.0.1:8001/.well-known/agent.json"
        );
        assert_eq!(
            readiness_url(AgentKind::Base, &endpoints),
            "http://127.0.0.1:8000/health"
        );
    }

    #[test]
    fn child_output_is_prefixed() {
        assert_eq!(
            prefix_line(AgentKind::Scraper, "listening\r"),
            "[Web Scraper Agent] listening"
        );
    }

    #[tokio::test]
    async fn ready_once_the_endpoint_answers() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/health", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let app = Router::new().route("/health", get(|| async { "ok" }));
            axum::serve(listener, app).await.unwrap();
        });

        let http = reqwest::Client::new();
        wait_until_ready(&http, &url, Duration::from_secs(5), || Ok(None))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn gives_up_after_the_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/health", listener.local_addr().unwrap());
        drop(listener);

        let http = reqwest::Client::new();
        let err = wait_until_ready(&http, &url, Duration::from_millis(600), || Ok(None))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "not ready after 600ms");
    }

    #[tokio::test]
    async fn early_exit_stops_the_wait() {
        let http = reqwest::Client::new();
        let err = wait_until_ready(&http, "http://127.0.0.1:9/", Duration::from_secs(30), || {
            Ok(Some("exit status: 1".to_string()))
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "exited during startup (exit status: 1)");
    }
}
