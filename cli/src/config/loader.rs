//! CLI configuration loader for agentmesh
//!
//! Settings are layered, lowest priority first:
//! 1. Built-in defaults
//! 2. One JSON config file, the first found of:
//!    --config file/dir, ./agentmesh.json, ./.agentmesh/config.json,
//!    $XDG_CONFIG_HOME/agentmesh/config.json or ~/.config/agentmesh/config.json
//! 3. Environment variables (a `.env` file is loaded first without overriding)
//! 4. Flag overrides

use agentmesh_core::Settings;
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const CONFIG_FILE_NAME: &str = "agentmesh.json";
const CONFIG_DIR_NAME: &str = ".agentmesh";

/// Load `.env` from the working directory, keeping variables that are already set
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// CLI configuration loader
#[derive(Debug, Clone, Default)]
pub struct CliConfigLoader {
    /// Override config file/directory path
    config_override: Option<PathBuf>,
    /// Flag overrides
    model_override: Option<String>,
    ollama_url_override: Option<String>,
    host_override: Option<String>,
}

impl CliConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set config file/directory override
    pub fn with_config_override(mut self, path: PathBuf) -> Self {
        self.config_override = Some(path);
        self
    }

    /// Set model override
    pub fn with_model_override(mut self, model: String) -> Self {
        self.model_override = Some(model);
        self
    }

    /// Set Ollama server override
    pub fn with_ollama_url_override(mut self, url: String) -> Self {
        self.ollama_url_override = Some(url);
        self
    }

    /// Set bind host override
    pub fn with_host_override(mut self, host: String) -> Self {
        self.host_override = Some(host);
        self
    }

    /// Load and resolve settings from the process environment
    pub async fn load(&self) -> Result<Settings> {
        self.load_with_env(|name| std::env::var(name).ok()).await
    }

    /// Load settings, reading environment variables through `lookup`
    pub async fn load_with_env<F>(&self, lookup: F) -> Result<Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Step 1: Find the config file, if any
        let mut settings = match self.find_config_file(&lookup)? {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                load_file(&path, &lookup).await?
            }
            None => Settings::default(),
        };

        // Step 2: Environment variables
        apply_env(&mut settings, &EnvReader { lookup: &lookup })?;

        // Step 3: Flag overrides
        if let Some(model) = &self.model_override {
            settings.ollama.default_model = model.clone();
        }
        if let Some(url) = &self.ollama_url_override {
            settings.ollama.api_base = url.clone();
        }
        if let Some(host) = &self.host_override {
            settings.endpoints.host = host.clone();
        }

        Ok(settings)
    }

    fn find_config_file<F>(&self, lookup: &F) -> Result<Option<PathBuf>>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &self.config_override {
            return resolve_override(path).map(Some);
        }

        let cwd = std::env::current_dir()?;
        let xdg = lookup("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")));

        let candidates = [
            Some(cwd.join(CONFIG_FILE_NAME)),
            Some(cwd.join(CONFIG_DIR_NAME).join("config.json")),
            xdg.map(|dir| dir.join("agentmesh").join("config.json")),
        ];
        Ok(candidates.into_iter().flatten().find(|path| path.is_file()))
    }
}

/// A `--config` path may name the file itself or a directory holding `config.json`
fn resolve_override(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else if path.is_dir() {
        let config_file = path.join("config.json");
        if config_file.is_file() {
            Ok(config_file)
        } else {
            Err(anyhow!(
                "No config.json found in directory: {}",
                path.display()
            ))
        }
    } else {
        Err(anyhow!("Config path does not exist: {}", path.display()))
    }
}

async fn load_file<F>(path: &Path, lookup: &F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let mut raw: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    resolve_env_refs(&mut raw, lookup)
        .with_context(|| format!("Failed to resolve config file: {}", path.display()))?;
    serde_json::from_value(raw)
        .with_context(|| format!("Invalid settings in config file: {}", path.display()))
}

/// Replace every `"env:VAR"` string with the value of `VAR`
fn resolve_env_refs<F>(value: &mut Value, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(text) => {
            if let Some(var_name) = text.strip_prefix("env:") {
                *text = lookup(var_name)
                    .ok_or_else(|| anyhow!("Environment variable not found: {}", var_name))?;
            }
        }
        Value::Array(items) => {
            for item in items {
                resolve_env_refs(item, lookup)?;
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                resolve_env_refs(item, lookup)?;
            }
        }
        _ => {}
    }
    Ok(())
}

struct EnvReader<'a, F> {
    lookup: &'a F,
}

impl<F> EnvReader<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty, trimmed value of `name`
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parse<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.string(name)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| anyhow!("Invalid value for {}: '{}' ({})", name, raw, e))
            })
            .transpose()
    }

    fn flag(&self, name: &str) -> Result<Option<bool>> {
        self.string(name)
            .map(|raw| match raw.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(anyhow!(
                    "Invalid value for {}: '{}' (expected true or false)",
                    name,
                    raw
                )),
            })
            .transpose()
    }
}

fn apply_env<F>(settings: &mut Settings, env: &EnvReader<'_, F>) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let ollama = &mut settings.ollama;
    if let Some(api_base) = env.string("OLLAMA_API_BASE") {
        ollama.api_base = api_base;
    }
    if let Some(model) = env.string("DEFAULT_MODEL") {
        ollama.default_model = model;
    }
    if let Some(temperature) = env.parse("MODEL_TEMPERATURE")? {
        ollama.temperature = temperature;
    }
    if let Some(max_tokens) = env.parse("MODEL_MAX_TOKENS")? {
        ollama.max_tokens = max_tokens;
    }
    if let Some(context_window) = env.parse("MODEL_CONTEXT_WINDOW")? {
        ollama.context_window = context_window;
    }

    let memory = &mut settings.memory;
    if let Some(max_history) = env.parse("MEMORY_MAX_HISTORY")? {
        memory.max_history = max_history;
    }
    if let Some(timeout) = env.parse("SESSION_TIMEOUT")? {
        memory.session_timeout_secs = timeout;
    }
    if let Some(enabled) = env.flag("ENABLE_CROSS_SESSION_MEMORY")? {
        memory.enable_cross_session = enabled;
    }
    if let Some(dir) = env.string("MEMORY_DIR") {
        memory.memory_dir = PathBuf::from(dir);
    }

    let endpoints = &mut settings.endpoints;
    if let Some(port) = env.parse("ADK_WEB_PORT")? {
        endpoints.base_port = port;
    }
    match env.parse("GOOGLE_SEARCH_AGENT_PORT")? {
        Some(port) => endpoints.search_port = port,
        None => {
            if let Some(port) = env.parse("ADK_A2A_PORT")? {
                endpoints.search_port = port;
            }
        }
    }
    if let Some(port) = env.parse("WEB_SCRAPER_AGENT_PORT")? {
        endpoints.scraper_port = port;
    }
    if let Some(url) = env.string("GOOGLE_SEARCH_AGENT_URL") {
        endpoints.search_agent_url = Some(url);
    }
    if let Some(url) = env.string("WEB_SCRAPER_AGENT_URL") {
        endpoints.scraper_agent_url = Some(url);
    }

    let search = &mut settings.search;
    if let Some(key) = env.string("GOOGLE_SEARCH_API_KEY") {
        search.api_key = Some(key);
    }
    if let Some(engine_id) = env.string("GOOGLE_SEARCH_ENGINE_ID") {
        search.engine_id = Some(engine_id);
    }
    if let Some(max_results) = env.parse("MAX_SEARCH_RESULTS")? {
        search.max_results = max_results;
    }
    if let Some(timeout) = env.parse("SEARCH_TIMEOUT")? {
        search.timeout_secs = timeout;
    }
    if let Some(model) = env.string("SEARCH_AGENT_MODEL") {
        search.model_override = Some(model);
    }
    if let Some(model) = env.string("SCRAPER_AGENT_MODEL") {
        settings.scraper.model_override = Some(model);
    }

    if let Some(max_steps) = env.parse("AGENT_MAX_STEPS")? {
        settings.agent.max_steps = max_steps;
    }

    Ok(())
}
