use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `[server]` block of config.toml.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub db_path: Option<PathBuf>,
    pub cache_ttl_secs: u64,
    pub query_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            db_path: None,
            cache_ttl_secs: 300,
            query_timeout_ms: 10_000,
        }
    }
}

impl ServerConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// `[client]` block of config.toml.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the filter server.
    pub api_at: String,
    pub timeout_secs: u64,
    /// YAML filter configuration; the built-in one is used when unset.
    pub filters_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_at: "http://127.0.0.1:3000".to_string(),
            timeout_secs: 30,
            filters_path: None,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level cartalex config file structure.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CartalexConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
}

impl CartalexConfig {
    /// Load config from ~/.cartalex/config.toml. Returns default if file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(CartalexConfig::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn display(&self) -> String {
        let mut lines = vec!["[server]".to_string()];
        lines.push(format!("  bind = \"{}\"", self.server.bind));
        match self.server.db_path {
            Some(ref path) => lines.push(format!("  db_path = \"{}\"", path.display())),
            None => lines.push("  db_path = (default)".to_string()),
        }
        lines.push(format!("  cache_ttl_secs = {}", self.server.cache_ttl_secs));
        lines.push(format!("  query_timeout_ms = {}", self.server.query_timeout_ms));

        lines.push("[client]".to_string());
        lines.push(format!("  api_at = \"{}\"", self.client.api_at));
        lines.push(format!("  timeout_secs = {}", self.client.timeout_secs));
        match self.client.filters_path {
            Some(ref path) => lines.push(format!("  filters_path = \"{}\"", path.display())),
            None => lines.push("  filters_path = (built-in)".to_string()),
        }
        lines.join("\n")
    }
}

/// Resolve a setting through the chain: CLI flag > env var > config value.
pub fn resolve_setting(cli_flag: Option<&str>, env_var_name: &str, config_value: &str) -> String {
    if let Some(value) = cli_flag.filter(|v| !v.is_empty()) {
        return value.to_string();
    }
    match std::env::var(env_var_name) {
        Ok(value) if !value.is_empty() => value,
        _ => config_value.to_string(),
    }
}

/// Path to the config file: ~/.cartalex/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".cartalex").join("config.toml"))
}

/// Default config template content.
pub fn default_config_template() -> &'static str {
    r#"# ~/.cartalex/config.toml
# Resolution order: CLI flag > env var > this file > built-in default

[server]
# bind = "127.0.0.1:3000"
# db_path = "/var/lib/cartalex/cartalex.db"   # or CARTALEX_DB
# cache_ttl_secs = 300
# query_timeout_ms = 10000

[client]
# api_at = "http://127.0.0.1:3000"            # or CARTALEX_API
# timeout_secs = 30
# filters_path = "/etc/cartalex/filters.yaml"
"#
}

/// Create the default config file if it doesn't already exist.
pub fn init_config() -> Result<bool> {
    let path = config_path()?;
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, default_config_template())?;
    Ok(true)
}
