use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Root configuration structure, deserialized from `.license-ledger/config.toml`.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Decisions file, relative to the project directory unless absolute.
    #[serde(default = "default_decisions_file")]
    pub decisions_file: PathBuf,
    /// How inherited decision logs are fetched.
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Settings for fetching `http(s)://` inheritance sources.
#[derive(Debug, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds. Unset means requests never time out.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_decisions_file() -> PathBuf {
    PathBuf::from("doc").join("dependency_decisions.json")
}

fn default_user_agent() -> String {
    format!("license-ledger/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            decisions_file: default_decisions_file(),
            fetch: FetchConfig::default(),
        }
    }
}

impl Config {
    /// Location of the decisions file for `project_path`.
    pub fn decisions_path(&self, project_path: &Path) -> PathBuf {
        project_path.join(&self.decisions_file)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch.timeout_secs.map(Duration::from_secs)
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<project_path>/.license-ledger/config.toml`
/// 3. `~/.config/license-ledger/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_path.join(".license-ledger").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("license-ledger")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    tracing::debug!(path = %path.display(), "loading config");
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))
}
