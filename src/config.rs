use anyhow::{Context, Result};
use graph::QuerySettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File looked up in the repository directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "logdag.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
}

/// `[log]` table: which history to read and with what
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// git executable
    pub git: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub count: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        let query = QuerySettings::default();
        Self {
            git: "git".to_string(),
            reference: query.reference,
            count: query.count,
        }
    }
}

impl LogConfig {
    pub fn query_settings(&self) -> QuerySettings {
        QuerySettings {
            reference: self.reference.clone(),
            count: self.count,
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid configuration")
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("In config file {}", path.display()))
    }

    /// Load the explicit file, else `logdag.toml` in `repo` if present, else defaults
    pub fn resolve(explicit: Option<&Path>, repo: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        let candidate: PathBuf = repo.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "using repository config");
            return Self::load_from_file(&candidate);
        }
        Ok(Self::default())
    }
}
