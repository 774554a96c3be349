// src/config.rs
//! File + env configuration for the bot.
//!
//! A single TOML file; every field has a default so a partial file (or no
//! file at all) still yields a runnable configuration. Secrets never live
//! in the file: `api_key = "ENV"` defers to the `ORACLE_API_KEY` env var.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Target content page; the feed adapter decides what to do with it.
    pub video_url: String,
    pub ledger_path: PathBuf,
    /// File-bridge inputs/outputs used when no live driver is attached.
    pub snapshot_path: PathBuf,
    pub outbox_path: PathBuf,
    /// Optional overrides for the built-in rule table / reply templates.
    pub rules_path: Option<PathBuf>,
    pub templates_path: Option<PathBuf>,
    pub engine: EngineConfig,
    pub oracle: OracleConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            video_url: String::new(),
            ledger_path: PathBuf::from("replied_comments.json"),
            snapshot_path: PathBuf::from("data/comments_snapshot.json"),
            outbox_path: PathBuf::from("data/reply_outbox.jsonl"),
            rules_path: None,
            templates_path: None,
            engine: EngineConfig::default(),
            oracle: OracleConfig::default(),
        }
    }
}

impl BotConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: BotConfig = toml::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg)
    }

    /// Absent config file is fine (defaults apply); a present-but-broken
    /// one is not, so the operator notices typos instead of silently
    /// running on defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// "lexicon" | "http" | "disabled"
    pub provider: String,
    /// Remote model endpoint, required for the http provider.
    pub endpoint: Option<String>,
    /// "ENV" means: read ORACLE_API_KEY at startup.
    pub api_key: String,
    /// Budget for real remote calls per day; cache hits are free.
    pub daily_limit: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: "lexicon".to_string(),
            endpoint: None,
            api_key: "ENV".to_string(),
            daily_limit: 200,
        }
    }
}

impl OracleConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        let trimmed = self.api_key.trim();
        if trimmed.eq_ignore_ascii_case("env") {
            std::env::var("ORACLE_API_KEY").ok()
        } else if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}
