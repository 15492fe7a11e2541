//! TOML configuration for repolore.
//!
//! Every field has a serde default so embedding applications only spell
//! out what they change; secrets fall back to environment variables
//! (`GITHUB_TOKEN`, `GEMINI_API_KEY`) when absent from the file.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    /// Personal access token; falls back to `GITHUB_TOKEN` when unset.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Concurrent blob fetches during tree traversal. Kept in the 3 to 5
    /// band to respect host rate limits.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// How many of the newest commits a poll considers.
    #[serde(default = "default_commit_limit")]
    pub commit_limit: usize,
    #[serde(default = "default_diff_timeout_secs")]
    pub diff_timeout_secs: u64,
    #[serde(default = "default_ignore_globs")]
    pub ignore_globs: Vec<String>,
    #[serde(default = "default_github_api_base")]
    pub api_base: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            branch: default_branch(),
            max_concurrency: default_max_concurrency(),
            commit_limit: default_commit_limit(),
            diff_timeout_secs: default_diff_timeout_secs(),
            ignore_globs: default_ignore_globs(),
            api_base: default_github_api_base(),
        }
    }
}

fn default_branch() -> String {
    "main".to_string()
}
fn default_max_concurrency() -> usize {
    3
}
fn default_commit_limit() -> usize {
    10
}
fn default_diff_timeout_secs() -> u64 {
    30
}
fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

/// Paths never worth summarizing: VCS metadata, dependency directories,
/// lock files, and binary formats.
fn default_ignore_globs() -> Vec<String> {
    [
        ".gitignore",
        "node_modules/**",
        "package-lock.json",
        "yarn.lock",
        ".DS_Store",
        ".git/**",
        "*.png",
        "*.jpg",
        "*.jpeg",
        "*.gif",
        "*.svg",
        "*.ico",
        "*.pdf",
        "*.zip",
        "*.tar.gz",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    /// API key; falls back to `GEMINI_API_KEY` when unset.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dims")]
    pub embedding_dims: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_gemini_api_base")]
    pub api_base: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            embedding_model: default_embedding_model(),
            embedding_dims: default_embedding_dims(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            api_base: default_gemini_api_base(),
        }
    }
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}
fn default_embedding_dims() -> usize {
    768
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    600
}

impl GithubConfig {
    /// Resolve the token to use for a run: explicit argument first, then
    /// the config file, then the `GITHUB_TOKEN` environment variable.
    pub fn resolve_token(&self, explicit: Option<&str>) -> Result<String> {
        if let Some(t) = explicit {
            if !t.trim().is_empty() {
                return Ok(t.to_string());
            }
        }
        if let Some(t) = &self.token {
            if !t.trim().is_empty() {
                return Ok(t.clone());
            }
        }
        match std::env::var("GITHUB_TOKEN") {
            Ok(t) if !t.trim().is_empty() => Ok(t),
            _ => Err(Error::MissingToken),
        }
    }
}

impl GeminiConfig {
    /// Resolve the API key: config file first, then `GEMINI_API_KEY`.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(k) = &self.api_key {
            if !k.trim().is_empty() {
                return Ok(k.clone());
            }
        }
        match std::env::var("GEMINI_API_KEY") {
            Ok(k) if !k.trim().is_empty() => Ok(k),
            _ => Err(Error::Config(
                "gemini.api_key not set and GEMINI_API_KEY missing from environment".to_string(),
            )),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.github.max_concurrency < 3 || config.github.max_concurrency > 5 {
        return Err(Error::Config(
            "github.max_concurrency must be between 3 and 5".to_string(),
        ));
    }

    if config.github.commit_limit == 0 {
        return Err(Error::Config("github.commit_limit must be > 0".to_string()));
    }

    if config.gemini.embedding_dims == 0 {
        return Err(Error::Config("gemini.embedding_dims must be > 0".to_string()));
    }

    if config.poll.interval_secs == 0 {
        return Err(Error::Config("poll.interval_secs must be > 0".to_string()));
    }

    Ok(())
}
