use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::AskError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub transcript: TranscriptConfig,
}

/// Remote vector-match store. Missing url or key means "disabled".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub match_fn: String,
    pub match_count: usize,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            match_fn: "match_course_book_chunks".to_string(),
            match_count: 5,
            timeout_secs: 30,
        }
    }
}

impl RemoteConfig {
    /// Both endpoint and credential present
    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.api_key.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub url: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub timeout_secs: u64,
    /// Fragment embeddings in flight per request
    pub max_concurrent_embeddings: usize,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            generation_model: "qwen2.5:7b-instruct".to_string(),
            timeout_secs: 120,
            max_concurrent_embeddings: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum context items kept after ranking
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 8 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("temp.txt"),
        }
    }
}

impl Config {
    /// Load configuration from the default location, then apply environment overrides.
    /// A missing file yields defaults.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path, then apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&contents).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.apply_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;

        Ok(home.join(".askbuddy").join("config.toml"))
    }

    /// Apply overrides from a key lookup (the process environment in production).
    /// Blank values count as unset.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> std::result::Result<(), AskError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(url) = get("SUPABASE_URL") {
            self.remote.url = Some(url);
        }
        if let Some(key) = get("SUPABASE_ANON_KEY") {
            self.remote.api_key = Some(key);
        }
        if let Some(match_fn) = get("SUPABASE_MATCH_FN") {
            self.remote.match_fn = match_fn;
        }
        if let Some(count) = get("SUPABASE_MATCH_COUNT") {
            self.remote.match_count = count.parse().map_err(|_| {
                AskError::ConfigError(format!("SUPABASE_MATCH_COUNT is not a number: {}", count))
            })?;
        }
        if let Some(url) = get("OLLAMA_URL") {
            self.ollama.url = url;
        }

        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), AskError> {
        if self.remote.match_count == 0 {
            return Err(AskError::ConfigError(
                "remote.match_count must be positive".to_string(),
            ));
        }
        if self.ollama.max_concurrent_embeddings == 0 {
            return Err(AskError::ConfigError(
                "ollama.max_concurrent_embeddings must be positive".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(AskError::ConfigError(
                "retrieval.top_k must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
