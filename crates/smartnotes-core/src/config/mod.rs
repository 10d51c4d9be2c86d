//! Configuration system for smartnotes.
//!
//! Configuration is layered: defaults, then an optional file (TOML, JSON or
//! YAML), then environment variables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{NotesError, NotesResult};
use crate::traits::LlmConfig;

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Card store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    #[default]
    Memory,
    MongoDB,
}

/// Card store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub provider: StoreProvider,
    /// Connection string.
    pub url: String,
    pub database: String,
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: StoreProvider::Memory,
            url: "mongodb://127.0.0.1:27017".to_string(),
            database: "smartnotes".to_string(),
            collection: "flashcards".to_string(),
        }
    }
}

/// Review policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Due-card page size when the caller gives none.
    pub default_due_limit: usize,
    /// Upper bound on any requested page size.
    pub max_due_limit: usize,
    /// Consecutive successes after which a card counts as mastered.
    pub mastered_repetitions: u32,
    /// Upper bound on cards produced by one generation request.
    pub max_generated_cards: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            default_due_limit: 50,
            max_due_limit: 200,
            mastered_repetitions: 5,
            max_generated_cards: 50,
        }
    }
}

/// Bearer-token authentication.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Token to owner id.
    pub api_keys: HashMap<String, String>,
}

impl AuthConfig {
    /// Resolve a bearer token to its owner.
    pub fn owner_for(&self, token: &str) -> Option<&str> {
        self.api_keys.get(token).map(String::as_str)
    }

    /// Parse `token:owner,token:owner`.
    pub fn parse_keys(raw: &str) -> NotesResult<HashMap<String, String>> {
        let mut keys = HashMap::new();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (token, owner) = pair.split_once(':').ok_or_else(|| {
                NotesError::Configuration(format!(
                    "Invalid API key entry '{}', expected token:owner",
                    pair
                ))
            })?;
            let (token, owner) = (token.trim(), owner.trim());
            if token.is_empty() || owner.is_empty() {
                return Err(NotesError::Configuration(format!(
                    "Invalid API key entry '{}', token and owner must be non-empty",
                    pair
                )));
            }
            keys.insert(token.to_string(), owner.to_string());
        }
        Ok(keys)
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    /// Card generation is disabled when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
    pub review: ReviewConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> NotesResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| NotesError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| NotesError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| NotesError::Configuration(e.to_string())),
            _ => Err(NotesError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> NotesResult<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup.
    pub fn with_env_overrides<F>(mut self, var: F) -> NotesResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("SMARTNOTES_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("SMARTNOTES_PORT").or_else(|| var("PORT")) {
            self.server.port = port.parse().map_err(|_| {
                NotesError::Configuration(format!("Invalid port '{}'", port))
            })?;
        }

        if let Some(url) = var("MONGODB_URI") {
            self.store.url = url;
            self.store.provider = StoreProvider::MongoDB;
        }
        if let Some(provider) = var("SMARTNOTES_STORE") {
            self.store.provider = match provider.to_lowercase().as_str() {
                "memory" => StoreProvider::Memory,
                "mongodb" | "mongo" => StoreProvider::MongoDB,
                other => {
                    return Err(NotesError::Configuration(format!(
                        "Unknown store provider '{}'",
                        other
                    )))
                }
            };
        }
        if let Some(database) = var("SMARTNOTES_DATABASE") {
            self.store.database = database;
        }
        if let Some(collection) = var("SMARTNOTES_COLLECTION") {
            self.store.collection = collection;
        }

        if let Some(api_key) = var("GEMINI_API_KEY") {
            let llm = self.llm.get_or_insert_with(LlmConfig::default);
            llm.api_key = Some(api_key);
        }
        if let Some(model) = var("SMARTNOTES_LLM_MODEL") {
            let llm = self.llm.get_or_insert_with(LlmConfig::default);
            llm.model = model;
        }

        if let Some(limit) = var("SMARTNOTES_DUE_LIMIT") {
            self.review.default_due_limit = limit.parse().map_err(|_| {
                NotesError::Configuration(format!("Invalid due limit '{}'", limit))
            })?;
        }

        if let Some(keys) = var("SMARTNOTES_API_KEYS") {
            self.auth.api_keys.extend(AuthConfig::parse_keys(&keys)?);
        }

        Ok(self)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> NotesResult<()> {
        if self.review.default_due_limit == 0 || self.review.max_due_limit == 0 {
            return Err(NotesError::Configuration(
                "Due limits must be greater than zero".to_string(),
            ));
        }
        if self.review.default_due_limit > self.review.max_due_limit {
            return Err(NotesError::Configuration(
                "default_due_limit cannot exceed max_due_limit".to_string(),
            ));
        }
        if self.review.mastered_repetitions == 0 {
            return Err(NotesError::Configuration(
                "mastered_repetitions must be at least 1".to_string(),
            ));
        }
        if self.review.max_generated_cards == 0 {
            return Err(NotesError::Configuration(
                "max_generated_cards must be at least 1".to_string(),
            ));
        }
        if self.store.provider == StoreProvider::MongoDB && self.store.url.trim().is_empty() {
            return Err(NotesError::Configuration(
                "MongoDB store requires a connection string".to_string(),
            ));
        }
        Ok(())
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

/// Builder for AppConfig.
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set listener settings.
    pub fn server(mut self, config: ServerConfig) -> Self {
        self.config.server = config;
        self
    }

    /// Set card store settings.
    pub fn store(mut self, config: StoreConfig) -> Self {
        self.config.store = config;
        self
    }

    /// Enable card generation with the given model settings.
    pub fn llm(mut self, config: LlmConfig) -> Self {
        self.config.llm = Some(config);
        self
    }

    /// Set review policy.
    pub fn review(mut self, config: ReviewConfig) -> Self {
        self.config.review = config;
        self
    }

    /// Register a bearer token for an owner.
    pub fn api_key(mut self, token: impl Into<String>, owner: impl Into<String>) -> Self {
        self.config.auth.api_keys.insert(token.into(), owner.into());
        self
    }

    /// Validate and build.
    pub fn build(self) -> NotesResult<AppConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
