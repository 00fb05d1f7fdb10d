//! Configuration management for ragline.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - A YAML config file (`ragline.yaml`, or the path in `RAGLINE_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Everything here is read once at startup and then shared read-only.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "ragline.yaml";

/// Completion providers the service knows how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["gemini", "ollama"];

/// Embedding providers usable for query embeddings.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["trigram", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Config file that was merged, if any
    pub config_file: Option<PathBuf>,

    /// Language model settings
    pub llm: LlmSettings,

    /// Index and retrieval settings
    pub retrieval: RetrievalSettings,

    /// Answer normalization constants
    pub answer: AnswerSettings,

    /// HTTP listener settings
    pub server: ServerSettings,

    /// Explicit API key (`RAGLINE_API_KEY`), wins over `llm.api_key_env`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,
}

/// Language model settings (`llm:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    /// Provider identifier ("gemini", "ollama")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom endpoint; provider default when absent
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Upper bound for a single generation call
    pub timeout_secs: u64,

    /// Output token cap (`maxOutputTokens` / `num_predict`); provider default when absent
    pub max_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            endpoint: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            temperature: 0.2,
            timeout_secs: 60,
            max_tokens: None,
        }
    }
}

/// Retrieval settings (`retrieval:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Path to the pre-built SQLite index
    pub index_path: PathBuf,

    /// Number of chunks handed to the model
    pub top_k: usize,

    /// Query embedding settings; must match how the index was built
    pub embedding: EmbeddingSettings,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("data/index.sqlite"),
            top_k: 4,
            embedding: EmbeddingSettings::default(),
        }
    }
}

/// Query embedding settings (`retrieval.embedding:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider identifier ("trigram", "ollama")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Vector dimensions
    pub dimensions: usize,

    /// Custom endpoint for remote providers
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// Answer normalization constants (`answer:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnswerSettings {
    /// Confidence used when the model omits or garbles `confidence`
    pub default_confidence: f64,

    /// Confidence of an answer extracted from retrieved context
    pub fallback_confidence: f64,

    /// Confidence of the refusal answer when there is no context at all
    pub refusal_confidence: f64,

    /// Characters of context kept by fallback extraction
    pub fallback_max_chars: usize,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            default_confidence: 0.6,
            fallback_confidence: 0.4,
            refusal_confidence: 0.1,
            fallback_max_chars: 700,
        }
    }
}

/// HTTP listener settings (`server:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSettings>,
    retrieval: Option<RetrievalSettings>,
    answer: Option<AnswerSettings>,
    server: Option<ServerSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

/// Command-line overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub index_path: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub log_level: Option<String>,
    pub verbose: bool,
    pub no_color: bool,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            llm: LlmSettings::default(),
            retrieval: RetrievalSettings::default(),
            answer: AnswerSettings::default(),
            server: ServerSettings::default(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and environment variables.
    ///
    /// Environment variables:
    /// - `RAGLINE_CONFIG`: Path to config file
    /// - `RAGLINE_PROVIDER`: LLM provider
    /// - `RAGLINE_MODEL`: Model identifier (`GEMINI_MODEL` is honored too)
    /// - `RAGLINE_INDEX`: Index path
    /// - `RAGLINE_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use ragline_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None).expect("Failed to load config");
    /// println!("Index: {:?}", config.retrieval.index_path);
    /// ```
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        let lookup = |key: &str| std::env::var(key).ok();

        let explicit = config_file
            .map(Path::to_path_buf)
            .or_else(|| lookup("RAGLINE_CONFIG").map(PathBuf::from));

        let config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                Self::default().merge_yaml(&path)?
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::default().merge_yaml(&path)?
                } else {
                    Self::default()
                }
            }
        };

        Ok(config.apply_env(lookup))
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let mut result = self.merge_yaml_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        result.config_file = Some(path.to_path_buf());

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        // An empty file deserializes to null, not to an empty mapping
        let config_file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        let mut result = self.clone();

        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }
        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(answer) = config_file.answer {
            result.answer = answer;
        }
        if let Some(server) = config_file.server {
            result.server = server;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        Ok(result)
    }

    /// Apply environment overrides using the given variable lookup.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("RAGLINE_PROVIDER") {
            self.llm.provider = provider;
        }

        if let Some(model) = lookup("RAGLINE_MODEL").or_else(|| lookup("GEMINI_MODEL")) {
            let model = model.trim().to_string();
            if !model.is_empty() {
                self.llm.model = model;
            }
        }

        if let Some(index) = lookup("RAGLINE_INDEX") {
            self.retrieval.index_path = PathBuf::from(index);
        }

        if let Some(key) = lookup("RAGLINE_API_KEY") {
            self.api_key = Some(key);
        }

        if self.log_level.is_none() {
            self.log_level = lookup("RUST_LOG");
        }

        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }

        self
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over the config file and environment.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(index_path) = overrides.index_path {
            self.retrieval.index_path = index_path;
        }

        if let Some(provider) = overrides.provider {
            self.llm.provider = provider;
        }

        if let Some(model) = overrides.model {
            self.llm.model = model;
        }

        if let Some(log_level) = overrides.log_level {
            self.log_level = Some(log_level);
        }

        if overrides.verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            self.no_color = true;
        }

        if overrides.log_json {
            self.log_json = true;
        }

        self
    }

    /// Resolve the API key for the active provider.
    ///
    /// `RAGLINE_API_KEY` wins; otherwise the variable named by
    /// `llm.apiKeyEnv` is read. Blank values count as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|key| std::env::var(key).ok())
    }

    fn resolve_api_key_with<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.api_key
            .clone()
            .or_else(|| lookup(&self.llm.api_key_env))
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.llm.provider.to_lowercase();
        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        let embedding = self.retrieval.embedding.provider.to_lowercase();
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&embedding.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.retrieval.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.llm.model.trim().is_empty() {
            return Err(AppError::Config("Model identifier is empty".to_string()));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AppError::Config(format!(
                "Temperature must be within 0.0-2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(AppError::Config("timeoutSecs must be positive".to_string()));
        }

        if self.llm.max_tokens == Some(0) {
            return Err(AppError::Config("maxTokens must be positive".to_string()));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("topK must be positive".to_string()));
        }

        if self.retrieval.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be positive".to_string(),
            ));
        }

        if self.answer.fallback_max_chars == 0 {
            return Err(AppError::Config(
                "fallbackMaxChars must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
