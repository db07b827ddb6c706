//! TOML-based configuration for S.C.R.I.B.E
//!
//! This module provides declarative configuration for the server, the LLM
//! provider and the research pipeline via a TOML file (`scribe.toml`).
//! Every section and every key is optional; missing values fall back to the
//! defaults documented on each field.
//!
//! Secrets never live in the file: `llm.api_key_env` names the environment
//! variable that holds the key (`.env` is loaded first by the binary).
//!
//! # Hot Reloading
//!
//! Configuration changes are automatically detected and applied at runtime.
//! Use `ScribeConfigManager` for thread-safe access to the current
//! configuration. Each research request reads the snapshot current when it
//! starts, so a reload never changes a run in flight.

use arc_swap::ArcSwap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Root configuration structure loaded from scribe.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScribeConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub research: ResearchConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Default tracing filter; `RUST_LOG` overrides it
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    #[serde(rename = "openai")]
    OpenAI,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Ollama server URL, or the OpenAI-compatible API base (ending in `/v1`)
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable containing the API key (openai only,
    /// defaults to `OPENAI_API_KEY`)
    pub api_key_env: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout for every model call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_llm_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.1".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_llm_base_url(),
            model: default_model(),
            api_key_env: None,
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl LlmConfig {
    /// Name of the variable holding the API key.
    pub fn api_key_var(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY")
    }

    /// Read the API key from the environment, if set and non-empty.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(self.api_key_var())
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

// ============= Research Configuration =============

/// How search tasks reach the web.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// The model calls `web_search` itself (needs function calling)
    #[default]
    Tool,
    /// Results are fetched first and handed to the model in the prompt
    Prefetch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Upper bound on planned sub-queries
    #[serde(default = "default_searches_per_query")]
    pub searches_per_query: usize,

    #[serde(default = "default_results_per_search")]
    pub results_per_search: usize,

    /// Characters of research content the writer sees
    #[serde(default = "default_content_budget")]
    pub content_budget: usize,

    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,

    /// Deadline for the whole search stage
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,

    #[serde(default)]
    pub search_mode: SearchMode,

    /// Restrict searches to one site, e.g. "reddit.com"
    pub site_filter: Option<String>,

    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

fn default_searches_per_query() -> usize {
    3
}

fn default_results_per_search() -> usize {
    5
}

fn default_content_budget() -> usize {
    3000
}

fn default_max_query_chars() -> usize {
    500
}

fn default_search_timeout() -> u64 {
    120
}

fn default_max_tool_iterations() -> usize {
    4
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            searches_per_query: default_searches_per_query(),
            results_per_search: default_results_per_search(),
            content_budget: default_content_budget(),
            max_query_chars: default_max_query_chars(),
            search_timeout_secs: default_search_timeout(),
            search_mode: SearchMode::default(),
            site_filter: None,
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),
}

impl From<ConfigError> for crate::types::AppError {
    fn from(e: ConfigError) -> Self {
        crate::types::AppError::Configuration(e.to_string())
    }
}

impl ScribeConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ScribeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate bounds and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        let research = &self.research;
        let counts = [
            ("research.searches_per_query", research.searches_per_query),
            ("research.results_per_search", research.results_per_search),
            ("research.content_budget", research.content_budget),
            ("research.max_query_chars", research.max_query_chars),
            ("research.max_tool_iterations", research.max_tool_iterations),
        ];
        for (key, value) in counts {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be greater than zero",
                    key
                )));
            }
        }

        if research.search_timeout_secs == 0 || self.llm.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than zero".to_string(),
            ));
        }

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "llm.model must not be empty".to_string(),
            ));
        }

        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "llm.base_url must not be empty".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "llm.temperature must be between 0 and 2, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.provider == ProviderKind::OpenAI && self.llm.resolve_api_key().is_none() {
            return Err(ConfigError::MissingEnvVar(self.llm.api_key_var().to_string()));
        }

        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

// ============= Hot Reloading Configuration Manager =============

/// Thread-safe configuration manager with hot reloading support
pub struct ScribeConfigManager {
    config: Arc<ArcSwap<ScribeConfig>>,
    config_path: PathBuf,
    watcher: RwLock<Option<RecommendedWatcher>>,
}

impl ScribeConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        // Absolute path for reliable file watching
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(ConfigError::ReadError)?
                .join(path)
        };

        let config = ScribeConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
            watcher: RwLock::new(None),
        })
    }

    /// Create a config manager directly from a config (defaults, tests).
    /// This won't have file watching capabilities.
    pub fn from_config(config: ScribeConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from("scribe.toml"),
            watcher: RwLock::new(None),
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<ScribeConfig> {
        self.config.load_full()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Manually reload the configuration from disk.
    ///
    /// On error the previous configuration stays active.
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!("Reloading configuration from {:?}", self.config_path);

        let new_config = ScribeConfig::load(&self.config_path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Start watching for configuration file changes
    pub fn start_watching(&self) -> Result<(), ConfigError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let config_path = self.config_path.clone();
        let config_arc = Arc::clone(&self.config);
        let file_name = config_path.file_name().map(|n| n.to_os_string());

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if ours && (event.kind.is_modify() || event.kind.is_create()) {
                        // Debounced in the receiver
                        let _ = tx.send(());
                    }
                }
                Err(e) => {
                    error!("Config watcher error: {:?}", e);
                }
            }
        })?;

        // Watch the parent directory so editors that replace the file still trigger
        if let Some(parent) = self.config_path.parent() {
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }

        *self.watcher.write() = Some(watcher);

        tokio::spawn(async move {
            let mut last_reload: Option<std::time::Instant> = None;
            let debounce_duration = Duration::from_millis(500);

            while rx.recv().await.is_some() {
                if last_reload.is_some_and(|t| t.elapsed() < debounce_duration) {
                    continue;
                }

                // Let the writer finish
                tokio::time::sleep(Duration::from_millis(100)).await;

                match ScribeConfig::load(&config_path) {
                    Ok(new_config) => {
                        config_arc.store(Arc::new(new_config));
                        info!("Configuration hot-reloaded successfully");
                        last_reload = Some(std::time::Instant::now());
                    }
                    Err(e) => {
                        warn!(
                            "Failed to hot-reload config: {}. Keeping previous config.",
                            e
                        );
                    }
                }
            }
        });

        info!("Configuration hot-reload watcher started");
        Ok(())
    }

    /// Stop watching for configuration changes
    pub fn stop_watching(&self) {
        *self.watcher.write() = None;
        info!("Configuration hot-reload watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn full_config() -> &'static str {
        r#"
[server]
host = "0.0.0.0"
port = 8080
log_level = "debug"
log_format = "json"

[llm]
provider = "ollama"
base_url = "http://gpu-box:11434"
model = "qwen2.5:14b"
temperature = 0.3
request_timeout_secs = 60

[research]
searches_per_query = 4
results_per_search = 8
content_budget = 4000
max_query_chars = 300
search_timeout_secs = 90
search_mode = "prefetch"
site_filter = "reddit.com"
max_tool_iterations = 6
"#
    }

    #[test]
    fn test_parse_config() {
        let config = ScribeConfig::parse(full_config()).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert_eq!(config.llm.provider, ProviderKind::Ollama);
        assert_eq!(config.llm.model, "qwen2.5:14b");
        assert_eq!(config.llm.request_timeout_secs, 60);
        assert_eq!(config.research.searches_per_query, 4);
        assert_eq!(config.research.search_mode, SearchMode::Prefetch);
        assert_eq!(config.research.site_filter.as_deref(), Some("reddit.com"));
    }

    #[test]
    fn test_defaults() {
        let config = ScribeConfig::parse("").unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.server.log_format, LogFormat::Text);

        assert_eq!(config.llm.provider, ProviderKind::Ollama);
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.llm.request_timeout_secs, 120);

        assert_eq!(config.research.searches_per_query, 3);
        assert_eq!(config.research.results_per_search, 5);
        assert_eq!(config.research.content_budget, 3000);
        assert_eq!(config.research.max_query_chars, 500);
        assert_eq!(config.research.search_timeout_secs, 120);
        assert_eq!(config.research.search_mode, SearchMode::Tool);
        assert_eq!(config.research.max_tool_iterations, 4);
        assert_eq!(config, ScribeConfig::default());
    }

    #[test]
    fn test_zero_count_rejected() {
        let err = ScribeConfig::parse("[research]\nsearches_per_query = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("searches_per_query"));
    }

    #[test]
    fn test_empty_model_rejected() {
        let err = ScribeConfig::parse("[llm]\nmodel = \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("llm.model"));
    }

    #[test]
    fn test_openai_requires_key_env() {
        let content = r#"
[llm]
provider = "openai"
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
api_key_env = "SCRIBE_CONFIG_TEST_UNSET_KEY"
"#;
        let err = ScribeConfig::parse(content).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "SCRIBE_CONFIG_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_unknown_search_mode_is_parse_error() {
        let err = ScribeConfig::parse("[research]\nsearch_mode = \"psychic\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ScribeConfig::load("/definitely/not/here/scribe.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = ScribeConfig::parse(full_config()).unwrap();
        let rendered = config.to_toml().unwrap();
        assert_eq!(ScribeConfig::parse(&rendered).unwrap(), config);
    }

    #[test]
    fn test_manager_reload_keeps_previous_on_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[research]\nsearches_per_query = 5\n").unwrap();

        let manager = ScribeConfigManager::new(file.path()).unwrap();
        assert_eq!(manager.config().research.searches_per_query, 5);

        std::fs::write(file.path(), "[research]\nsearches_per_query = 2\n").unwrap();
        manager.reload().unwrap();
        assert_eq!(manager.config().research.searches_per_query, 2);

        std::fs::write(file.path(), "[research]\nsearches_per_query = 0\n").unwrap();
        assert!(manager.reload().is_err());
        assert_eq!(manager.config().research.searches_per_query, 2);
    }

    #[tokio::test]
    async fn test_stop_watching_drops_watcher() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[research]\nsearches_per_query = 5\n").unwrap();

        let manager = ScribeConfigManager::new(file.path()).unwrap();
        manager.start_watching().unwrap();
        assert!(manager.watcher.read().is_some());

        manager.stop_watching();
        assert!(manager.watcher.read().is_none());
        assert_eq!(manager.config().research.searches_per_query, 5);
    }

    #[test]
    fn test_config_manager_from_config() {
        let config = ScribeConfig::parse(full_config()).unwrap();
        let manager = ScribeConfigManager::from_config(config.clone());
        assert_eq!(*manager.config(), config);
    }
}
