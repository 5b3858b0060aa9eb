//! Configuration loading, validation, and management for studentdesk.
//!
//! Loads configuration from `~/.studentdesk/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.studentdesk/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generation backend
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Tier thresholds and timeouts
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Base instructions and user-facing language
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Knowledge store
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Structured reference data
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Conversation logging
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Session store bounds
    #[serde(default)]
    pub sessions: SessionConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// API key; usually supplied through the environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// HTTP client timeout
    #[serde(default = "default_sixty")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openai".into()
}
fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_sixty() -> u64 {
    60
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_sixty(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_faq_top_k")]
    pub faq_top_k: usize,

    /// Candidates below this score are not considered at all
    #[serde(default = "default_faq_similarity")]
    pub faq_similarity_threshold: f32,

    /// The best candidate must reach this score to be returned verbatim
    #[serde(default = "default_faq_confidence")]
    pub faq_confidence_threshold: f32,

    #[serde(default = "default_rag_top_k")]
    pub rag_top_k: usize,

    #[serde(default = "default_rag_relevance")]
    pub rag_relevance_threshold: f32,

    #[serde(default = "default_sixty")]
    pub generation_timeout_secs: u64,

    #[serde(default = "default_retrieval_timeout")]
    pub retrieval_timeout_secs: u64,
}

fn default_faq_top_k() -> usize {
    2
}
fn default_faq_similarity() -> f32 {
    0.7
}
fn default_faq_confidence() -> f32 {
    0.8
}
fn default_rag_top_k() -> usize {
    3
}
fn default_rag_relevance() -> f32 {
    0.01
}
fn default_retrieval_timeout() -> u64 {
    10
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            faq_top_k: default_faq_top_k(),
            faq_similarity_threshold: default_faq_similarity(),
            faq_confidence_threshold: default_faq_confidence(),
            rag_top_k: default_rag_top_k(),
            rag_relevance_threshold: default_rag_relevance(),
            generation_timeout_secs: default_sixty(),
            retrieval_timeout_secs: default_retrieval_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Overrides the built-in instructions for the selected locale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_prompt: Option<String>,

    /// `en` or `vi`
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_locale() -> String {
    "en".into()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            base_prompt: None,
            locale: default_locale(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// Deterministic token hashing, works offline
    #[default]
    Hashing,
    /// The provider's embeddings endpoint
    Provider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// JSONL file; in-memory only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_path: Option<PathBuf>,

    #[serde(default)]
    pub embedder: EmbedderKind,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Vector size for the hashing embedder
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_true")]
    pub seed_default_faqs: bool,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_dimensions() -> usize {
    256
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            persist_path: None,
            embedder: EmbedderKind::default(),
            embedding_model: default_embedding_model(),
            dimensions: default_dimensions(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            seed_default_faqs: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory with courses.json, exams.json, services.json, tuition.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./conversation_logs")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_dir: default_log_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Least recently updated sessions are evicted beyond this
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Sessions idle longer than this are dropped; 0 disables
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_secs: u64,
}

fn default_max_sessions() -> usize {
    1000
}
fn default_idle_ttl() -> u64 {
    86_400
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            idle_ttl_secs: default_idle_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    5001
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".into(),
        "http://127.0.0.1:3000".into(),
    ]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.studentdesk/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file path.
    ///
    /// Environment overrides are applied after the file is parsed:
    /// - `STUDENTDESK_API_KEY`, then `OPENAI_API_KEY`
    /// - `STUDENTDESK_MODEL`
    /// - `STUDENTDESK_API_URL`
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            Self::from_toml_str(&content).map_err(|e| match e {
                ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                    path: path.to_path_buf(),
                    reason,
                },
                other => other,
            })?
        } else {
            tracing::info!("No config file found at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document without touching the environment.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.provider.api_key.is_none() {
            self.provider.api_key = std::env::var("STUDENTDESK_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .filter(|k| !k.trim().is_empty());
        }

        if let Ok(model) = std::env::var("STUDENTDESK_MODEL") {
            self.provider.model = model;
        }

        if let Ok(url) = std::env::var("STUDENTDESK_API_URL") {
            self.provider.api_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".studentdesk")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.provider.temperature;
        if !(0.0..=2.0).contains(&t) {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let r = &self.routing;
        for (name, value) in [
            ("faq_similarity_threshold", r.faq_similarity_threshold),
            ("faq_confidence_threshold", r.faq_confidence_threshold),
            ("rag_relevance_threshold", r.rag_relevance_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "routing.{name} must be between 0.0 and 1.0"
                )));
            }
        }

        if r.faq_top_k == 0 || r.rag_top_k == 0 {
            return Err(ConfigError::ValidationError(
                "routing.faq_top_k and routing.rag_top_k must be at least 1".into(),
            ));
        }

        if r.generation_timeout_secs == 0
            || r.retrieval_timeout_secs == 0
            || self.provider.timeout_secs == 0
        {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than zero".into(),
            ));
        }

        let k = &self.knowledge;
        if k.chunk_size == 0 || k.chunk_overlap >= k.chunk_size {
            return Err(ConfigError::ValidationError(
                "knowledge.chunk_overlap must be smaller than a non-zero chunk_size".into(),
            ));
        }
        if k.dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.dimensions must be at least 1".into(),
            ));
        }

        if !matches!(self.prompt.locale.as_str(), "en" | "vi") {
            return Err(ConfigError::ValidationError(format!(
                "prompt.locale must be \"en\" or \"vi\", got \"{}\"",
                self.prompt.locale
            )));
        }

        if self.sessions.max_sessions == 0 {
            return Err(ConfigError::ValidationError(
                "sessions.max_sessions must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.gateway.port, 5001);
        assert_eq!(config.routing.faq_top_k, 2);
        assert!((config.routing.faq_confidence_threshold - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn config_roundtrip_toml() {
        let toml_str = AppConfig::default_toml();
        let parsed = AppConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.model, "gpt-4o-mini");
        assert_eq!(parsed.routing.rag_top_k, 3);
        assert_eq!(parsed.knowledge.chunk_size, 1000);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
[routing]
faq_confidence_threshold = 0.9

[prompt]
locale = "vi"
"#,
        )
        .unwrap();
        assert!((config.routing.faq_confidence_threshold - 0.9).abs() < f32::EPSILON);
        assert!((config.routing.faq_similarity_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.prompt.locale, "vi");
        assert_eq!(config.sessions.max_sessions, 1000);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.provider.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let mut config = AppConfig::default();
        config.routing.rag_relevance_threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("rag_relevance_threshold"));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut config = AppConfig::default();
        config.knowledge.chunk_overlap = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_locale_rejected() {
        let err = AppConfig::from_toml_str("[prompt]\nlocale = \"fr\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.provider.name, "openai");
    }

    #[test]
    fn load_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "[gateway]\nport = 8080\n\n[sessions]\nidle_ttl_secs = 60").unwrap();
        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.sessions.idle_ttl_secs, 60);
    }

    #[test]
    fn malformed_file_reports_path() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "[routing\nfaq_top_k = ").unwrap();
        let err = AppConfig::load_from(tmp.path()).unwrap_err();
        match err {
            ConfigError::ParseError { path, .. } => assert_eq!(path, tmp.path()),
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-secret-value".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret-value"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn embedder_kind_parses() {
        let config =
            AppConfig::from_toml_str("[knowledge]\nembedder = \"provider\"\n").unwrap();
        assert_eq!(config.knowledge.embedder, EmbedderKind::Provider);
    }
}
