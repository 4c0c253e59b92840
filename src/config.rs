use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use pmmsherpa_core::embedding::{EMBEDDING_DIMENSIONS, EMBEDDING_MODEL};
use pmmsherpa_core::retrieval::{
    RetrievalOptions, SemanticOptions, DEFAULT_MATCH_THRESHOLD, DEFAULT_SEMANTIC_THRESHOLD,
    DEFAULT_SEMANTIC_WEIGHT, DEFAULT_TOP_K,
};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dims: default_dims(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_embedding_model() -> String {
    EMBEDDING_MODEL.to_string()
}
fn default_dims() -> usize {
    EMBEDDING_DIMENSIONS
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
    /// Threshold for the pure-vector `match_chunks` path.
    #[serde(default = "default_semantic_threshold")]
    pub semantic_threshold: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            semantic_weight: default_semantic_weight(),
            match_threshold: default_match_threshold(),
            semantic_threshold: default_semantic_threshold(),
        }
    }
}

impl RetrievalConfig {
    pub fn hybrid_options(&self) -> RetrievalOptions {
        RetrievalOptions {
            top_k: self.top_k,
            semantic_weight: self.semantic_weight,
            match_threshold: self.match_threshold,
        }
    }

    pub fn semantic_options(&self) -> SemanticOptions {
        SemanticOptions {
            top_k: self.top_k,
            match_threshold: self.semantic_threshold,
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_semantic_weight() -> f64 {
    DEFAULT_SEMANTIC_WEIGHT
}
fn default_match_threshold() -> f64 {
    DEFAULT_MATCH_THRESHOLD
}
fn default_semantic_threshold() -> f64 {
    DEFAULT_SEMANTIC_THRESHOLD
}

/// Where `hybrid_search` and `match_chunks` are executed.
///
/// - `rest`: PostgREST-style RPC over HTTP (`{url}/rest/v1/rpc/<name>`).
/// - `postgres`: direct SQL calls to the same procedures.
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_backend_kind")]
    pub kind: String,
    /// Project URL for the `rest` backend.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_service_key_env")]
    pub service_key_env: String,
    #[serde(default = "default_database_url_env")]
    pub database_url_env: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            url: None,
            service_key_env: default_service_key_env(),
            database_url_env: default_database_url_env(),
            max_connections: default_max_connections(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_backend_kind() -> String {
    "rest".to_string()
}
fn default_service_key_env() -> String {
    "SUPABASE_SERVICE_ROLE_KEY".to_string()
}
fn default_database_url_env() -> String {
    "DATABASE_URL".to_string()
}
fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Embedding
    if config.embedding.dims == 0 {
        bail!("embedding.dims must be > 0");
    }
    if config.embedding.model.trim().is_empty() {
        bail!("embedding.model must not be empty");
    }

    // Retrieval
    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.retrieval.semantic_weight) {
        bail!("retrieval.semantic_weight must be in [0.0, 1.0]");
    }
    if !(0.0..=1.0).contains(&config.retrieval.match_threshold) {
        bail!("retrieval.match_threshold must be in [0.0, 1.0]");
    }
    if !(0.0..=1.0).contains(&config.retrieval.semantic_threshold) {
        bail!("retrieval.semantic_threshold must be in [0.0, 1.0]");
    }

    // Backend
    match config.backend.kind.as_str() {
        "rest" => {
            if config.backend.url.as_deref().map_or(true, |u| u.trim().is_empty()) {
                bail!("backend.url must be set when backend.kind is 'rest'");
            }
        }
        "postgres" => {}
        other => bail!(
            "Unknown backend kind: '{}'. Must be rest or postgres.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let file = write_config("[backend]\nurl = \"https://kb.example.co\"\n");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.embedding.model, "text-embedding-3-small");
        assert_eq!(cfg.embedding.dims, 512);
        assert_eq!(cfg.retrieval.top_k, 8);
        assert_eq!(cfg.retrieval.semantic_weight, 0.7);
        assert_eq!(cfg.retrieval.match_threshold, 0.4);
        assert_eq!(cfg.retrieval.semantic_threshold, 0.5);
        assert_eq!(cfg.backend.kind, "rest");
        assert_eq!(cfg.server.bind, "127.0.0.1:7340");
        assert_eq!(cfg.logging.filter, "info");
    }

    #[test]
    fn test_rest_backend_requires_url() {
        let file = write_config("[retrieval]\ntop_k = 4\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("backend.url"));
    }

    #[test]
    fn test_postgres_backend_without_url_is_valid() {
        let file = write_config("[backend]\nkind = \"postgres\"\n");
        assert!(load_config(file.path()).is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_weight() {
        let file = write_config(
            "[backend]\nkind = \"postgres\"\n[retrieval]\nsemantic_weight = 1.5\n",
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("semantic_weight"));
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let file = write_config("[backend]\nkind = \"sqlite\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown backend kind"));
    }

    #[test]
    fn test_rejects_zero_dims_and_top_k() {
        let file = write_config("[backend]\nkind = \"postgres\"\n[embedding]\ndims = 0\n");
        assert!(load_config(file.path()).is_err());
        let file = write_config("[backend]\nkind = \"postgres\"\n[retrieval]\ntop_k = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = load_config(Path::new("/nonexistent/sherpa.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_retrieval_options_mapping() {
        let cfg = RetrievalConfig {
            top_k: 5,
            semantic_weight: 0.3,
            match_threshold: 0.2,
            semantic_threshold: 0.6,
        };
        assert_eq!(cfg.hybrid_options().semantic_weight, 0.3);
        assert_eq!(cfg.semantic_options().match_threshold, 0.6);
        assert_eq!(cfg.semantic_options().top_k, 5);
    }
}
