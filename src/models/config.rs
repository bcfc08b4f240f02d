use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::format::OutputFormat;
use crate::error::ConfigError;

pub const DEFAULT_DOCS_DIR: &str = "docs/";
pub const DEFAULT_DOCS_GLOB: &str = "**/*.md";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 0;
pub const DEFAULT_EMBEDDING_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1536;
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "documents";
pub const DEFAULT_GCS_ENDPOINT: &str = "https://storage.googleapis.com";
pub const PROJECT_CONFIG_FILE: &str = "docingest.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Configuration together with the file it was read from, if any.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub config: Config,
    pub path: Option<PathBuf>,
}

impl Config {
    pub fn project_path() -> PathBuf {
        PathBuf::from(PROJECT_CONFIG_FILE)
    }

    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("docingest").join("config.toml"))
    }

    /// Candidate config files in lookup order.
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![Self::project_path()];
        paths.extend(Self::global_path());
        paths
    }

    /// Load configuration from `explicit`, or the first existing candidate,
    /// or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load_from(path)?;
            return Ok(ResolvedConfig {
                config,
                path: Some(path.to_path_buf()),
            });
        }

        for path in Self::candidate_paths() {
            if path.exists() {
                let config = Self::load_from(&path)?;
                return Ok(ResolvedConfig {
                    config,
                    path: Some(path),
                });
            }
        }

        Ok(ResolvedConfig::default())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check every setting the pipeline depends on before any work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

        if self.chunking.chunk_size == 0 {
            return invalid("chunk_size must be greater than 0".to_string());
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return invalid(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            ));
        }
        if let Err(e) = glob::Pattern::new(&self.source.glob) {
            return invalid(format!("invalid glob '{}': {}", self.source.glob, e));
        }
        for pattern in &self.source.exclude_patterns {
            if let Err(e) = glob::Pattern::new(pattern) {
                return invalid(format!("invalid exclude pattern '{}': {}", pattern, e));
            }
        }
        if self.embedding.batch_size == 0 {
            return invalid("embedding batch_size must be greater than 0".to_string());
        }
        if self.embedding.dimension == 0 {
            return invalid("embedding dimension must be greater than 0".to_string());
        }
        if self.embedding.model.trim().is_empty() {
            return invalid("embedding model must not be empty".to_string());
        }
        if self.vector_store.write_batch_size == 0 {
            return invalid("vector_store write_batch_size must be greater than 0".to_string());
        }
        if !is_sql_identifier(&self.vector_store.collection) {
            return invalid(format!(
                "collection '{}' must be a plain identifier",
                self.vector_store.collection
            ));
        }
        if let Some(ref schema) = self.vector_store.schema
            && !is_sql_identifier(schema)
        {
            return invalid(format!("schema '{}' must be a plain identifier", schema));
        }
        if self.vector_store.driver == VectorDriver::Qdrant
            && self.vector_store.url.trim().is_empty()
        {
            return invalid("qdrant driver requires vector_store.url".to_string());
        }
        if self.archive.driver == ArchiveDriver::Local
            && self.archive.local_dir.as_os_str().is_empty()
        {
            return invalid("local archive driver requires archive.local_dir".to_string());
        }
        if self.archive.driver == ArchiveDriver::Gcs
            && !(self.archive.gcs_endpoint.starts_with("https://")
                || self.archive.gcs_endpoint.starts_with("http://"))
        {
            return invalid(format!(
                "archive.gcs_endpoint '{}' must be an http(s) URL",
                self.archive.gcs_endpoint
            ));
        }

        Ok(())
    }
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// What to do when a single document cannot be read or extracted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Log and skip the document.
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_docs_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_docs_glob")]
    pub glob: String,

    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default)]
    pub on_error: ErrorPolicy,
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DOCS_DIR)
}

fn default_docs_glob() -> String {
    DEFAULT_DOCS_GLOB.to_string()
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/.venv/**".to_string(),
    ]
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: default_docs_dir(),
            glob: default_docs_glob(),
            exclude_patterns: default_exclude_patterns(),
            max_file_size: default_max_file_size(),
            on_error: ErrorPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dimension")]
    pub dimension: u32,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Extra attempts for transient failures. 0 disables retrying.
    #[serde(default)]
    pub retry_attempts: u32,
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_batch_size() -> u32 {
    100
}

fn default_timeout() -> u64 {
    60
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout(),
            retry_attempts: 0,
        }
    }
}

/// Vector database driver type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorDriver {
    /// PostgreSQL with pgvector (Supabase)
    #[default]
    #[serde(alias = "postgres")]
    PostgreSQL,
    /// Qdrant
    Qdrant,
}

impl fmt::Display for VectorDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorDriver::PostgreSQL => write!(f, "postgresql"),
            VectorDriver::Qdrant => write!(f, "qdrant"),
        }
    }
}

impl std::str::FromStr for VectorDriver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" | "pgvector" => Ok(VectorDriver::PostgreSQL),
            "qdrant" => Ok(VectorDriver::Qdrant),
            _ => Err(format!("unknown vector driver: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub driver: VectorDriver,

    /// Qdrant endpoint. PostgreSQL connects through the DATABASE_URL secret.
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default = "default_pool_max")]
    pub pool_max: u32,

    #[serde(default = "default_pool_acquire_timeout")]
    pub pool_acquire_timeout: u32,

    #[serde(default = "default_write_batch_size")]
    pub write_batch_size: usize,

    /// Extra attempts per batch for transient failures. 0 disables retrying.
    #[serde(default)]
    pub retry_attempts: u32,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_pool_max() -> u32 {
    5
}

fn default_pool_acquire_timeout() -> u32 {
    30
}

fn default_write_batch_size() -> usize {
    100
}

impl VectorStoreConfig {
    /// Table name qualified by schema when one is configured.
    pub fn qualified_table_name(&self) -> String {
        match self.schema {
            Some(ref schema) => format!("{}.{}", schema, self.collection),
            None => self.collection.clone(),
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            driver: VectorDriver::default(),
            url: default_qdrant_url(),
            collection: default_collection(),
            schema: None,
            pool_max: default_pool_max(),
            pool_acquire_timeout: default_pool_acquire_timeout(),
            write_batch_size: default_write_batch_size(),
            retry_attempts: 0,
        }
    }
}

/// Blob storage driver type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveDriver {
    /// Supabase Storage over its REST API
    #[default]
    Supabase,
    /// Google Cloud Storage over its JSON API
    Gcs,
    /// Local directory, for offline runs
    Local,
}

impl fmt::Display for ArchiveDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveDriver::Supabase => write!(f, "supabase"),
            ArchiveDriver::Gcs => write!(f, "gcs"),
            ArchiveDriver::Local => write!(f, "local"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub driver: ArchiveDriver,

    /// Prefix prepended to every object key.
    #[serde(default)]
    pub prefix: String,

    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,

    /// Google Cloud Storage API endpoint; override for emulators.
    #[serde(default = "default_gcs_endpoint")]
    pub gcs_endpoint: String,

    /// Extra upload attempts for transient failures. 0 disables retrying.
    #[serde(default)]
    pub retry_attempts: u32,
}

fn default_local_dir() -> PathBuf {
    PathBuf::from(".docingest/archive")
}

fn default_gcs_endpoint() -> String {
    DEFAULT_GCS_ENDPOINT.to_string()
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            driver: ArchiveDriver::default(),
            prefix: String::new(),
            local_dir: default_local_dir(),
            gcs_endpoint: default_gcs_endpoint(),
            retry_attempts: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}
