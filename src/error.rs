//! Error types for the document ingestion pipeline.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to configuration and secrets.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("missing secret: {0}")]
    MissingSecret(String),

    #[error("invalid secret {key}: {reason}")]
    InvalidSecret { key: String, reason: String },
}

/// Errors raised while discovering documents on disk.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source directory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("directory walk error: {0}")]
    WalkError(String),
}

/// Errors raised while reading a document or extracting its text.
///
/// Every variant carries the path of the offending file.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exceeds maximum size: {size} > {max}", path.display())]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("{} is not valid UTF-8", path.display())]
    InvalidEncoding { path: PathBuf },

    #[error("failed to parse PDF {}: {message}", path.display())]
    Pdf { path: PathBuf, message: String },
}

impl ExtractionError {
    /// Path of the document that failed.
    pub fn path(&self) -> &Path {
        match self {
            ExtractionError::Io { path, .. }
            | ExtractionError::FileTooLarge { path, .. }
            | ExtractionError::InvalidEncoding { path }
            | ExtractionError::Pdf { path, .. } => path,
        }
    }
}

/// Errors related to archiving original documents in blob storage.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("blob storage unreachable while uploading {name}: {message}")]
    Unreachable { name: String, message: String },

    #[error("permission denied uploading {name} (status {status})")]
    PermissionDenied { name: String, status: u16 },

    #[error("upload of {name} failed with status {status}: {body}")]
    Upload {
        name: String,
        status: u16,
        body: String,
    },

    #[error("failed to write archive file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid archive configuration: {0}")]
    Config(String),
}

impl Retryable for ArchiveError {
    fn is_retryable(&self) -> bool {
        match self {
            ArchiveError::Unreachable { .. } => true,
            ArchiveError::Upload { status, .. } => *status == 429 || *status >= 500,
            ArchiveError::PermissionDenied { .. }
            | ArchiveError::Io { .. }
            | ArchiveError::Config(_) => false,
        }
    }
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding API: {0}")]
    ConnectionError(String),

    #[error("embedding API rejected credentials: {0}")]
    Authentication(String),

    #[error("embedding API rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("embedding API error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_)
            | EmbeddingError::Timeout
            | EmbeddingError::RateLimited(_) => true,
            EmbeddingError::ServerError(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.to_lowercase().contains("unavailable")
            }
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::Authentication(_) | EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors related to vector store operations, including write preconditions.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector store: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("delete error: {0}")]
    DeleteError(String),

    #[error("Qdrant client error: {0}")]
    ClientError(String),

    #[error("PostgreSQL error: {0}")]
    PostgresError(String),

    #[error("pgvector extension error: {0}")]
    PgVectorExtensionError(String),

    #[error("{chunks} chunks but {vectors} embedding vectors")]
    LengthMismatch { chunks: usize, vectors: usize },

    #[error("vector {index} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("no archive locator for document {0}")]
    MissingLocator(String),
}

impl Retryable for VectorStoreError {
    fn is_retryable(&self) -> bool {
        match self {
            VectorStoreError::ConnectionError(_) => true,
            VectorStoreError::CollectionError(msg)
            | VectorStoreError::UpsertError(msg)
            | VectorStoreError::DeleteError(msg)
            | VectorStoreError::ClientError(msg)
            | VectorStoreError::PostgresError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("unavailable")
            }
            VectorStoreError::PgVectorExtensionError(_)
            | VectorStoreError::LengthMismatch { .. }
            | VectorStoreError::DimensionMismatch { .. }
            | VectorStoreError::MissingLocator(_) => false,
        }
    }
}

/// Top-level error of an ingestion run; wraps the failing component's error.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("write error: {0}")]
    Write(#[from] VectorStoreError),

    #[error("background task failed: {0}")]
    Task(String),

    #[error("pipeline cannot run from state {0}")]
    AlreadyRun(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_names_path() {
        let err = ExtractionError::Pdf {
            path: PathBuf::from("docs/broken.pdf"),
            message: "bad xref".to_string(),
        };
        assert_eq!(err.path(), Path::new("docs/broken.pdf"));
        assert!(err.to_string().contains("docs/broken.pdf"));
    }

    #[test]
    fn test_authentication_is_not_retryable() {
        assert!(!EmbeddingError::Authentication("bad key".to_string()).is_retryable());
        assert!(EmbeddingError::RateLimited("slow down".to_string()).is_retryable());
        assert!(EmbeddingError::Timeout.is_retryable());
    }

    #[test]
    fn test_archive_error_retryable() {
        let upload = |status| ArchiveError::Upload {
            name: "a.md".to_string(),
            status,
            body: String::new(),
        };
        assert!(upload(503).is_retryable());
        assert!(!upload(400).is_retryable());
        assert!(
            !ArchiveError::PermissionDenied {
                name: "a.md".to_string(),
                status: 403
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_precondition_errors_not_retryable() {
        let err = VectorStoreError::LengthMismatch {
            chunks: 3,
            vectors: 2,
        };
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "3 chunks but 2 embedding vectors");
    }

    #[test]
    fn test_ingest_error_wraps_source() {
        let err: IngestError = EmbeddingError::Authentication("401".to_string()).into();
        assert!(matches!(err, IngestError::Embedding(_)));
        assert!(err.to_string().starts_with("embedding error"));
    }
}
