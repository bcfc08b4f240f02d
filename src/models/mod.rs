mod config;
mod document;
mod format;
mod report;
mod secrets;

pub use config::{
    ArchiveConfig, ArchiveDriver, ChunkingConfig, Config, DEFAULT_CHUNK_OVERLAP,
    DEFAULT_CHUNK_SIZE, DEFAULT_COLLECTION, DEFAULT_DOCS_DIR, DEFAULT_DOCS_GLOB,
    DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_URL,
    EmbeddingConfig, ErrorPolicy, OutputConfig, ResolvedConfig, SourceConfig, VectorDriver,
    VectorStoreConfig,
};
pub use document::{ArchivedDocument, Document, DocumentChunk, DocumentFormat, VectorRecord};
pub use format::OutputFormat;
pub use report::{DocumentSummary, RunReport, StoreHandle};
pub use secrets::{
    DATABASE_URL, EnvSecretProvider, FileSecretProvider, GCS_ACCESS_TOKEN, GCS_BUCKET_NAME,
    GcsSecrets, MapSecretProvider, OPENAI_API_KEY, QDRANT_API_KEY, STORAGE_BUCKET,
    SUPABASE_SERVICE_KEY, SUPABASE_URL, Secret, SecretProvider, Secrets, StorageSecrets,
};
