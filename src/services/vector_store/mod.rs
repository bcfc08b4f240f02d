//! Vector store abstraction layer.
//!
//! Records are written either to PostgreSQL with the pgvector extension (what a
//! Supabase project exposes) or to Qdrant, chosen by `vector_store.driver`.

mod pgvector;
mod qdrant;

pub use pgvector::PgVectorBackend;
pub use qdrant::QdrantBackend;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::VectorStoreError;
use crate::models::{Secrets, VectorDriver, VectorRecord, VectorStoreConfig};

/// Collection/table information
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub points_count: u64,
}

/// Abstract trait for vector store operations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check if the vector store is healthy and accessible.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Get information about the current collection/table.
    /// Returns None if the collection doesn't exist.
    async fn get_collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError>;

    /// Create the collection/table if it doesn't exist.
    async fn create_collection(&self) -> Result<(), VectorStoreError>;

    /// Insert or replace records by id.
    async fn upsert_records(&self, records: Vec<VectorRecord>) -> Result<(), VectorStoreError>;

    /// Remove every record belonging to the given documents.
    async fn delete_by_document_ids(&self, document_ids: &[String]) -> Result<(), VectorStoreError>;

    /// Remove every record from the collection.
    async fn clear_collection(&self) -> Result<(), VectorStoreError>;

    fn driver(&self) -> VectorDriver;

    /// Get the collection/table name.
    fn collection(&self) -> &str;

    /// Vector dimension the collection is created with.
    fn dimension(&self) -> usize;
}

/// Create a vector store backend based on configuration.
pub async fn create_backend(
    config: &VectorStoreConfig,
    secrets: &Secrets,
    dimension: usize,
) -> Result<Arc<dyn VectorStore>, VectorStoreError> {
    match config.driver {
        VectorDriver::Qdrant => {
            let api_key = secrets.qdrant_api_key.as_ref().map(|k| k.expose());
            let backend = QdrantBackend::new(config, api_key, dimension)?;
            Ok(Arc::new(backend))
        }
        VectorDriver::PostgreSQL => {
            let database_url = secrets.database_url.as_ref().ok_or_else(|| {
                VectorStoreError::ConnectionError("DATABASE_URL is not set".to_string())
            })?;
            let backend = PgVectorBackend::new(config, database_url.expose(), dimension).await?;
            Ok(Arc::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Secret;

    #[tokio::test]
    async fn test_postgres_requires_database_url() {
        let secrets = Secrets {
            openai_api_key: Secret::new("sk-test"),
            storage: None,
            gcs: None,
            database_url: None,
            qdrant_api_key: None,
        };
        let result = create_backend(&VectorStoreConfig::default(), &secrets, 1536).await;
        assert!(matches!(result, Err(VectorStoreError::ConnectionError(_))));
    }

    #[tokio::test]
    async fn test_qdrant_backend_is_lazy() {
        let secrets = Secrets {
            openai_api_key: Secret::new("sk-test"),
            storage: None,
            gcs: None,
            database_url: None,
            qdrant_api_key: None,
        };
        let config = VectorStoreConfig {
            driver: VectorDriver::Qdrant,
            ..Default::default()
        };
        let backend = create_backend(&config, &secrets, 8).await.unwrap();
        assert_eq!(backend.driver(), VectorDriver::Qdrant);
        assert_eq!(backend.collection(), "documents");
        assert_eq!(backend.dimension(), 8);
    }
}
