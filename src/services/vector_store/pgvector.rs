use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;

use super::{CollectionInfo, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{VectorDriver, VectorRecord, VectorStoreConfig};

pub struct PgVectorBackend {
    pool: PgPool,
    table_name: String,
    collection: String,
    dimension: usize,
}

impl PgVectorBackend {
    pub async fn new(
        config: &VectorStoreConfig,
        database_url: &str,
        dimension: usize,
    ) -> Result<Self, VectorStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_max)
            .acquire_timeout(Duration::from_secs(config.pool_acquire_timeout.into()))
            .connect(database_url)
            .await
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        let backend = Self {
            pool,
            table_name: config.qualified_table_name(),
            collection: config.collection.clone(),
            dimension,
        };

        backend.check_pgvector_extension().await?;

        if let Some(ref schema) = config.schema {
            backend.ensure_schema(schema).await?;
        }

        Ok(backend)
    }

    async fn check_pgvector_extension(&self) -> Result<(), VectorStoreError> {
        let result: Option<(String,)> =
            sqlx::query_as("SELECT extname FROM pg_extension WHERE extname = 'vector'")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| VectorStoreError::PostgresError(e.to_string()))?;

        if result.is_none() {
            return Err(VectorStoreError::PgVectorExtensionError(
                "pgvector extension is not installed. Run: CREATE EXTENSION vector;".to_string(),
            ));
        }

        Ok(())
    }

    async fn ensure_schema(&self, schema: &str) -> Result<(), VectorStoreError> {
        let query = format!("CREATE SCHEMA IF NOT EXISTS {}", schema);
        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| VectorStoreError::PostgresError(e.to_string()))?;
        Ok(())
    }
}

fn create_table_sql(table_name: &str, dimension: usize) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id UUID PRIMARY KEY,
            content TEXT NOT NULL,
            metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb,
            embedding vector({}) NOT NULL
        )
        "#,
        table_name, dimension
    )
}

fn create_index_sql(collection: &str, table_name: &str) -> [String; 2] {
    [
        format!(
            "CREATE INDEX IF NOT EXISTS {}_embedding_idx ON {} USING hnsw (embedding vector_cosine_ops)",
            collection, table_name
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {}_document_id_idx ON {} ((metadata->>'document_id'))",
            collection, table_name
        ),
    ]
}

fn upsert_sql(table_name: &str) -> String {
    format!(
        r#"
        INSERT INTO {} (id, content, metadata, embedding)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE SET
            content = EXCLUDED.content,
            metadata = EXCLUDED.metadata,
            embedding = EXCLUDED.embedding
        "#,
        table_name
    )
}

fn delete_by_document_sql(table_name: &str) -> String {
    format!(
        "DELETE FROM {} WHERE metadata->>'document_id' = ANY($1)",
        table_name
    )
}

#[async_trait]
impl VectorStore for PgVectorBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn get_collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError> {
        let (table,): (Option<String>,) = sqlx::query_as("SELECT to_regclass($1)::text")
            .bind(&self.table_name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| VectorStoreError::PostgresError(e.to_string()))?;

        if table.is_none() {
            return Ok(None);
        }

        let query = format!("SELECT COUNT(*) as count FROM {}", self.table_name);
        let row: (i64,) = sqlx::query_as(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| VectorStoreError::PostgresError(e.to_string()))?;

        Ok(Some(CollectionInfo {
            points_count: row.0 as u64,
        }))
    }

    async fn create_collection(&self) -> Result<(), VectorStoreError> {
        if self.get_collection_info().await?.is_some() {
            return Ok(());
        }

        tracing::info!(table = %self.table_name, dimension = self.dimension, "creating table");

        sqlx::query(&create_table_sql(&self.table_name, self.dimension))
            .execute(&self.pool)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        for index_sql in &create_index_sql(&self.collection, &self.table_name) {
            sqlx::query(index_sql)
                .execute(&self.pool)
                .await
                .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;
        }

        Ok(())
    }

    async fn upsert_records(&self, records: Vec<VectorRecord>) -> Result<(), VectorStoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let query = upsert_sql(&self.table_name);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        for record in records {
            let id = uuid::Uuid::parse_str(&record.id)
                .map_err(|e| VectorStoreError::UpsertError(format!("Invalid UUID: {}", e)))?;

            sqlx::query(&query)
                .bind(id)
                .bind(&record.content)
                .bind(Json(&record.metadata))
                .bind(Vector::from(record.embedding))
                .execute(&mut *tx)
                .await
                .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn delete_by_document_ids(&self, document_ids: &[String]) -> Result<(), VectorStoreError> {
        if document_ids.is_empty() {
            return Ok(());
        }

        let result = sqlx::query(&delete_by_document_sql(&self.table_name))
            .bind(document_ids)
            .execute(&self.pool)
            .await
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;

        tracing::debug!(deleted = result.rows_affected(), "removed previous records");
        Ok(())
    }

    async fn clear_collection(&self) -> Result<(), VectorStoreError> {
        if self.get_collection_info().await?.is_none() {
            return Ok(());
        }

        let query = format!("TRUNCATE TABLE {}", self.table_name);
        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;

        Ok(())
    }

    fn driver(&self) -> VectorDriver {
        VectorDriver::PostgreSQL
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql("rag.documents", 1536);
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS rag.documents"));
        assert!(sql.contains("metadata JSONB"));
        assert!(sql.contains("embedding vector(1536)"));
        assert!(sql.contains("'{}'::jsonb"));
    }

    #[test]
    fn test_index_sql_uses_cosine() {
        let [embedding, document] = create_index_sql("documents", "documents");
        assert!(embedding.contains("hnsw (embedding vector_cosine_ops)"));
        assert!(document.contains("metadata->>'document_id'"));
    }

    #[test]
    fn test_delete_by_document_uses_indexed_expression() {
        let sql = delete_by_document_sql("rag.documents");
        assert_eq!(
            sql,
            "DELETE FROM rag.documents WHERE metadata->>'document_id' = ANY($1)"
        );
    }

    #[test]
    fn test_upsert_sql_replaces_on_conflict() {
        let sql = upsert_sql("documents");
        assert!(sql.contains("ON CONFLICT (id) DO UPDATE"));
        assert!(sql.contains("VALUES ($1, $2, $3, $4)"));
    }
}
