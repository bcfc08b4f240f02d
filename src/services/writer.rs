//! Pairs chunks with their embeddings and archive locators and persists them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::VectorStoreError;
use crate::models::{DocumentChunk, StoreHandle, VectorRecord};
use crate::services::vector_store::VectorStore;
use crate::utils::retry::{RetryConfig, with_retry};

/// Writes embedded chunks into a vector store.
pub struct VectorStoreWriter {
    store: Arc<dyn VectorStore>,
    batch_size: usize,
    retry: RetryConfig,
}

impl VectorStoreWriter {
    pub fn new(store: Arc<dyn VectorStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            retry: RetryConfig::none(),
        }
    }

    /// Retry each batch on transient store errors. Upserts are keyed by
    /// record id, so a repeated batch replaces rather than duplicates.
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Persist `chunks[i]` with `vectors[i]`, tagging each record with the
    /// locator of its document (`locators` is keyed by document id).
    ///
    /// All inputs are checked before the store is touched. Existing records
    /// of every written document are removed first. Batches are not
    /// transactional with each other: a failure mid-way leaves earlier
    /// batches written.
    pub async fn write(
        &self,
        chunks: Vec<DocumentChunk>,
        vectors: Vec<Vec<f32>>,
        locators: &HashMap<String, String>,
    ) -> Result<StoreHandle, VectorStoreError> {
        self.check(&chunks, &vectors, locators)?;

        let mut seen = HashSet::new();
        let document_ids: Vec<String> = chunks
            .iter()
            .filter(|c| seen.insert(c.document_id.as_str()))
            .map(|c| c.document_id.clone())
            .collect();

        self.store.create_collection().await?;

        // Chunk ids are stable per index, so a shrunken document would
        // otherwise keep its trailing records from an earlier run.
        with_retry(&self.retry, || self.store.delete_by_document_ids(&document_ids)).await?;
        tracing::debug!(documents = document_ids.len(), "replaced previous records");

        let ingested_at = chrono::Utc::now().to_rfc3339();
        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                // Presence checked above.
                let locator = locators
                    .get(&chunk.document_id)
                    .map(String::as_str)
                    .unwrap_or_default();
                VectorRecord::new(chunk, vector, locator, &ingested_at)
            })
            .collect();

        let total = records.len();
        let mut written = 0u64;
        let mut remaining = records.into_iter().peekable();

        while remaining.peek().is_some() {
            let batch: Vec<VectorRecord> = remaining.by_ref().take(self.batch_size).collect();
            let size = batch.len();
            with_retry(&self.retry, || self.store.upsert_records(batch.clone())).await?;
            written += size as u64;
            tracing::debug!(written, total, "upserted batch");
        }

        Ok(StoreHandle {
            driver: self.store.driver(),
            collection: self.store.collection().to_string(),
            records_written: written,
            documents: document_ids.len() as u64,
        })
    }

    fn check(
        &self,
        chunks: &[DocumentChunk],
        vectors: &[Vec<f32>],
        locators: &HashMap<String, String>,
    ) -> Result<(), VectorStoreError> {
        if chunks.len() != vectors.len() {
            return Err(VectorStoreError::LengthMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        let expected = self.store.dimension();
        if let Some((index, vector)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != expected)
        {
            return Err(VectorStoreError::DimensionMismatch {
                index,
                expected,
                actual: vector.len(),
            });
        }

        if let Some(chunk) = chunks
            .iter()
            .find(|c| !locators.contains_key(&c.document_id))
        {
            return Err(VectorStoreError::MissingLocator(chunk.source.clone()));
        }

        Ok(())
    }
}
