//! Blob storage for the original document bytes.
//!
//! Every ingested document is archived before its chunks are written, and the
//! locator returned here is what ends up in each record's `document_url`.

mod gcs;
mod local;
mod supabase;

pub use gcs::GcsStorage;
pub use local::LocalBlobStore;
pub use supabase::SupabaseStorage;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ArchiveError;
use crate::models::{ArchiveConfig, ArchiveDriver, Document, Secrets};
use crate::utils::retry::RetryConfig;

/// Abstract trait for blob storage backends.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload the document's bytes, overwriting any previous object under the
    /// same key, and return a stable locator for the archived copy.
    async fn archive(&self, document: &Document) -> Result<String, ArchiveError>;

    /// Check that the store is reachable and writable.
    async fn health_check(&self) -> Result<bool, ArchiveError>;

    /// Human-readable backend name, for logs and status output.
    fn name(&self) -> &str;
}

/// Object key under which a document is archived.
pub fn object_key(prefix: &str, document: &Document) -> String {
    if prefix.is_empty() {
        return document.name.clone();
    }
    format!("{}/{}", prefix.trim_end_matches('/'), document.name)
}

/// Create a blob store backend based on configuration.
pub fn create_blob_store(
    config: &ArchiveConfig,
    secrets: &Secrets,
) -> Result<Arc<dyn BlobStore>, ArchiveError> {
    match config.driver {
        ArchiveDriver::Supabase => {
            let storage = secrets.storage.as_ref().ok_or_else(|| {
                ArchiveError::Config("supabase archive requires storage credentials".to_string())
            })?;
            let retry = RetryConfig::with_retries(config.retry_attempts);
            let store = SupabaseStorage::new(storage, &config.prefix)?.with_retry_config(retry);
            Ok(Arc::new(store))
        }
        ArchiveDriver::Gcs => {
            let gcs = secrets.gcs.as_ref().ok_or_else(|| {
                ArchiveError::Config("gcs archive requires bucket credentials".to_string())
            })?;
            let retry = RetryConfig::with_retries(config.retry_attempts);
            let store = GcsStorage::new(gcs, &config.gcs_endpoint, &config.prefix)?
                .with_retry_config(retry);
            Ok(Arc::new(store))
        }
        ArchiveDriver::Local => Ok(Arc::new(LocalBlobStore::new(
            &config.local_dir,
            &config.prefix,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentFormat, GcsSecrets, Secret};
    use std::path::PathBuf;

    fn document(name: &str) -> Document {
        Document::new(
            name.to_string(),
            PathBuf::from("/docs").join(name),
            DocumentFormat::Markdown,
            b"# doc".to_vec(),
        )
    }

    #[test]
    fn test_object_key() {
        let doc = document("guides/a.md");
        assert_eq!(object_key("", &doc), "guides/a.md");
        assert_eq!(object_key("raw", &doc), "raw/guides/a.md");
        assert_eq!(object_key("raw/", &doc), "raw/guides/a.md");
    }

    #[test]
    fn test_supabase_requires_credentials() {
        let secrets = Secrets {
            openai_api_key: Secret::new("sk-test"),
            storage: None,
            gcs: None,
            database_url: None,
            qdrant_api_key: None,
        };
        let result = create_blob_store(&ArchiveConfig::default(), &secrets);
        assert!(matches!(result, Err(ArchiveError::Config(_))));
    }

    #[test]
    fn test_gcs_driver() {
        let mut secrets = Secrets {
            openai_api_key: Secret::new("sk-test"),
            storage: None,
            gcs: None,
            database_url: None,
            qdrant_api_key: None,
        };
        let config = ArchiveConfig {
            driver: ArchiveDriver::Gcs,
            ..Default::default()
        };
        assert!(matches!(
            create_blob_store(&config, &secrets),
            Err(ArchiveError::Config(_))
        ));

        secrets.gcs = Some(GcsSecrets {
            bucket: "rag-docs".to_string(),
            access_token: Secret::new("ya29.token"),
        });
        let store = create_blob_store(&config, &secrets).unwrap();
        assert_eq!(store.name(), "gcs");
    }

    #[test]
    fn test_local_driver() {
        let secrets = Secrets {
            openai_api_key: Secret::new("sk-test"),
            storage: None,
            gcs: None,
            database_url: None,
            qdrant_api_key: None,
        };
        let config = ArchiveConfig {
            driver: ArchiveDriver::Local,
            ..Default::default()
        };
        let store = create_blob_store(&config, &secrets).unwrap();
        assert_eq!(store.name(), "local");
    }
}
