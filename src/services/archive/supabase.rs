use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};

use super::{BlobStore, object_key};
use crate::error::ArchiveError;
use crate::models::{Document, StorageSecrets};
use crate::utils::retry::{RetryConfig, with_retry};

/// Supabase Storage over its REST API.
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    client: Client,
    base_url: Url,
    bucket: String,
    prefix: String,
    retry: RetryConfig,
}

impl SupabaseStorage {
    pub fn new(secrets: &StorageSecrets, prefix: &str) -> Result<Self, ArchiveError> {
        let base_url = Url::parse(&secrets.url)
            .map_err(|e| ArchiveError::Config(format!("invalid storage URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ArchiveError::Config(format!(
                "invalid storage URL: {}",
                secrets.url
            )));
        }

        let key = secrets.service_key.expose();
        let invalid_key = |_| ArchiveError::Config("service key contains invalid characters".to_string());

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", key)).map_err(invalid_key)?;
        auth.set_sensitive(true);
        let mut apikey = HeaderValue::from_str(key).map_err(invalid_key)?;
        apikey.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert("apikey", apikey);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ArchiveError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            bucket: secrets.bucket.clone(),
            prefix: prefix.to_string(),
            retry: RetryConfig::none(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// `{base}/storage/v1/{section...}/{bucket}/{key}` with each segment escaped.
    fn object_url(&self, section: &[&str], key: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["storage", "v1"])
                .extend(section)
                .push(&self.bucket)
                .extend(key.split('/'));
        }
        url
    }

    async fn upload(&self, document: &Document, key: &str) -> Result<(), ArchiveError> {
        let url = self.object_url(&["object"], key);

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, document.format.content_type())
            .header("x-upsert", "true")
            .body(document.bytes.clone())
            .send()
            .await
            .map_err(|e| ArchiveError::Unreachable {
                name: document.name.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ArchiveError::PermissionDenied {
                name: document.name.clone(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArchiveError::Upload {
                name: document.name.clone(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    /// Public URL of an archived object.
    pub fn public_url(&self, key: &str) -> String {
        self.object_url(&["object", "public"], key).to_string()
    }
}

#[async_trait]
impl BlobStore for SupabaseStorage {
    async fn archive(&self, document: &Document) -> Result<String, ArchiveError> {
        let key = object_key(&self.prefix, document);
        with_retry(&self.retry, || self.upload(document, &key)).await?;

        tracing::debug!(key = %key, bucket = %self.bucket, "archived to supabase storage");
        Ok(self.public_url(&key))
    }

    async fn health_check(&self) -> Result<bool, ArchiveError> {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "bucket"])
                .push(&self.bucket);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ArchiveError::Unreachable {
                name: self.bucket.clone(),
                message: e.to_string(),
            })?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ArchiveError::PermissionDenied {
                    name: self.bucket.clone(),
                    status: response.status().as_u16(),
                })
            }
            _ => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "supabase"
    }
}
