use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};

use super::{BlobStore, object_key};
use crate::error::ArchiveError;
use crate::models::{Document, GcsSecrets};
use crate::utils::retry::{RetryConfig, with_retry};

/// Google Cloud Storage through the JSON API, authenticated with an OAuth2
/// access token. Locators are `gs://{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct GcsStorage {
    client: Client,
    endpoint: Url,
    bucket: String,
    prefix: String,
    retry: RetryConfig,
}

impl GcsStorage {
    pub fn new(secrets: &GcsSecrets, endpoint: &str, prefix: &str) -> Result<Self, ArchiveError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ArchiveError::Config(format!("invalid GCS endpoint: {}", e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(ArchiveError::Config(format!(
                "invalid GCS endpoint: {}",
                endpoint
            )));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", secrets.access_token.expose()))
            .map_err(|_| ArchiveError::Config("access token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ArchiveError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            bucket: secrets.bucket.clone(),
            prefix: prefix.to_string(),
            retry: RetryConfig::none(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn api_url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Media upload URL; the object name travels as a query parameter.
    fn upload_url(&self, key: &str) -> Url {
        let mut url = self.api_url(&["upload", "storage", "v1", "b", &self.bucket, "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key);
        url
    }

    pub fn locator(&self, key: &str) -> String {
        format!("gs://{}/{}", self.bucket, key)
    }

    async fn upload(&self, document: &Document, key: &str) -> Result<(), ArchiveError> {
        let response = self
            .client
            .post(self.upload_url(key))
            .header(CONTENT_TYPE, document.format.content_type())
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
}

#[async_trait]
impl BlobStore for GcsStorage {
    async fn archive(&self, document: &Document) -> Result<String, ArchiveError> {
        let key = object_key(&self.prefix, document);
        with_retry(&self.retry, || self.upload(document, &key)).await?;

        tracing::debug!(key = %key, bucket = %self.bucket, "archived to gcs");
        Ok(self.locator(&key))
    }

    async fn health_check(&self) -> Result<bool, ArchiveError> {
        let response = self
            .client
            .get(self.api_url(&["storage", "v1", "b", &self.bucket]))
            .send()
            .await
            .map_err(|e| ArchiveError::Unreachable {
                name: self.bucket.clone(),
                message: e.to_string(),
            })?;

        match response.status() {
            status if status.is_success() => Ok(true),
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                Err(ArchiveError::PermissionDenied {
                    name: self.bucket.clone(),
                    status: status.as_u16(),
                })
            }
            _ => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "gcs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentFormat, Secret};
    use std::path::PathBuf;
    use wiremock::matchers::{body_bytes, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn storage_for(endpoint: &str, prefix: &str) -> GcsStorage {
        let secrets = GcsSecrets {
            bucket: "rag-docs".to_string(),
            access_token: Secret::new("ya29.token"),
        };
        GcsStorage::new(&secrets, endpoint, prefix).unwrap()
    }

    fn markdown(name: &str) -> Document {
        Document::new(
            name.to_string(),
            PathBuf::from("/docs").join(name),
            DocumentFormat::Markdown,
            b"# Guide".to_vec(),
        )
    }

    #[test]
    fn test_upload_url_encodes_name() {
        let storage = storage_for("https://storage.googleapis.com", "");
        assert_eq!(
            storage.upload_url("guides/my doc.md").as_str(),
            "https://storage.googleapis.com/upload/storage/v1/b/rag-docs/o?uploadType=media&name=guides%2Fmy+doc.md"
        );
    }

    #[tokio::test]
    async fn test_archive_returns_gs_locator() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/storage/v1/b/rag-docs/o"))
            .and(query_param("uploadType", "media"))
            .and(query_param("name", "raw/guides/a.md"))
            .and(header("authorization", "Bearer ya29.token"))
            .and(header("content-type", "text/markdown"))
            .and(body_bytes(b"# Guide".to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name":"raw/guides/a.md"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let storage = storage_for(&server.uri(), "raw");
        let locator = storage.archive(&markdown("guides/a.md")).await.unwrap();
        assert_eq!(locator, "gs://rag-docs/raw/guides/a.md");
    }

    #[tokio::test]
    async fn test_archive_forbidden() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let storage = storage_for(&server.uri(), "");
        let err = storage.archive(&markdown("a.md")).await.unwrap_err();
        assert!(matches!(err, ArchiveError::PermissionDenied { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_retries_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let retry = RetryConfig::with_retries(2).with_initial_delay(std::time::Duration::from_millis(1));
        let storage = storage_for(&server.uri(), "").with_retry_config(retry);
        assert_eq!(
            storage.archive(&markdown("a.md")).await.unwrap(),
            "gs://rag-docs/a.md"
        );
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/rag-docs"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name":"rag-docs"}"#))
            .mount(&server)
            .await;

        let storage = storage_for(&server.uri(), "");
        assert!(storage.health_check().await.unwrap());
    }
}
