//! Credentials for the external services, resolved through an injected provider.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::ConfigError;

use super::config::{ArchiveDriver, Config, VectorDriver};

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const SUPABASE_URL: &str = "SUPABASE_URL";
pub const SUPABASE_SERVICE_KEY: &str = "SUPABASE_SERVICE_KEY";
pub const STORAGE_BUCKET: &str = "STORAGE_BUCKET";
pub const DATABASE_URL: &str = "DATABASE_URL";
pub const QDRANT_API_KEY: &str = "QDRANT_API_KEY";
pub const GCS_BUCKET_NAME: &str = "GCS_BUCKET_NAME";
pub const GCS_ACCESS_TOKEN: &str = "GCS_ACCESS_TOKEN";

/// Sensitive string whose `Debug` and `Display` never print the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Pluggable secret lookup.
pub trait SecretProvider: Send + Sync {
    /// Look up a secret; `Ok(None)` when the provider does not have it.
    fn get_secret(&self, key: &str) -> Result<Option<String>, ConfigError>;

    /// Provider name for diagnostics.
    fn name(&self) -> &str;
}

/// Reads secrets from process environment variables.
#[derive(Debug, Default)]
pub struct EnvSecretProvider;

impl SecretProvider for EnvSecretProvider {
    fn get_secret(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(std::env::var(key).ok())
    }

    fn name(&self) -> &str {
        "environment"
    }
}

/// In-memory secrets.
#[derive(Debug, Default, Clone)]
pub struct MapSecretProvider {
    secrets: HashMap<String, String>,
}

impl MapSecretProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_secret(mut self, key: &str, value: &str) -> Self {
        self.secrets.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl SecretProvider for MapSecretProvider {
    fn get_secret(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.secrets.get(key).cloned())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Flat TOML file of `KEY = "value"` pairs, e.g. a `secrets.toml`.
#[derive(Debug)]
pub struct FileSecretProvider {
    inner: MapSecretProvider,
}

impl FileSecretProvider {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let table: toml::Table = toml::from_str(&content)?;

        let mut secrets = HashMap::new();
        for (key, value) in table {
            match value {
                toml::Value::String(s) => {
                    secrets.insert(key, s);
                }
                other => {
                    return Err(ConfigError::InvalidSecret {
                        key,
                        reason: format!("expected a string, found {}", other.type_str()),
                    });
                }
            }
        }

        Ok(Self {
            inner: MapSecretProvider { secrets },
        })
    }
}

impl SecretProvider for FileSecretProvider {
    fn get_secret(&self, key: &str) -> Result<Option<String>, ConfigError> {
        self.inner.get_secret(key)
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Supabase Storage endpoint and credentials.
#[derive(Debug, Clone)]
pub struct StorageSecrets {
    pub url: String,
    pub service_key: Secret,
    pub bucket: String,
}

/// Google Cloud Storage bucket and OAuth2 access token.
#[derive(Debug, Clone)]
pub struct GcsSecrets {
    pub bucket: String,
    pub access_token: Secret,
}

/// Validated credentials needed by the configured drivers.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub openai_api_key: Secret,
    pub storage: Option<StorageSecrets>,
    pub gcs: Option<GcsSecrets>,
    pub database_url: Option<Secret>,
    pub qdrant_api_key: Option<Secret>,
}

impl Secrets {
    /// Resolve the secrets required by `config`, failing on the first
    /// missing or malformed one.
    pub fn resolve(provider: &dyn SecretProvider, config: &Config) -> Result<Self, ConfigError> {
        let openai_api_key = Secret::new(required(provider, OPENAI_API_KEY)?);

        let storage = match config.archive.driver {
            ArchiveDriver::Supabase => {
                let url = required(provider, SUPABASE_URL)?;
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(ConfigError::InvalidSecret {
                        key: SUPABASE_URL.to_string(),
                        reason: "expected an http(s) URL".to_string(),
                    });
                }
                Some(StorageSecrets {
                    url: url.trim_end_matches('/').to_string(),
                    service_key: Secret::new(required(provider, SUPABASE_SERVICE_KEY)?),
                    bucket: required(provider, STORAGE_BUCKET)?,
                })
            }
            ArchiveDriver::Gcs | ArchiveDriver::Local => None,
        };

        let gcs = match config.archive.driver {
            ArchiveDriver::Gcs => Some(GcsSecrets {
                bucket: required(provider, GCS_BUCKET_NAME)?,
                access_token: Secret::new(required(provider, GCS_ACCESS_TOKEN)?),
            }),
            ArchiveDriver::Supabase | ArchiveDriver::Local => None,
        };

        let database_url = match config.vector_store.driver {
            VectorDriver::PostgreSQL => Some(Secret::new(required(provider, DATABASE_URL)?)),
            VectorDriver::Qdrant => None,
        };

        let qdrant_api_key = optional(provider, QDRANT_API_KEY)?.map(Secret::new);

        tracing::debug!(provider = provider.name(), "resolved secrets");

        Ok(Self {
            openai_api_key,
            storage,
            gcs,
            database_url,
            qdrant_api_key,
        })
    }
}

fn optional(provider: &dyn SecretProvider, key: &str) -> Result<Option<String>, ConfigError> {
    Ok(provider
        .get_secret(key)?
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

fn required(provider: &dyn SecretProvider, key: &str) -> Result<String, ConfigError> {
    optional(provider, key)?.ok_or_else(|| ConfigError::MissingSecret(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_provider() -> MapSecretProvider {
        MapSecretProvider::new()
            .with_secret(OPENAI_API_KEY, "sk-test")
            .with_secret(SUPABASE_URL, "https://project.supabase.co/")
            .with_secret(SUPABASE_SERVICE_KEY, "service-role")
            .with_secret(STORAGE_BUCKET, "documents")
            .with_secret(DATABASE_URL, "postgres://localhost/db")
    }

    #[test]
    fn test_secret_redacted() {
        let secret = Secret::new("sk-very-secret");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(secret.to_string(), "[REDACTED]");
        assert_eq!(secret.expose(), "sk-very-secret");
    }

    #[test]
    fn test_resolve_default_drivers() {
        let secrets = Secrets::resolve(&full_provider(), &Config::default()).unwrap();
        let storage = secrets.storage.unwrap();
        assert_eq!(storage.url, "https://project.supabase.co");
        assert_eq!(storage.bucket, "documents");
        assert!(secrets.database_url.is_some());
        assert!(secrets.qdrant_api_key.is_none());
        assert!(!format!("{:?}", storage.service_key).contains("service-role"));
    }

    #[test]
    fn test_missing_secret_fails() {
        let provider = MapSecretProvider::new().with_secret(OPENAI_API_KEY, "sk-test");
        let err = Secrets::resolve(&provider, &Config::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret(ref k) if k == SUPABASE_URL));
    }

    #[test]
    fn test_blank_secret_counts_as_missing() {
        let provider = full_provider().with_secret(OPENAI_API_KEY, "   ");
        let err = Secrets::resolve(&provider, &Config::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret(ref k) if k == OPENAI_API_KEY));
    }

    #[test]
    fn test_malformed_storage_url() {
        let provider = full_provider().with_secret(SUPABASE_URL, "project.supabase.co");
        let err = Secrets::resolve(&provider, &Config::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSecret { .. }));
    }

    #[test]
    fn test_local_drivers_need_only_api_key() {
        let mut config = Config::default();
        config.archive.driver = ArchiveDriver::Local;
        config.vector_store.driver = VectorDriver::Qdrant;
        let provider = MapSecretProvider::new().with_secret(OPENAI_API_KEY, "sk-test");

        let secrets = Secrets::resolve(&provider, &config).unwrap();
        assert!(secrets.storage.is_none());
        assert!(secrets.database_url.is_none());
    }

    #[test]
    fn test_gcs_driver_secrets() {
        let mut config = Config::default();
        config.archive.driver = ArchiveDriver::Gcs;

        let provider = MapSecretProvider::new()
            .with_secret(OPENAI_API_KEY, "sk-test")
            .with_secret(DATABASE_URL, "postgres://localhost/db")
            .with_secret(GCS_BUCKET_NAME, "rag-docs");
        let err = Secrets::resolve(&provider, &config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret(ref k) if k == GCS_ACCESS_TOKEN));

        let provider = provider.with_secret(GCS_ACCESS_TOKEN, "ya29.token");
        let secrets = Secrets::resolve(&provider, &config).unwrap();
        let gcs = secrets.gcs.unwrap();
        assert_eq!(gcs.bucket, "rag-docs");
        assert_eq!(gcs.access_token.expose(), "ya29.token");
        assert!(secrets.storage.is_none());
    }

    #[test]
    fn test_file_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(
            &path,
            "OPENAI_API_KEY = \"sk-file\"\nSUPABASE_URL = \"https://x.supabase.co\"\n",
        )
        .unwrap();

        let provider = FileSecretProvider::load(&path).unwrap();
        assert_eq!(
            provider.get_secret(OPENAI_API_KEY).unwrap().as_deref(),
            Some("sk-file")
        );
        assert_eq!(provider.get_secret(DATABASE_URL).unwrap(), None);
    }

    #[test]
    fn test_file_provider_rejects_non_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(&path, "OPENAI_API_KEY = 42\n").unwrap();

        assert!(matches!(
            FileSecretProvider::load(&path),
            Err(ConfigError::InvalidSecret { .. })
        ));
    }
}
