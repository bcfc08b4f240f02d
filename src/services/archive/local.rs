use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{BlobStore, object_key};
use crate::error::ArchiveError;
use crate::models::Document;

/// Archives documents into a local directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    prefix: String,
}

impl LocalBlobStore {
    pub fn new(root: &Path, prefix: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            prefix: prefix.to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ArchiveError {
    let path = path.to_path_buf();
    move |source| ArchiveError::Io { path, source }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn archive(&self, document: &Document) -> Result<String, ArchiveError> {
        let key = object_key(&self.prefix, document);
        let target = key
            .split('/')
            .fold(self.root.clone(), |path, segment| path.join(segment));

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_err(parent))?;
        }
        tokio::fs::write(&target, &document.bytes)
            .await
            .map_err(io_err(&target))?;

        let absolute = tokio::fs::canonicalize(&target)
            .await
            .map_err(io_err(&target))?;

        tracing::debug!(key = %key, path = %absolute.display(), "archived locally");
        Ok(format!("file://{}", absolute.display()))
    }

    async fn health_check(&self) -> Result<bool, ArchiveError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(io_err(&self.root))?;
        Ok(true)
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentFormat;

    fn document(name: &str, bytes: &[u8]) -> Document {
        Document::new(
            name.to_string(),
            PathBuf::from("/docs").join(name),
            DocumentFormat::Pdf,
            bytes.to_vec(),
        )
    }

    #[tokio::test]
    async fn test_archive_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "raw");

        let locator = store.archive(&document("manuals/a.pdf", b"%PDF-1.5")).await.unwrap();

        let expected = dir.path().join("raw/manuals/a.pdf");
        assert_eq!(std::fs::read(&expected).unwrap(), b"%PDF-1.5");
        assert!(locator.starts_with("file://"));
        assert!(locator.ends_with("raw/manuals/a.pdf"));
    }

    #[tokio::test]
    async fn test_archive_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "");

        let first = store.archive(&document("a.pdf", b"one")).await.unwrap();
        let second = store.archive(&document("a.pdf", b"two")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(dir.path().join("a.pdf")).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_health_check_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("archive");
        let store = LocalBlobStore::new(&root, "");

        assert!(store.health_check().await.unwrap());
        assert!(root.is_dir());
    }
}
