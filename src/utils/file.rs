//! File utilities for document loading.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::error::ExtractionError;

/// Calculate SHA-256 checksum of raw bytes.
pub fn calculate_checksum(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    hex::encode(hash)
}

/// Read file bytes, refusing files larger than `max_size`.
pub fn read_file_bytes(path: &Path, max_size: u64) -> Result<Vec<u8>, ExtractionError> {
    let io_err = |source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(path).map_err(io_err)?;
    if metadata.len() > max_size {
        return Err(ExtractionError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max: max_size,
        });
    }

    fs::read(path).map_err(io_err)
}

/// Path of `path` relative to `base`, always using `/` separators.
pub fn get_relative_path(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_calculate_checksum() {
        let checksum = calculate_checksum(b"hello world");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, calculate_checksum(b"hello world"));
        assert_ne!(checksum, calculate_checksum(b"hello world!"));
    }

    #[test]
    fn test_read_file_bytes_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.md");
        fs::write(&file, "0123456789").unwrap();

        assert_eq!(read_file_bytes(&file, 10).unwrap().len(), 10);
        let err = read_file_bytes(&file, 5).unwrap_err();
        assert!(matches!(err, ExtractionError::FileTooLarge { size: 10, max: 5, .. }));
    }

    #[test]
    fn test_read_missing_file_names_path() {
        let err = read_file_bytes(Path::new("/nonexistent/missing.md"), 100).unwrap_err();
        assert_eq!(err.path(), Path::new("/nonexistent/missing.md"));
    }

    #[test]
    fn test_get_relative_path() {
        let base = PathBuf::from("/docs");
        assert_eq!(
            get_relative_path(&base, Path::new("/docs/guides/intro.md")),
            Some("guides/intro.md".to_string())
        );
        assert_eq!(get_relative_path(&base, Path::new("/other/a.md")), None);
        assert_eq!(get_relative_path(&base, Path::new("/docs")), None);
    }
}
