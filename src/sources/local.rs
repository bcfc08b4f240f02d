//! Local file system document discovery.

use std::path::PathBuf;

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use crate::error::{ExtractionError, SourceError};
use crate::models::{Document, DocumentFormat, SourceConfig};
use crate::utils::file::{get_relative_path, read_file_bytes};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A file selected for ingestion, not yet read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// Path relative to the source root, `/`-separated.
    pub name: String,
    pub format: DocumentFormat,
}

/// Local file system data source.
#[derive(Debug)]
pub struct LocalSource {
    /// Root directory to scan
    root: PathBuf,

    /// Pattern a file's relative path must match
    pattern: Pattern,

    /// Patterns to exclude
    exclude_patterns: Vec<Pattern>,

    /// Maximum file size
    max_file_size: u64,
}

impl LocalSource {
    /// Create a new local source.
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let compile = |pattern: &str| {
            Pattern::new(pattern).map_err(|e| SourceError::InvalidGlob {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
        };

        let exclude_patterns = config
            .exclude_patterns
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            root: config.dir.clone(),
            pattern: compile(&config.glob)?,
            exclude_patterns,
            max_file_size: config.max_file_size,
        })
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Collect every supported file under the root matching the glob, in a
    /// stable (sorted) order.
    pub fn discover(&self) -> Result<Vec<DiscoveredFile>, SourceError> {
        if !self.root.exists() {
            return Err(SourceError::NotFound(self.root.clone()));
        }

        let mut files = Vec::new();

        if self.root.is_file() {
            let name = self
                .root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if let Some(format) = DocumentFormat::from_path(&self.root) {
                files.push(DiscoveredFile {
                    path: self.root.clone(),
                    name,
                    format,
                });
            }
            return Ok(files);
        }

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| SourceError::WalkError(e.to_string()))?;
            let path = entry.path();

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(name) = get_relative_path(&self.root, path) else {
                continue;
            };

            if !self.pattern.matches_with(&name, MATCH_OPTIONS) {
                continue;
            }

            if self
                .exclude_patterns
                .iter()
                .any(|p| p.matches_with(&name, MATCH_OPTIONS))
            {
                tracing::debug!(file = %name, "excluded by pattern");
                continue;
            }

            match DocumentFormat::from_path(path) {
                Some(format) => files.push(DiscoveredFile {
                    path: path.to_path_buf(),
                    name,
                    format,
                }),
                None => {
                    tracing::warn!(file = %name, "matched glob but format is not supported, skipping");
                }
            }
        }

        Ok(files)
    }

    /// Read a discovered file into a `Document`.
    pub fn load(&self, file: &DiscoveredFile) -> Result<Document, ExtractionError> {
        let bytes = read_file_bytes(&file.path, self.max_file_size)?;
        Ok(Document::new(
            file.name.clone(),
            file.path.clone(),
            file.format,
            bytes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn source_for(dir: &std::path::Path, glob: &str) -> LocalSource {
        let config = SourceConfig {
            dir: dir.to_path_buf(),
            glob: glob.to_string(),
            ..Default::default()
        };
        LocalSource::new(&config).unwrap()
    }

    fn names(files: &[DiscoveredFile]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_discover_default_glob_recurses() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("guides/deep")).unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        fs::write(dir.path().join("guides/b.md"), "b").unwrap();
        fs::write(dir.path().join("guides/deep/c.md"), "c").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("manual.pdf"), "ignored by glob").unwrap();

        let files = source_for(dir.path(), "**/*.md").discover().unwrap();
        assert_eq!(names(&files), vec!["a.md", "guides/b.md", "guides/deep/c.md"]);
        assert!(files.iter().all(|f| f.format == DocumentFormat::Markdown));
    }

    #[test]
    fn test_discover_pdf_glob() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        fs::write(dir.path().join("manual.pdf"), "%PDF").unwrap();

        let files = source_for(dir.path(), "*.pdf").discover().unwrap();
        assert_eq!(names(&files), vec!["manual.pdf"]);
        assert_eq!(files[0].format, DocumentFormat::Pdf);
    }

    #[test]
    fn test_discover_skips_unsupported_formats() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();

        let files = source_for(dir.path(), "*").discover().unwrap();
        assert_eq!(names(&files), vec!["a.md"]);
    }

    #[test]
    fn test_discover_applies_excludes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("node_modules/pkg/readme.md"), "x").unwrap();
        fs::write(dir.path().join("keep.md"), "k").unwrap();

        let files = source_for(dir.path(), "**/*.md").discover().unwrap();
        assert_eq!(names(&files), vec!["keep.md"]);
    }

    #[test]
    fn test_missing_root() {
        let source = source_for(std::path::Path::new("/nonexistent/docs"), "**/*.md");
        assert!(matches!(source.discover(), Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_invalid_glob() {
        let config = SourceConfig {
            glob: "[".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            LocalSource::new(&config),
            Err(SourceError::InvalidGlob { .. })
        ));
    }

    #[test]
    fn test_load_document() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "# Title\n").unwrap();

        let source = source_for(dir.path(), "**/*.md");
        let files = source.discover().unwrap();
        let doc = source.load(&files[0]).unwrap();
        assert_eq!(doc.name, "a.md");
        assert_eq!(doc.bytes, b"# Title\n");
        assert_eq!(doc.id, Document::generate_id("a.md"));
    }

    #[test]
    fn test_load_respects_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "0123456789").unwrap();

        let config = SourceConfig {
            dir: dir.path().to_path_buf(),
            max_file_size: 4,
            ..Default::default()
        };
        let source = LocalSource::new(&config).unwrap();
        let files = source.discover().unwrap();
        assert!(matches!(
            source.load(&files[0]),
            Err(ExtractionError::FileTooLarge { .. })
        ));
    }
}
