use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Supported source document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Markdown,
    Pdf,
}

impl DocumentFormat {
    /// Detect the format from a file extension; `None` for anything else.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "md" | "markdown" => Some(DocumentFormat::Markdown),
            "pdf" => Some(DocumentFormat::Pdf),
            _ => None,
        }
    }

    /// MIME type used when archiving the original bytes.
    pub fn content_type(&self) -> &'static str {
        match self {
            DocumentFormat::Markdown => "text/markdown",
            DocumentFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Markdown => write!(f, "markdown"),
            DocumentFormat::Pdf => write!(f, "pdf"),
        }
    }
}

/// A source file loaded from disk.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    /// Path relative to the source directory, `/`-separated. Used as the archive key.
    pub name: String,
    pub path: PathBuf,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
    pub checksum: String,
}

impl Document {
    pub fn generate_id(name: &str) -> String {
        use sha2::{Digest, Sha256};
        let input = format!("local:{}", name);
        let hash = Sha256::digest(input.as_bytes());
        hex::encode(&hash[..16])
    }

    pub fn new(name: String, path: PathBuf, format: DocumentFormat, bytes: Vec<u8>) -> Self {
        let id = Self::generate_id(&name);
        let checksum = crate::utils::calculate_checksum(&bytes);
        Self {
            id,
            name,
            path,
            format,
            bytes,
            checksum,
        }
    }

}

/// A document together with the locator of its archived copy.
#[derive(Debug, Clone)]
pub struct ArchivedDocument {
    pub document: Document,
    pub locator: String,
}

/// A contiguous slice of a document's extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    /// Character offset of the first character.
    pub start_offset: u64,
    /// Character offset one past the last character.
    pub end_offset: u64,
    pub source: String,
    pub format: DocumentFormat,
    pub checksum: String,
}

impl DocumentChunk {
    pub fn generate_id(document_id: &str, chunk_index: u32) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}", document_id, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn from_document(
        document: &Document,
        content: String,
        chunk_index: u32,
        total_chunks: u32,
        start_offset: u64,
        end_offset: u64,
    ) -> Self {
        Self {
            id: Self::generate_id(&document.id, chunk_index),
            document_id: document.id.clone(),
            content,
            chunk_index,
            total_chunks,
            start_offset,
            end_offset,
            source: document.name.clone(),
            format: document.format,
            checksum: document.checksum.clone(),
        }
    }
}

/// The persisted unit: chunk text, its embedding and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: Map<String, Value>,
}

impl VectorRecord {
    /// Build the record for `chunk`, tagging it with the archive `locator`.
    pub fn new(chunk: DocumentChunk, embedding: Vec<f32>, locator: &str, ingested_at: &str) -> Self {
        let mut metadata = Map::new();
        metadata.insert("source".to_string(), Value::from(chunk.source));
        metadata.insert("document_id".to_string(), Value::from(chunk.document_id));
        metadata.insert("document_url".to_string(), Value::from(locator));
        metadata.insert("format".to_string(), Value::from(chunk.format.to_string()));
        metadata.insert("chunk_index".to_string(), Value::from(chunk.chunk_index));
        metadata.insert("total_chunks".to_string(), Value::from(chunk.total_chunks));
        metadata.insert("start_offset".to_string(), Value::from(chunk.start_offset));
        metadata.insert("end_offset".to_string(), Value::from(chunk.end_offset));
        metadata.insert("checksum".to_string(), Value::from(chunk.checksum));
        metadata.insert("ingested_at".to_string(), Value::from(ingested_at));

        Self {
            id: chunk.id,
            content: chunk.content,
            embedding,
            metadata,
        }
    }

    /// Archive locator stored in the metadata.
    pub fn document_url(&self) -> Option<&str> {
        self.metadata.get("document_url").and_then(Value::as_str)
    }
}
