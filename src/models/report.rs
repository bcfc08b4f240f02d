use serde::{Deserialize, Serialize};

use super::config::VectorDriver;
use super::document::DocumentFormat;

/// Reference to the vector store a run wrote into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreHandle {
    pub driver: VectorDriver,
    pub collection: String,
    pub records_written: u64,
    pub documents: u64,
}

/// Per-document outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub name: String,
    pub format: DocumentFormat,
    pub characters: u64,
    pub chunks: u64,
    /// Archive locator; absent for dry runs and documents without text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
}

/// Summary of a completed ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub dry_run: bool,
    pub documents_discovered: u64,
    pub documents_ingested: u64,
    pub documents_skipped: u64,
    pub chunks_created: u64,
    pub duration_ms: u64,
    /// `None` when nothing was written (no documents, or dry run).
    pub store: Option<StoreHandle>,
    #[serde(default)]
    pub documents: Vec<DocumentSummary>,
}
