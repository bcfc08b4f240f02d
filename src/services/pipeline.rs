//! Single-pass ingestion pipeline.
//!
//! `Configuring → Loading → Extracting → Splitting → ArchivingAndEmbedding →
//! Writing → Done`, with any error moving the pipeline to `Failed`. A pipeline
//! runs at most once.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use indicatif::ProgressBar;
use serde::Serialize;

use crate::error::{ConfigError, IngestError};
use crate::models::{
    ArchivedDocument, Config, Document, DocumentChunk, DocumentSummary, ErrorPolicy, RunReport,
};
use crate::services::archive::BlobStore;
use crate::services::chunker::TextChunker;
use crate::services::embedding::Embedder;
use crate::services::extractor::extract_text;
use crate::services::vector_store::VectorStore;
use crate::services::writer::VectorStoreWriter;
use crate::sources::LocalSource;
use crate::utils::retry::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Configuring,
    Loading,
    Extracting,
    Splitting,
    ArchivingAndEmbedding,
    Writing,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Configuring => "configuring",
            PipelineState::Loading => "loading",
            PipelineState::Extracting => "extracting",
            PipelineState::Splitting => "splitting",
            PipelineState::ArchivingAndEmbedding => "archiving/embedding",
            PipelineState::Writing => "writing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// A document whose text has been extracted.
struct Extracted {
    document: Document,
    text: String,
}

/// A document ready to archive, with its chunks.
struct Split {
    document: Document,
    characters: u64,
    chunks: Vec<DocumentChunk>,
}

/// Ingestion pipeline over injected boundary clients.
pub struct Pipeline {
    config: Config,
    blob_store: Arc<dyn BlobStore>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    state: PipelineState,
    failed_stage: Option<PipelineState>,
    progress: Option<ProgressBar>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        blob_store: Arc<dyn BlobStore>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            config,
            blob_store,
            embedder,
            vector_store,
            state: PipelineState::Configuring,
            failed_stage: None,
            progress: None,
        }
    }

    /// Report loading and extraction on `progress`. Its length is set once
    /// discovery has run.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Stage that was active when the run failed.
    pub fn failed_stage(&self) -> Option<PipelineState> {
        self.failed_stage
    }

    /// Execute the pipeline to completion.
    pub async fn run(&mut self) -> Result<RunReport, IngestError> {
        if self.state != PipelineState::Configuring {
            return Err(IngestError::AlreadyRun(self.state.to_string()));
        }

        let started = Instant::now();
        match self.execute(started).await {
            Ok(report) => {
                self.state = PipelineState::Done;
                tracing::info!(
                    documents = report.documents_ingested,
                    chunks = report.chunks_created,
                    duration_ms = report.duration_ms,
                    "ingestion complete"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(stage = %self.state, error = %e, "ingestion failed");
                self.failed_stage = Some(self.state);
                self.state = PipelineState::Failed;
                Err(e)
            }
        }
    }

    fn enter(&mut self, state: PipelineState) {
        tracing::debug!(from = %self.state, to = %state, "pipeline state");
        self.state = state;
    }

    async fn execute(&mut self, started: Instant) -> Result<RunReport, IngestError> {
        self.config.validate()?;
        let chunker = TextChunker::from_config(&self.config.chunking)?;
        let source = LocalSource::new(&self.config.source)?;
        if self.embedder.dimension() != self.vector_store.dimension() {
            return Err(ConfigError::ValidationError(format!(
                "embedder produces {}-dimensional vectors but the vector store expects {}",
                self.embedder.dimension(),
                self.vector_store.dimension()
            ))
            .into());
        }

        self.enter(PipelineState::Loading);
        let files = source.discover()?;
        let discovered = files.len() as u64;
        tracing::info!(documents = discovered, root = %source.root().display(), "discovered documents");
        size_progress(self.progress.as_ref(), discovered);

        let policy = self.config.source.on_error;
        let (documents, load_skipped) = load_documents(&source, &files, policy, self.progress.as_ref())?;

        self.enter(PipelineState::Extracting);
        let (extracted, extract_skipped) =
            extract_documents(documents, policy, self.progress.as_ref()).await?;

        self.enter(PipelineState::Splitting);
        let split = split_documents(&chunker, extracted);
        let chunks_created: u64 = split.iter().map(|s| s.chunks.len() as u64).sum();
        tracing::info!(chunks = chunks_created, "split documents");

        let mut report = RunReport {
            dry_run: false,
            documents_discovered: discovered,
            documents_ingested: 0,
            documents_skipped: load_skipped + extract_skipped,
            chunks_created,
            duration_ms: 0,
            store: None,
            documents: Vec::new(),
        };

        let (to_archive, empty): (Vec<Split>, Vec<Split>) =
            split.into_iter().partition(|s| !s.chunks.is_empty());
        report.documents.extend(empty.iter().map(|s| summarize(s, None)));

        if to_archive.is_empty() {
            tracing::info!("no text to ingest, vector store untouched");
            report.duration_ms = started.elapsed().as_millis() as u64;
            return Ok(report);
        }

        self.enter(PipelineState::ArchivingAndEmbedding);
        let blob_store = Arc::clone(&self.blob_store);
        let embedder = Arc::clone(&self.embedder);

        let archive = async {
            let mut locators = Vec::with_capacity(to_archive.len());
            for item in &to_archive {
                let locator = blob_store.archive(&item.document).await?;
                tracing::debug!(document = %item.document.name, %locator, "archived");
                locators.push(locator);
            }
            tracing::info!(documents = locators.len(), store = blob_store.name(), "archived documents");
            Ok::<_, IngestError>(locators)
        };

        let embed = async {
            let texts: Vec<String> = to_archive
                .iter()
                .flat_map(|s| s.chunks.iter().map(|c| c.content.clone()))
                .collect();
            let vectors = embedder.embed(&texts).await?;
            tracing::info!(vectors = vectors.len(), model = embedder.model(), "embedded chunks");
            Ok::<_, IngestError>(vectors)
        };

        let (locators, vectors) = tokio::try_join!(archive, embed)?;

        self.enter(PipelineState::Writing);
        report.documents_ingested = to_archive.len() as u64;

        let mut chunks = Vec::with_capacity(vectors.len());
        let mut archived = Vec::with_capacity(to_archive.len());
        for (split, locator) in to_archive.into_iter().zip(locators) {
            report.documents.push(summarize(&split, Some(locator.clone())));
            chunks.extend(split.chunks);
            archived.push(ArchivedDocument {
                document: split.document,
                locator,
            });
        }

        let locators: HashMap<String, String> = archived
            .into_iter()
            .map(|a| (a.document.id, a.locator))
            .collect();

        let writer = VectorStoreWriter::new(
            Arc::clone(&self.vector_store),
            self.config.vector_store.write_batch_size,
        )
        .with_retry_config(RetryConfig::with_retries(self.config.vector_store.retry_attempts));
        let handle = writer.write(chunks, vectors, &locators).await?;
        tracing::info!(
            records = handle.records_written,
            collection = %handle.collection,
            driver = %handle.driver,
            "wrote records"
        );

        report.store = Some(handle);
        report.duration_ms = started.elapsed().as_millis() as u64;
        Ok(report)
    }
}

/// Discover, load, extract and split without touching any external service.
pub async fn dry_run(config: &Config, progress: Option<&ProgressBar>) -> Result<RunReport, IngestError> {
    let started = Instant::now();

    config.validate()?;
    let chunker = TextChunker::from_config(&config.chunking)?;
    let source = LocalSource::new(&config.source)?;

    let files = source.discover()?;
    size_progress(progress, files.len() as u64);
    let policy = config.source.on_error;
    let (documents, load_skipped) = load_documents(&source, &files, policy, progress)?;
    let (extracted, extract_skipped) = extract_documents(documents, policy, progress).await?;
    let split = split_documents(&chunker, extracted);

    Ok(RunReport {
        dry_run: true,
        documents_discovered: files.len() as u64,
        documents_ingested: split.iter().filter(|s| !s.chunks.is_empty()).count() as u64,
        documents_skipped: load_skipped + extract_skipped,
        chunks_created: split.iter().map(|s| s.chunks.len() as u64).sum(),
        duration_ms: started.elapsed().as_millis() as u64,
        store: None,
        documents: split.iter().map(|s| summarize(s, None)).collect(),
    })
}

/// Each discovered document advances the bar twice: once loaded, once extracted.
fn size_progress(progress: Option<&ProgressBar>, discovered: u64) {
    if let Some(pb) = progress {
        pb.set_length(discovered * 2);
    }
}

fn load_documents(
    source: &LocalSource,
    files: &[crate::sources::DiscoveredFile],
    policy: ErrorPolicy,
    progress: Option<&ProgressBar>,
) -> Result<(Vec<Document>, u64), IngestError> {
    let mut documents = Vec::with_capacity(files.len());
    let mut skipped = 0;

    for file in files {
        let loaded = source.load(file);
        if let Some(pb) = progress {
            pb.inc(1);
        }

        match loaded {
            Ok(document) => {
                tracing::debug!(document = %document.name, bytes = document.bytes.len(), "loaded");
                documents.push(document);
            }
            Err(e) if policy == ErrorPolicy::Skip => {
                tracing::warn!(error = %e, "skipping unreadable document");
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok((documents, skipped))
}

async fn extract_documents(
    documents: Vec<Document>,
    policy: ErrorPolicy,
    progress: Option<&ProgressBar>,
) -> Result<(Vec<Extracted>, u64), IngestError> {
    let mut extracted = Vec::with_capacity(documents.len());
    let mut skipped = 0;

    for document in documents {
        let (document, result) = tokio::task::spawn_blocking(move || {
            let result = extract_text(&document);
            (document, result)
        })
        .await
        .map_err(|e| IngestError::Task(e.to_string()))?;

        if let Some(pb) = progress {
            pb.inc(1);
        }

        match result {
            Ok(text) => {
                tracing::debug!(document = %document.name, characters = text.chars().count(), "extracted");
                extracted.push(Extracted { document, text });
            }
            Err(e) if policy == ErrorPolicy::Skip => {
                tracing::warn!(error = %e, "skipping document that failed extraction");
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok((extracted, skipped))
}

fn split_documents(chunker: &TextChunker, extracted: Vec<Extracted>) -> Vec<Split> {
    extracted
        .into_iter()
        .map(|Extracted { document, text }| {
            let chunks = chunker.chunk(&document, &text);
            if chunks.is_empty() {
                tracing::warn!(document = %document.name, "no text extracted, skipping archive");
            }
            Split {
                characters: text.chars().count() as u64,
                document,
                chunks,
            }
        })
        .collect()
}

fn summarize(split: &Split, locator: Option<String>) -> DocumentSummary {
    DocumentSummary {
        name: split.document.name.clone(),
        format: split.document.format,
        characters: split.characters,
        chunks: split.chunks.len() as u64,
        locator,
    }
}
