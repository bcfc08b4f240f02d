//! Ingest command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::Context;
use crate::cli::output::get_formatter;
use crate::models::{Config, ErrorPolicy, Secrets};
use crate::services::{
    Embedder, OpenAiEmbedder, Pipeline, create_backend, create_blob_store, dry_run,
};

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Directory to scan for documents
    #[arg(long, short = 'd')]
    pub dir: Option<PathBuf>,

    /// Glob selecting files under the directory (e.g. "**/*.pdf")
    #[arg(long, short = 'g')]
    pub glob: Option<String>,

    /// Chunk size in characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Skip documents that cannot be read or extracted instead of aborting
    #[arg(long)]
    pub skip_failed: bool,

    /// Show what would be ingested without calling any external service
    #[arg(long)]
    pub dry_run: bool,
}

impl IngestArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(ref dir) = self.dir {
            config.source.dir = dir.clone();
        }
        if let Some(ref glob) = self.glob {
            config.source.glob = glob.clone();
        }
        if let Some(size) = self.chunk_size {
            config.chunking.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            config.chunking.chunk_overlap = overlap;
        }
        if self.skip_failed {
            config.source.on_error = ErrorPolicy::Skip;
        }
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

pub async fn handle_ingest(args: IngestArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.load_config()?.config;
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let formatter = get_formatter(ctx.format);

    // Sized by the pipeline once discovery has run.
    let pb = progress_bar(0);

    if args.dry_run {
        let report = dry_run(&config, Some(&pb)).await;
        pb.finish_and_clear();
        print!("{}", formatter.format_report(&report?));
        return Ok(());
    }

    let provider = ctx.secret_provider()?;
    let secrets = Secrets::resolve(provider.as_ref(), &config)
        .with_context(|| format!("failed to resolve secrets from {}", provider.name()))?;

    let blob_store = create_blob_store(&config.archive, &secrets)?;
    let embedder = Arc::new(OpenAiEmbedder::new(&config.embedding, &secrets.openai_api_key)?);
    let vector_store = create_backend(&config.vector_store, &secrets, embedder.dimension())
        .await
        .context("failed to connect to vector store")?;

    let mut pipeline =
        Pipeline::new(config, blob_store, embedder, vector_store).with_progress(pb.clone());
    let result = pipeline.run().await;
    pb.finish_and_clear();

    let report = result.with_context(|| {
        let stage = pipeline
            .failed_stage()
            .map_or_else(|| "unknown".to_string(), |s| s.to_string());
        format!("ingestion failed during {}", stage)
    })?;

    print!("{}", formatter.format_report(&report));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let args = IngestArgs {
            dir: Some(PathBuf::from("manuals")),
            glob: Some("**/*.pdf".to_string()),
            chunk_size: Some(500),
            chunk_overlap: Some(50),
            skip_failed: true,
            dry_run: false,
        };
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.source.dir, PathBuf::from("manuals"));
        assert_eq!(config.source.glob, "**/*.pdf");
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.source.on_error, ErrorPolicy::Skip);
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let args = IngestArgs {
            dir: None,
            glob: None,
            chunk_size: None,
            chunk_overlap: None,
            skip_failed: false,
            dry_run: true,
        };
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.source.on_error, ErrorPolicy::Abort);
    }
}
