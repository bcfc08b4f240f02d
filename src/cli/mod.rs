//! CLI module for the document ingestion tool.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

use crate::models::{
    Config, EnvSecretProvider, FileSecretProvider, OutputFormat, ResolvedConfig, SecretProvider,
};

/// Ingest Markdown and PDF documents into a vector store.
#[derive(Debug, Parser)]
#[command(name = "docingest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, env = "DOCINGEST_CONFIG", help = "Path to a config file")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Read secrets from a TOML file instead of the environment"
    )]
    pub secrets: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Discover, archive, embed and store documents
    Ingest(commands::IngestArgs),

    /// Check archive and vector store connectivity
    Status,

    /// Delete every record in the configured collection
    Clear {
        #[arg(long, help = "Skip the confirmation prompt")]
        force: bool,
    },

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub format: OutputFormat,
    pub verbose: bool,
    pub config_path: Option<PathBuf>,
    pub secrets_path: Option<PathBuf>,
}

impl Context {
    pub fn load_config(&self) -> Result<ResolvedConfig> {
        Config::load(self.config_path.as_deref()).context("failed to load configuration")
    }

    pub fn secret_provider(&self) -> Result<Box<dyn SecretProvider>> {
        match self.secrets_path {
            Some(ref path) => {
                let provider = FileSecretProvider::load(path)
                    .with_context(|| format!("failed to read secrets from {}", path.display()))?;
                Ok(Box::new(provider))
            }
            None => Ok(Box::new(EnvSecretProvider)),
        }
    }
}
