use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::cli::output::get_formatter;
use crate::models::Secrets;
use crate::services::create_backend;

pub async fn handle_clear(force: bool, ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?.config;
    let formatter = get_formatter(ctx.format);
    let collection = config.vector_store.qualified_table_name();

    if !force {
        println!(
            "This will delete ALL records in {} ({}). Continue? [y/N]",
            collection, config.vector_store.driver
        );
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            print!("{}", formatter.format_message("Cancelled."));
            return Ok(());
        }
    }

    let provider = ctx.secret_provider()?;
    let secrets = Secrets::resolve(provider.as_ref(), &config)
        .with_context(|| format!("failed to resolve secrets from {}", provider.name()))?;

    let dimension = config.embedding.dimension as usize;
    let store = create_backend(&config.vector_store, &secrets, dimension)
        .await
        .context("failed to connect to vector store")?;

    if ctx.verbose {
        eprintln!("Clearing {} on {}...", store.collection(), store.driver());
    }
    store.clear_collection().await?;

    print!(
        "{}",
        formatter.format_message(&format!("Cleared all records from {}.", collection))
    );
    Ok(())
}
