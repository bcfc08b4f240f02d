use anyhow::Result;

use crate::cli::Context;
use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Secrets, VectorDriver};
use crate::services::{create_backend, create_blob_store};

pub async fn handle_status(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?.config;
    let formatter = get_formatter(ctx.format);

    let provider = ctx.secret_provider()?;
    let secrets = Secrets::resolve(provider.as_ref(), &config);

    let mut status = StatusInfo {
        embedding_model: config.embedding.model.clone(),
        embedding_url: config.embedding.base_url.clone(),
        archive_driver: config.archive.driver.to_string(),
        archive_healthy: false,
        archive_error: None,
        vector_store_driver: config.vector_store.driver.to_string(),
        vector_store_connected: false,
        vector_store_error: None,
        collection: config.vector_store.qualified_table_name(),
        vector_store_points: None,
    };

    match secrets {
        Ok(secrets) => {
            match create_blob_store(&config.archive, &secrets) {
                Ok(store) => match store.health_check().await {
                    Ok(healthy) => status.archive_healthy = healthy,
                    Err(e) => status.archive_error = Some(e.to_string()),
                },
                Err(e) => status.archive_error = Some(e.to_string()),
            }

            let dimension = config.embedding.dimension as usize;
            match create_backend(&config.vector_store, &secrets, dimension).await {
                Ok(store) => {
                    status.vector_store_connected = store.health_check().await.unwrap_or(false);
                    if status.vector_store_connected {
                        match store.get_collection_info().await {
                            Ok(info) => status.vector_store_points = info.map(|i| i.points_count),
                            Err(e) => status.vector_store_error = Some(e.to_string()),
                        }
                    }
                }
                Err(e) => status.vector_store_error = Some(e.to_string()),
            }
        }
        Err(e) => {
            status.archive_error = Some(e.to_string());
            status.vector_store_error = Some(e.to_string());
        }
    }

    print!("{}", formatter.format_status(&status));

    if !status.vector_store_connected {
        eprintln!();
        match config.vector_store.driver {
            VectorDriver::Qdrant => {
                eprintln!("Warning: Qdrant not reachable at {}.", config.vector_store.url);
            }
            VectorDriver::PostgreSQL => {
                eprintln!("Warning: PostgreSQL not accessible. Check DATABASE_URL.");
            }
        }
    }

    Ok(())
}
