use anyhow::Result;
use clap::Parser;
use tokio::signal;

use docingest::cli::commands::{handle_clear, handle_config, handle_ingest, handle_status};
use docingest::cli::{Cli, Commands, Context};
use docingest::models::Config;

fn init_subscriber(verbose: bool) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_subscriber(cli.verbose);

    let configured_format = Config::load(cli.config.as_deref())
        .map(|resolved| resolved.config.output.format)
        .unwrap_or_default();

    let ctx = Context {
        format: cli.format.unwrap_or(configured_format),
        verbose: cli.verbose,
        config_path: cli.config,
        secrets_path: cli.secrets,
    };

    tokio::select! {
        result = run_command(cli.command, &ctx) => {
            result?;
        }
        _ = shutdown_signal() => {
            eprintln!("\nReceived shutdown signal, aborting run");
            anyhow::bail!("interrupted");
        }
    }

    Ok(())
}

async fn run_command(command: Commands, ctx: &Context) -> Result<()> {
    match command {
        Commands::Ingest(args) => {
            handle_ingest(args, ctx).await?;
        }
        Commands::Status => {
            handle_status(ctx).await?;
        }
        Commands::Clear { force } => {
            handle_clear(force, ctx).await?;
        }
        Commands::Config(cmd) => {
            handle_config(cmd, ctx).await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
