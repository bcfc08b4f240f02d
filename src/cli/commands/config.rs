use anyhow::{Context as _, Result};
use clap::Subcommand;

use crate::cli::Context;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Initialize configuration file")]
    Init {
        #[arg(
            long,
            short = 'g',
            help = "Create global config instead of project config"
        )]
        global: bool,
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Show configuration file paths")]
    Path,
}

pub async fn handle_config(cmd: ConfigCommand, ctx: &Context) -> Result<()> {
    match cmd {
        ConfigCommand::Init { global, force } => handle_init(global, force, ctx),
        ConfigCommand::Show => handle_show(ctx),
        ConfigCommand::Path => handle_path(ctx),
    }
}

fn handle_init(global: bool, force: bool, ctx: &Context) -> Result<()> {
    let formatter = get_formatter(ctx.format);

    let config_path = if global {
        Config::global_path().ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?
    } else {
        Config::project_path()
    };

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    Config::default()
        .save(&config_path)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    print!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", config_path.display()))
    );
    Ok(())
}

fn handle_show(ctx: &Context) -> Result<()> {
    let resolved = ctx.load_config()?;

    if ctx.format == OutputFormat::Json {
        let output = serde_json::json!({
            "config": resolved.config,
            "path": resolved.path,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match resolved.path {
        Some(ref path) => println!("# Loaded from: {}", path.display()),
        None => println!("# No config file found, using defaults"),
    }
    println!();
    print!("{}", toml::to_string_pretty(&resolved.config)?);

    Ok(())
}

fn handle_path(ctx: &Context) -> Result<()> {
    let active = ctx.load_config()?.path;

    println!("Configuration paths (in lookup order):");
    println!();

    if let Some(ref explicit) = ctx.config_path {
        println!("  {} (--config)", explicit.display());
    }
    for path in Config::candidate_paths() {
        let marker = if active.as_ref() == Some(&path) {
            " (active)"
        } else if path.exists() {
            ""
        } else {
            " (missing)"
        };
        println!("  {}{}", path.display(), marker);
    }

    if let Ok(cwd) = std::env::current_dir() {
        let env_path = cwd.join(".env");
        let marker = if env_path.exists() { "" } else { " (missing)" };
        println!();
        println!(".env file: {}{}", env_path.display(), marker);
    }

    Ok(())
}
