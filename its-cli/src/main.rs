//! ITS CLI - Command line interface for issue tracking system accessors
//!
//! Reads and writes Redmine issues of one project through the accessor.

mod commands;

use clap::{Parser, Subcommand};
use its_core::{Config, Secrets};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::IssueCommand;

/// its: read and write issues of one tracker project
#[derive(Parser, Debug)]
#[command(name = "its")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Tracker base URL (overrides config and env)
    #[arg(long, global = true, env = "ITS_URL")]
    url: Option<String>,

    /// Project identifier (overrides config and env)
    #[arg(long, global = true, env = "ITS_PROJECT")]
    project: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    #[command(flatten)]
    Issue(IssueCommand),

    /// Show current configuration
    Config,

    /// Create a secrets file template for the API key
    InitSecrets,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = Config::load_with_overrides(cli.url.clone(), cli.project.clone())?;

    if cli.verbose {
        tracing::info!(
            kind = %config.tracker.kind,
            url = ?config.tracker.url,
            project = ?config.tracker.project,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("its {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Issue(command)) => {
            command.execute(&config).await?;
        }
        Some(Commands::Config) => {
            println!("ITS Configuration");
            println!("=================");
            println!();
            println!("Tracker Settings:");
            println!("  kind: {}", config.tracker.kind);
            println!("  url: {}", config.tracker.url.as_deref().unwrap_or("(not set)"));
            println!("  project: {}", config.tracker.project.as_deref().unwrap_or("(not set)"));
            println!("  timeout: {}s", config.tracker.timeout.as_secs());
            println!("  verify_certificates: {}", config.tracker.verify_certificates);
            println!("  unknown_names: {:?}", config.tracker.unknown_names);
            println!();
            if let Some(path) = Config::default_config_path() {
                println!("Config file: {}", path.display());
                if path.exists() {
                    println!("  (exists)");
                } else {
                    println!("  (not found - using defaults)");
                }
            }
        }
        Some(Commands::InitSecrets) => {
            let path = Secrets::create_template()?;
            println!("Created {}", path.display());
        }
        None => {
            println!("its - issue tracking system accessor");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
