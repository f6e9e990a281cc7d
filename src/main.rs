use std::process::ExitCode;

use clap::Parser;
use freetv::settings::Settings;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (optional; defaults apply when missing)
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Source URL or local file, repeatable (replaces configured sources)
    #[arg(long = "source")]
    sources: Vec<String>,

    /// Directory for playlists and the alias table (overrides config)
    #[arg(long)]
    output_dir: Option<String>,

    /// Alias table file, relative to the output directory unless absolute
    #[arg(long)]
    alias_table: Option<String>,

    /// Number of sources fetched at once (overrides config)
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut settings = Settings::load(&args.config)?;
    if !args.sources.is_empty() {
        settings.sources.urls = args.sources;
        settings.sources.subscription_file = None;
    }
    if let Some(dir) = args.output_dir {
        settings.output.dir = dir;
    }
    if let Some(alias_table) = args.alias_table {
        settings.output.alias_table = alias_table;
    }
    if let Some(concurrency) = args.concurrency {
        settings.fetch.concurrency = concurrency;
    }

    info!("Configuration loaded from {}: {:?}", args.config, settings);

    match freetv::run(&settings).await {
        Ok(summary) => {
            info!("Alias table updated: {:?}", summary);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("Run failed: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
