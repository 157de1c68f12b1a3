use clap::{Parser, Subcommand};
use covid_choropleth::config::AppConfig;
use covid_choropleth::fetcher::UrlFetcher;
use covid_choropleth::{pipeline, server};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration; defaults apply when the file is absent
    #[arg(short, long, value_name = "FILE", default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, match and render the choropleth to the output files
    Generate,
    /// Render the choropleth and serve it over HTTP
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let app_config = AppConfig::load_or_default(&cli.config)?;
    let fetcher = UrlFetcher::new(app_config.input.source_url.clone());

    // 1. Load, 2. Match, 3. Render
    let output = pipeline::run(&app_config, &fetcher).await?;
    pipeline::write_outputs(&output.map, &app_config)?;

    match cli.command.unwrap_or(Commands::Generate) {
        Commands::Generate => tracing::info!("Generation complete!"),
        Commands::Serve => server::start_server(&app_config, output.map).await?,
    }

    Ok(())
}
