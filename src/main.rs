// Visa Advisor - HTTP server entry point

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use visa_advisor::storage::ConfigService;
use visa_advisor::AppState;

#[derive(Parser, Debug)]
#[command(name = "visa-advisor", version, about = "Streaming visa advisory service")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Override the bind address (host:port)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("visa_advisor=info,visa_advisor_llm=info,tower_http=info")
            }),
        )
        .init();

    let cli = Cli::parse();
    let service = ConfigService::load(cli.config).context("loading configuration")?;
    let mut config = service.into_config();
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    let state = AppState::new(config).context("initializing application state")?;
    visa_advisor::serve(state).await.context("running HTTP server")?;
    Ok(())
}
