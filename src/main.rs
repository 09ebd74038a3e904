use clap::Parser;
use color_eyre::eyre::Result;
use dotenv::dotenv;
use scheduler_cli::commands::Cli;
use scheduler_cli::config::CliConfig;
use scheduler_client::AppState;
use scheduler_client::config::ClientConfig;
use tracing::debug;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;

    // Logs go to stderr so command output stays clean
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    debug!(api_url = %config.api_url, timezone = %config.timezone, "Configuration loaded");

    let credentials = CliConfig::from_env();
    let state = AppState::connect(config)?;
    scheduler_cli::run(cli, state, &credentials).await
}
