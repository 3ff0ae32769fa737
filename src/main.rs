use anyhow::{Context, Result};
use clap::Parser;
use kyc_onboard::cli::{self, Cli};
use kyc_onboard::{util, Config};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;

/// Environment override for the data directory
const DATA_DIR_ENV: &str = "KYC_ONBOARD_DATA_DIR";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from));
    util::init_data_dir(data_dir);

    // Initialize logging to file (<data_dir>/logs/kyc-onboard.log)
    fs::create_dir_all(util::logs_dir()).context("Failed to create log directory")?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(log_file)
        .with_ansi(false) // Disable ANSI colors in log file
        .init();

    let mut config = Config::load();
    if let Some(url) = &cli.api_url {
        config = config.with_api_url(url);
    }

    cli::execute(cli, config).await
}
