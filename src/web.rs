#![cfg(not(tarpaulin_include))]

use clap::Parser;
use env_logger::Env;
use std::path::PathBuf;
use vcoc::app;
use vcoc::config::Config;

/// Serves form submissions and clerk commands over HTTP.
#[derive(Parser)]
#[command(name = "vcoc-web", version)]
struct Args {
    /// Workbook file (.bin.gz), created on first save
    #[arg(long, default_value = "meet.bin.gz")]
    workbook: PathBuf,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,
}

/// Main entry point for the web server
///
/// Loads the configuration and the workbook, then serves the form webhook
/// and the command endpoint until the process is stopped.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    app::run(config, args.workbook, &args.addr).await
}
