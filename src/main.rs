#![cfg(not(tarpaulin_include))]

use clap::Parser;
use shares_admin::app;
use shares_admin::config::ServerConfig;

/// Main entry point for the admin API server
///
/// Reads the listen address and store location from flags or environment
/// (`SHARES_BIND`, `SHARES_STORE`) and serves until stopped. Log output is
/// controlled by `RUST_LOG`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    app::run(config).await
}
