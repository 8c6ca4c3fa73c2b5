use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Settings for the admin API server
#[derive(Debug, Clone, Parser)]
#[command(name = "shares-admin", about = "Admin API for bulk share uploads")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "SHARES_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Share store snapshot file
    #[arg(long, env = "SHARES_STORE", default_value = "database/shares.bin.gz")]
    pub store: PathBuf,
}
