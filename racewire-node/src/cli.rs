//! Command-line argument parsing.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Racewire race-control service.
#[derive(Parser, Debug, Clone)]
#[command(name = "racewire-node")]
#[command(about = "Racewire race-control service binary")]
#[command(version)]
pub struct Cli {
    /// Data directory for race state.
    #[arg(long, default_value = "~/.racewire")]
    pub data_dir: PathBuf,

    /// Peer listen address.
    #[arg(long, default_value = "0.0.0.0:9990")]
    pub peer_listen: SocketAddr,

    /// Client listen address.
    #[arg(long, default_value = "0.0.0.0:9991")]
    pub client_listen: SocketAddr,

    /// RPC listen address.
    #[arg(long, default_value = "127.0.0.1:9992")]
    pub rpc_listen: SocketAddr,

    /// UDP discovery port.
    #[arg(long, default_value_t = 9999)]
    pub discovery_port: u16,

    /// Seconds between discovery announcements.
    #[arg(long, default_value_t = 2)]
    pub announce_interval: u64,

    /// Host to advertise in announcements (detected if omitted).
    #[arg(long)]
    pub advertise_host: Option<String>,

    /// Disable UDP discovery (peers must be dialed via RPC).
    #[arg(long)]
    pub no_discovery: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Expand the data directory path (handle ~ for home).
    pub fn expanded_data_dir(&self) -> PathBuf {
        let path_str = self.data_dir.to_string_lossy();
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        }
        self.data_dir.clone()
    }
}
