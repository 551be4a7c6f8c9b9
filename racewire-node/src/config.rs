//! Node configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use racewire_net::NetConfig;

use crate::cli::Cli;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Data directory for race state.
    pub data_dir: PathBuf,

    /// Peer listen address.
    pub peer_addr: SocketAddr,

    /// Client listen address.
    pub client_addr: SocketAddr,

    /// RPC listen address.
    pub rpc_addr: SocketAddr,

    /// UDP discovery port.
    pub discovery_port: u16,

    /// Interval between discovery announcements.
    pub announce_interval: Duration,

    /// Host to advertise in announcements.
    pub advertise_host: Option<String>,

    /// Whether UDP discovery is enabled.
    pub discovery_enabled: bool,
}

impl NodeConfig {
    /// Create a node configuration from CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            data_dir: cli.expanded_data_dir(),
            peer_addr: cli.peer_listen,
            client_addr: cli.client_listen,
            rpc_addr: cli.rpc_listen,
            discovery_port: cli.discovery_port,
            announce_interval: Duration::from_secs(cli.announce_interval),
            advertise_host: cli.advertise_host.clone(),
            discovery_enabled: !cli.no_discovery,
        }
    }

    /// Build networking configuration from node config.
    pub fn net_config(&self) -> NetConfig {
        let mut config = NetConfig::new(self.peer_addr, self.client_addr)
            .with_discovery_port(self.discovery_port)
            .with_announce_interval(self.announce_interval)
            .with_discovery(self.discovery_enabled);

        if let Some(host) = &self.advertise_host {
            config = config.with_advertise_host(host.clone());
        }

        config
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.racewire"),
            peer_addr: "0.0.0.0:9990".parse().unwrap(),
            client_addr: "0.0.0.0:9991".parse().unwrap(),
            rpc_addr: "127.0.0.1:9992".parse().unwrap(),
            discovery_port: 9999,
            announce_interval: Duration::from_secs(2),
            advertise_host: None,
            discovery_enabled: true,
        }
    }
}
