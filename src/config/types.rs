use crate::config::network::{Environment, NetworkDescriptor};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the wallet sync service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which bundled network descriptor to use
    pub environment: Environment,
    /// Optional JSON descriptor replacing the bundled one
    pub network_file: Option<PathBuf>,
    /// Overrides the descriptor's RPC endpoint
    pub rpc_url: Option<String>,
    /// Directory holding the per-wallet and global stores
    pub data_dir: PathBuf,
    /// Wallet opened at startup
    pub wallet_address: Option<String>,
    pub rate_interval_seconds: u64,
    pub token_sync_interval_seconds: u64,
    pub notification_interval_seconds: u64,
    pub history_interval_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Mainnet,
            network_file: None,
            rpc_url: None,
            data_dir: PathBuf::from("./data"),
            wallet_address: None,
            rate_interval_seconds: 30,
            token_sync_interval_seconds: 300, // 5 minutes
            notification_interval_seconds: 60,
            history_interval_seconds: 60,
        }
    }
}

impl Config {
    /// Resolve the network descriptor, honouring the file and RPC overrides
    pub fn network(&self) -> Result<NetworkDescriptor> {
        let mut descriptor = match &self.network_file {
            Some(path) => NetworkDescriptor::from_file(path)?,
            None => self.environment.descriptor()?,
        };

        if let Some(rpc_url) = &self.rpc_url {
            descriptor.endpoint = rpc_url.clone();
        }

        Ok(descriptor)
    }

    pub fn rate_interval(&self) -> Duration {
        Duration::from_secs(self.rate_interval_seconds)
    }

    pub fn token_sync_interval(&self) -> Duration {
        Duration::from_secs(self.token_sync_interval_seconds)
    }

    pub fn notification_interval(&self) -> Duration {
        Duration::from_secs(self.notification_interval_seconds)
    }

    pub fn history_interval(&self) -> Duration {
        Duration::from_secs(self.history_interval_seconds)
    }
}

fn parse_interval(name: &str, config_value: &mut u64) -> Result<()> {
    if let Ok(raw) = env::var(name) {
        let value = raw
            .parse::<u64>()
            .map_err(|_| Error::Config(format!("{} must be a number of seconds, got '{}'", name, raw)))?;
        if value == 0 {
            return Err(Error::Config(format!("{} must be greater than zero", name)));
        }
        *config_value = value;
    }
    Ok(())
}

/// Loads configuration from environment variables, falling back to default values
pub fn load_config() -> Result<Config> {
    let mut config = Config::default();

    if let Ok(environment) = env::var("KYBER_ENV") {
        config.environment = environment.parse()?;
    }

    if let Ok(path) = env::var("KYBER_NETWORK_FILE") {
        config.network_file = Some(PathBuf::from(path));
    }

    if let Ok(rpc_url) = env::var("RPC_URL") {
        config.rpc_url = Some(rpc_url);
    }

    if let Ok(data_dir) = env::var("DATA_DIR") {
        config.data_dir = PathBuf::from(data_dir);
    }

    if let Ok(wallet) = env::var("WALLET_ADDRESS") {
        config.wallet_address = Some(wallet);
    }

    parse_interval("RATE_INTERVAL_SECONDS", &mut config.rate_interval_seconds)?;
    parse_interval("TOKEN_SYNC_INTERVAL_SECONDS", &mut config.token_sync_interval_seconds)?;
    parse_interval("NOTIFICATION_INTERVAL_SECONDS", &mut config.notification_interval_seconds)?;
    parse_interval("HISTORY_INTERVAL_SECONDS", &mut config.history_interval_seconds)?;

    Ok(config)
}
