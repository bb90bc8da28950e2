use crate::error::{Error, Result};
use crate::models::{normalize_address, Token};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const MAINNET_JSON: &str = include_str!("networks/mainnet.json");
const ROPSTEN_JSON: &str = include_str!("networks/ropsten.json");
const RINKEBY_JSON: &str = include_str!("networks/rinkeby.json");
const STAGING_JSON: &str = include_str!("networks/staging.json");

fn default_eth_address() -> String {
    "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee".to_string()
}

/// Deployment profile the wallet talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Mainnet,
    Ropsten,
    Rinkeby,
    Staging,
}

impl Environment {
    /// Parse the descriptor bundled with the binary for this environment
    pub fn descriptor(&self) -> Result<NetworkDescriptor> {
        let raw = match self {
            Environment::Mainnet => MAINNET_JSON,
            Environment::Ropsten => ROPSTEN_JSON,
            Environment::Rinkeby => RINKEBY_JSON,
            Environment::Staging => STAGING_JSON,
        };
        NetworkDescriptor::from_json(raw)
    }

    /// Chain id of the bundled descriptor
    pub fn chain_id(&self) -> Result<u64> {
        Ok(self.descriptor()?.chain_id())
    }

    pub fn is_mainnet(&self) -> bool {
        matches!(self, Environment::Mainnet | Environment::Staging)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Mainnet => "mainnet",
            Environment::Ropsten => "ropsten",
            Environment::Rinkeby => "rinkeby",
            Environment::Staging => "staging",
        })
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" | "production" => Ok(Environment::Mainnet),
            "ropsten" => Ok(Environment::Ropsten),
            "rinkeby" => Ok(Environment::Rinkeby),
            "staging" => Ok(Environment::Staging),
            other => Err(Error::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Chain id, endpoints and contract addresses of one network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub network_id: u64,
    /// JSON-RPC endpoint
    pub endpoint: String,
    /// Base URL of the currency list and user service
    pub kyber_api: String,
    /// Base URL of the rate tracker
    pub tracker_api: String,
    /// Etherscan-compatible history API
    pub explorer_api: String,
    #[serde(default)]
    pub explorer_api_key: Option<String>,
    /// Kyber network proxy contract
    pub network_address: String,
    pub ens_registry: String,
    #[serde(default = "default_eth_address")]
    pub eth_address: String,
    /// Tokens that seed an empty catalog before the first sync
    #[serde(default)]
    pub tokens: Vec<Token>,
}

impl NetworkDescriptor {
    pub fn from_json(raw: &str) -> Result<Self> {
        let descriptor: NetworkDescriptor = serde_json::from_str(raw)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "failed to read network file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json(&raw)
    }

    pub fn chain_id(&self) -> u64 {
        self.network_id
    }

    /// Check contract addresses parse and endpoints are present
    pub fn validate(&self) -> Result<()> {
        for (field, url) in [
            ("endpoint", &self.endpoint),
            ("kyber_api", &self.kyber_api),
            ("tracker_api", &self.tracker_api),
            ("explorer_api", &self.explorer_api),
        ] {
            if url.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", field)));
            }
        }

        normalize_address(&self.network_address)?;
        normalize_address(&self.ens_registry)?;
        normalize_address(&self.eth_address)?;
        for token in &self.tokens {
            normalize_address(&token.address)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_descriptors_parse() {
        for env in [
            Environment::Mainnet,
            Environment::Ropsten,
            Environment::Rinkeby,
            Environment::Staging,
        ] {
            let descriptor = env.descriptor().unwrap();
            assert!(!descriptor.endpoint.is_empty(), "{} endpoint", env);
        }
        assert_eq!(Environment::Mainnet.descriptor().unwrap().chain_id(), 1);
        assert_eq!(Environment::Ropsten.descriptor().unwrap().chain_id(), 3);
        assert_eq!(Environment::Rinkeby.chain_id().unwrap(), 4);
    }

    #[test]
    fn mainnet_endpoints_need_no_project_id() {
        for env in [Environment::Mainnet, Environment::Staging] {
            let endpoint = env.descriptor().unwrap().endpoint;
            assert!(endpoint.starts_with("https://"), "{} endpoint", env);
            assert!(!endpoint.contains("infura.io/v3"), "{} endpoint", env);
        }
    }

    #[test]
    fn environment_names_round_trip() {
        assert_eq!("Ropsten".parse::<Environment>().unwrap(), Environment::Ropsten);
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Mainnet);
        assert!(matches!(
            "kovan".parse::<Environment>(),
            Err(Error::UnknownEnvironment(_))
        ));
    }

    #[test]
    fn rejects_bad_contract_address() {
        let raw = r#"{
            "network_id": 1,
            "endpoint": "http://localhost:8545",
            "kyber_api": "http://localhost",
            "tracker_api": "http://localhost",
            "explorer_api": "http://localhost",
            "network_address": "0xnope",
            "ens_registry": "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e"
        }"#;
        assert!(matches!(
            NetworkDescriptor::from_json(raw),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn loads_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.json");
        std::fs::write(
            &path,
            r#"{
                "network_id": 1337,
                "endpoint": "http://localhost:8545",
                "kyber_api": "http://localhost:3000",
                "tracker_api": "http://localhost:3001",
                "explorer_api": "http://localhost:3002/api",
                "network_address": "0x818E6FECD516Ecc3849DAf6845e3EC868087B755",
                "ens_registry": "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e"
            }"#,
        )
        .unwrap();

        let descriptor = NetworkDescriptor::from_file(&path).unwrap();
        assert_eq!(descriptor.chain_id(), 1337);
        assert_eq!(descriptor.eth_address, default_eth_address());
        assert!(descriptor.tokens.is_empty());
    }
}
