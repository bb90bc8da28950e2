use super::serde_helpers::u8_lenient;
use serde::{Deserialize, Serialize};

/// A token in the wallet's catalog, keyed by contract address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub address: String,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "u8_lenient")]
    pub decimals: u8,
    #[serde(default)]
    pub icon: Option<String>,
    /// Added by the user rather than the supported list
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default)]
    pub is_hidden: bool,
}

impl Token {
    pub fn new(address: &str, symbol: &str, name: &str, decimals: u8) -> Self {
        Self {
            address: address.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals,
            icon: None,
            is_custom: false,
            is_hidden: false,
        }
    }

    pub fn is_eth(&self, eth_address: &str) -> bool {
        self.address.eq_ignore_ascii_case(eth_address)
    }
}
