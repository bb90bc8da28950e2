use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a transaction relative to the wallet that owns the history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Send,
    Receive,
    #[serde(rename = "self")]
    SelfTransfer,
}

impl TransactionKind {
    pub fn classify(wallet: &str, from: &str, to: &str) -> Self {
        let is_from = from.eq_ignore_ascii_case(wallet);
        let is_to = to.eq_ignore_ascii_case(wallet);
        match (is_from, is_to) {
            (true, true) => TransactionKind::SelfTransfer,
            (true, false) => TransactionKind::Send,
            _ => TransactionKind::Receive,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionKind::Send => "send",
            TransactionKind::Receive => "receive",
            TransactionKind::SelfTransfer => "self",
        })
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "send" => Ok(TransactionKind::Send),
            "receive" => Ok(TransactionKind::Receive),
            "self" => Ok(TransactionKind::SelfTransfer),
            other => Err(format!("unknown transaction kind '{}'", other)),
        }
    }
}

/// A cached entry of the wallet's on-chain history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub block_number: u64,
    pub from: String,
    pub to: String,
    /// Amount in the smallest unit, as a decimal string
    pub value: String,
    /// Contract of the transferred token, `None` for plain ETH transfers
    pub token_address: Option<String>,
    pub token_symbol: String,
    pub token_decimals: u8,
    pub nonce: u64,
    pub gas_used: u64,
    pub gas_price: String,
    pub timestamp: i64,
    pub is_error: bool,
    pub kind: TransactionKind,
}
