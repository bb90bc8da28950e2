use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An address book entry, local to one wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub address: String,
    pub name: String,
    pub last_used: DateTime<Utc>,
}

impl Contact {
    pub fn new(address: &str, name: &str) -> Self {
        Self {
            address: address.to_string(),
            name: name.to_string(),
            last_used: Utc::now(),
        }
    }
}
