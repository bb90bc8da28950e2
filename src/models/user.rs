use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Verification state of a user's KYC profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    #[default]
    None,
    Draft,
    Pending,
    Approved,
    Rejected,
    Blocked,
}

impl FromStr for KycStatus {
    type Err = std::convert::Infallible;

    /// Unrecognised values fall back to `None` rather than failing a whole sync.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "draft" => KycStatus::Draft,
            "pending" => KycStatus::Pending,
            "approved" => KycStatus::Approved,
            "rejected" => KycStatus::Rejected,
            "blocked" => KycStatus::Blocked,
            _ => KycStatus::None,
        })
    }
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KycStatus::None => "none",
            KycStatus::Draft => "draft",
            KycStatus::Pending => "pending",
            KycStatus::Approved => "approved",
            KycStatus::Rejected => "rejected",
            KycStatus::Blocked => "blocked",
        };
        f.write_str(s)
    }
}

/// An account on the Kyber user service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub token_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub kyc_status: KycStatus,
    /// Wallet addresses the user has registered with the service
    #[serde(default)]
    pub registered_addresses: Vec<String>,
    #[serde(default)]
    pub is_signed_in: bool,
}

impl User {
    pub fn new(id: i64, name: &str, email: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            email: email.to_string(),
            access_token: String::new(),
            refresh_token: String::new(),
            token_expiry: None,
            kyc_status: KycStatus::None,
            registered_addresses: Vec::new(),
            is_signed_in: false,
        }
    }

    pub fn is_token_expired(&self, now: DateTime<Utc>) -> bool {
        match self.token_expiry {
            Some(expiry) => expiry <= now,
            None => false,
        }
    }

    pub fn has_registered(&self, address: &str) -> bool {
        self.registered_addresses
            .iter()
            .any(|a| a.eq_ignore_ascii_case(address))
    }
}
