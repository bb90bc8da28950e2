use super::serde_helpers::f64_lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currency a price alert is quoted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertBase {
    Usd,
    Eth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Triggered,
    Deleted,
}

impl fmt::Display for AlertBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertBase::Usd => "usd",
            AlertBase::Eth => "eth",
        })
    }
}

impl FromStr for AlertBase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "usd" => Ok(AlertBase::Usd),
            "eth" => Ok(AlertBase::Eth),
            other => Err(format!("unknown alert base '{}'", other)),
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertStatus::Active => "active",
            AlertStatus::Triggered => "triggered",
            AlertStatus::Deleted => "deleted",
        })
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(AlertStatus::Active),
            "triggered" => Ok(AlertStatus::Triggered),
            "deleted" => Ok(AlertStatus::Deleted),
            other => Err(format!("unknown alert status '{}'", other)),
        }
    }
}

/// A price alert on a token, fired when the price crosses `target`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: i64,
    pub symbol: String,
    pub base: AlertBase,
    #[serde(rename = "alert_price", deserialize_with = "f64_lenient")]
    pub target: f64,
    #[serde(rename = "is_above")]
    pub above: bool,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub triggered_at: Option<DateTime<Utc>>,
}

impl PriceAlert {
    /// Whether `price` satisfies the alert condition
    pub fn is_crossed(&self, price: f64) -> bool {
        if self.above {
            price >= self.target
        } else {
            price <= self.target
        }
    }
}
