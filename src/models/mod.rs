pub mod alert;
pub mod contact;
pub mod notification;
pub mod rate;
pub mod token;
pub mod transaction;
pub mod user;
mod serde_helpers;

pub use alert::{AlertBase, AlertStatus, PriceAlert};
pub use contact::Contact;
pub use notification::Notification;
pub use rate::{Rate, RateTable, UsdRate};
pub use token::Token;
pub use transaction::{Transaction, TransactionKind};
pub use user::{KycStatus, User};

use crate::error::{Error, Result};
use alloy_primitives::Address;
use std::str::FromStr;

/// Validate an Ethereum address and return its lower-cased form, used as a storage key.
pub fn normalize_address(address: &str) -> Result<String> {
    let trimmed = address.trim();
    Address::from_str(trimmed).map_err(|_| Error::InvalidAddress(trimmed.to_string()))?;
    Ok(trimmed.to_lowercase())
}
