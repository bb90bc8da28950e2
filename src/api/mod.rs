mod explorer;
mod kyber;

pub use explorer::ExplorerClient;
pub use kyber::KyberClient;

use crate::error::{Error, Result};
use crate::models::{Notification, PriceAlert, Rate, Token, Transaction, UsdRate};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Source of token-to-token and token-to-USD rates
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self) -> Result<Vec<Rate>>;

    async fn fetch_usd_rates(&self) -> Result<Vec<UsdRate>>;
}

/// Source of the server-published token catalog
#[async_trait]
pub trait TokenListSource: Send + Sync {
    async fn fetch_supported_tokens(&self) -> Result<Vec<Token>>;
}

/// Source of the signed-in user's notifications and price alerts
#[async_trait]
pub trait NotificationSource: Send + Sync {
    async fn fetch_notifications(&self, access_token: &str) -> Result<Vec<Notification>>;

    async fn fetch_alerts(&self, access_token: &str) -> Result<Vec<PriceAlert>>;
}

/// Source of a wallet's on-chain history
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn fetch_transactions(&self, address: &str, start_block: u64) -> Result<Vec<Transaction>>;
}

/// List payloads come either bare or wrapped in `{"data": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ListPayload<T> {
    Wrapped { data: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListPayload<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            ListPayload::Wrapped { data } => data,
            ListPayload::Bare(items) => items,
        }
    }
}

/// Send a request and decode its JSON body.
///
/// Non-2xx statuses are `Http` errors; bodies that do not fit `T` are `Cast` errors.
pub(crate) async fn get_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
    let response = request.send().await?.error_for_status()?;
    let url = response.url().to_string();
    let body = response.bytes().await?;
    serde_json::from_slice(&body)
        .map_err(|e| Error::cast(format!("unexpected payload from {}: {}", url, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_payload_accepts_both_shapes() {
        let wrapped: ListPayload<u32> = serde_json::from_str(r#"{"data": [1, 2]}"#).unwrap();
        let bare: ListPayload<u32> = serde_json::from_str("[3]").unwrap();
        assert_eq!(wrapped.into_vec(), vec![1, 2]);
        assert_eq!(bare.into_vec(), vec![3]);
    }
}
