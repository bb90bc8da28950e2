use crate::api::{get_json, ListPayload, NotificationSource, RateSource, TokenListSource};
use crate::config::NetworkDescriptor;
use crate::error::{Error, Result};
use crate::models::{Notification, PriceAlert, Rate, Token, UsdRate};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct CurrenciesResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    data: Vec<Token>,
}

fn default_success() -> bool {
    true
}

/// Client for the Kyber tracker and user services
#[derive(Clone)]
pub struct KyberClient {
    http: reqwest::Client,
    kyber_api: String,
    tracker_api: String,
}

impl KyberClient {
    pub fn new(network: &NetworkDescriptor) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(http, &network.kyber_api, &network.tracker_api))
    }

    pub fn with_client(http: reqwest::Client, kyber_api: &str, tracker_api: &str) -> Self {
        Self {
            http,
            kyber_api: kyber_api.trim_end_matches('/').to_string(),
            tracker_api: tracker_api.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RateSource for KyberClient {
    async fn fetch_rates(&self) -> Result<Vec<Rate>> {
        let url = format!("{}/api/tokens/rates", self.tracker_api);
        debug!("Fetching rates from {}", url);
        let payload: ListPayload<Rate> = get_json(self.http.get(&url)).await?;
        Ok(payload.into_vec())
    }

    async fn fetch_usd_rates(&self) -> Result<Vec<UsdRate>> {
        let url = format!("{}/api/tokens/pairs", self.tracker_api);
        debug!("Fetching USD rates from {}", url);
        let pairs: HashMap<String, UsdRate> = get_json(self.http.get(&url)).await?;
        Ok(pairs.into_values().collect())
    }
}

#[async_trait]
impl TokenListSource for KyberClient {
    async fn fetch_supported_tokens(&self) -> Result<Vec<Token>> {
        let url = format!("{}/currencies", self.kyber_api);
        debug!("Fetching supported tokens from {}", url);
        let response: CurrenciesResponse = get_json(self.http.get(&url)).await?;
        if !response.success {
            return Err(Error::cast("currency list reported failure"));
        }
        Ok(response.data)
    }
}

#[async_trait]
impl NotificationSource for KyberClient {
    async fn fetch_notifications(&self, access_token: &str) -> Result<Vec<Notification>> {
        let url = format!("{}/api/notifications", self.kyber_api);
        let payload: ListPayload<Notification> =
            get_json(self.http.get(&url).bearer_auth(access_token)).await?;
        Ok(payload.into_vec())
    }

    async fn fetch_alerts(&self, access_token: &str) -> Result<Vec<PriceAlert>> {
        let url = format!("{}/api/alerts", self.kyber_api);
        let payload: ListPayload<PriceAlert> =
            get_json(self.http.get(&url).bearer_auth(access_token)).await?;
        Ok(payload.into_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_currency_list() {
        let json = r#"{
            "success": true,
            "data": [
                {"symbol": "KNC", "name": "KyberNetwork", "address": "0xdd974D5C2e2928deA5F71b9825b8b646686BD200", "decimals": "18"},
                {"symbol": "DAI", "address": "0x6B175474E89094C44Da98b954EedeAC495271d0F", "decimals": 18, "icon": "dai.png"}
            ]
        }"#;
        let response: CurrenciesResponse = serde_json::from_str(json).unwrap();
        assert!(response.success);
        assert_eq!(response.data[0].decimals, 18);
        assert_eq!(response.data[1].icon.as_deref(), Some("dai.png"));
        assert!(!response.data[1].is_custom);
    }

    #[test]
    fn decodes_tracker_pairs() {
        let json = r#"{
            "ETH_KNC": {"symbol": "KNC", "rate_usd_now": "0.75", "change_usd_24h": -2.1},
            "ETH_DAI": {"symbol": "DAI", "rate_usd_now": 1.0}
        }"#;
        let pairs: HashMap<String, UsdRate> = serde_json::from_str(json).unwrap();
        assert_eq!(pairs["ETH_KNC"].price_usd, 0.75);
        assert_eq!(pairs["ETH_DAI"].change_24h, 0.0);
    }

    #[test]
    fn strips_trailing_slashes() {
        let client = KyberClient::with_client(reqwest::Client::new(), "https://api/", "https://tracker//");
        assert_eq!(client.kyber_api, "https://api");
        assert_eq!(client.tracker_api, "https://tracker");
    }
}
