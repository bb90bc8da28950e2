use crate::api::{get_json, TransactionSource};
use crate::config::NetworkDescriptor;
use crate::error::{Error, Result};
use crate::models::{Transaction, TransactionKind};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const END_BLOCK: u64 = 99_999_999;

/// Etherscan envelope: `result` is a list on success and a message on failure
#[derive(Deserialize)]
struct ExplorerResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExplorerTx {
    block_number: String,
    time_stamp: String,
    hash: String,
    #[serde(default)]
    nonce: String,
    from: String,
    to: String,
    value: String,
    #[serde(default)]
    gas_price: String,
    #[serde(default)]
    gas_used: String,
    #[serde(default)]
    is_error: Option<String>,
    #[serde(default)]
    contract_address: String,
    #[serde(default)]
    token_symbol: Option<String>,
    #[serde(default)]
    token_decimal: Option<String>,
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T> {
    if raw.is_empty() {
        return "0"
            .parse()
            .map_err(|_| Error::cast(format!("{} is empty", field)));
    }
    raw.parse()
        .map_err(|_| Error::cast(format!("{} '{}' is not a number", field, raw)))
}

impl ExplorerTx {
    fn into_transaction(self, wallet: &str, token_transfer: bool) -> Result<Transaction> {
        let kind = TransactionKind::classify(wallet, &self.from, &self.to);
        let (token_address, token_symbol, token_decimals) = if token_transfer {
            (
                Some(self.contract_address.to_lowercase()),
                self.token_symbol.unwrap_or_default(),
                parse_number::<u8>("tokenDecimal", self.token_decimal.as_deref().unwrap_or("18"))?,
            )
        } else {
            (None, "ETH".to_string(), 18)
        };

        Ok(Transaction {
            block_number: parse_number("blockNumber", &self.block_number)?,
            timestamp: parse_number("timeStamp", &self.time_stamp)?,
            nonce: parse_number("nonce", &self.nonce)?,
            gas_used: parse_number("gasUsed", &self.gas_used)?,
            hash: self.hash.to_lowercase(),
            from: self.from.to_lowercase(),
            to: self.to.to_lowercase(),
            value: self.value,
            gas_price: self.gas_price,
            is_error: self.is_error.as_deref() == Some("1"),
            token_address,
            token_symbol,
            token_decimals,
            kind,
        })
    }
}

fn decode_transactions(
    response: ExplorerResponse,
    wallet: &str,
    token_transfer: bool,
) -> Result<Vec<Transaction>> {
    if response.status != "1" {
        if response.message.starts_with("No transactions found") {
            return Ok(Vec::new());
        }
        return Err(Error::cast(format!(
            "explorer error: {} {}",
            response.message, response.result
        )));
    }

    let items: Vec<ExplorerTx> = serde_json::from_value(response.result)
        .map_err(|e| Error::cast(format!("unexpected explorer result: {}", e)))?;
    items
        .into_iter()
        .map(|tx| tx.into_transaction(wallet, token_transfer))
        .collect()
}

/// Etherscan-compatible history client
#[derive(Clone)]
pub struct ExplorerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ExplorerClient {
    pub fn new(network: &NetworkDescriptor) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: network.explorer_api.clone(),
            api_key: network.explorer_api_key.clone(),
        })
    }

    async fn fetch(&self, action: &str, address: &str, start_block: u64) -> Result<Vec<Transaction>> {
        let mut query = vec![
            ("module", "account".to_string()),
            ("action", action.to_string()),
            ("address", address.to_string()),
            ("startblock", start_block.to_string()),
            ("endblock", END_BLOCK.to_string()),
            ("sort", "asc".to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("apikey", key.clone()));
        }

        debug!("Fetching {} for {} from block {}", action, address, start_block);
        let response: ExplorerResponse = get_json(self.http.get(&self.base_url).query(&query)).await?;
        decode_transactions(response, address, action == "tokentx")
    }
}

#[async_trait]
impl TransactionSource for ExplorerClient {
    async fn fetch_transactions(&self, address: &str, start_block: u64) -> Result<Vec<Transaction>> {
        let (mut normal, tokens) = futures::try_join!(
            self.fetch("txlist", address, start_block),
            self.fetch("tokentx", address, start_block),
        )?;
        normal.extend(tokens);
        Ok(normal)
    }
}
