use super::serde_helpers::{f64_lenient, f64_lenient_or_zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Exchange rate between two token symbols
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub source: String,
    pub dest: String,
    #[serde(deserialize_with = "f64_lenient")]
    pub rate: f64,
    #[serde(rename = "minRate", default, deserialize_with = "f64_lenient_or_zero")]
    pub min_rate: f64,
}

/// Price of a token in USD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsdRate {
    pub symbol: String,
    #[serde(rename = "rate_usd_now", alias = "usd_price", deserialize_with = "f64_lenient")]
    pub price_usd: f64,
    #[serde(rename = "change_usd_24h", default, deserialize_with = "f64_lenient_or_zero")]
    pub change_24h: f64,
}

/// A complete snapshot of the rates produced by one successful poll.
///
/// Snapshots are never patched: a new poll builds a new table and swaps it in.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    pairs: HashMap<(String, String), Rate>,
    usd: HashMap<String, UsdRate>,
    updated_at: Option<DateTime<Utc>>,
}

impl RateTable {
    pub fn new(rates: Vec<Rate>, usd_rates: Vec<UsdRate>) -> Self {
        let pairs = rates
            .into_iter()
            .map(|r| ((r.source.to_uppercase(), r.dest.to_uppercase()), r))
            .collect();
        let usd = usd_rates
            .into_iter()
            .map(|r| (r.symbol.to_uppercase(), r))
            .collect();

        Self {
            pairs,
            usd,
            updated_at: Some(Utc::now()),
        }
    }

    /// Rate from `source` to `dest`; a token always converts to itself at 1.
    pub fn rate(&self, source: &str, dest: &str) -> Option<f64> {
        let source = source.to_uppercase();
        let dest = dest.to_uppercase();
        if source == dest {
            return Some(1.0);
        }
        self.pairs.get(&(source, dest)).map(|r| r.rate)
    }

    pub fn pair(&self, source: &str, dest: &str) -> Option<&Rate> {
        self.pairs.get(&(source.to_uppercase(), dest.to_uppercase()))
    }

    pub fn usd_rate(&self, symbol: &str) -> Option<&UsdRate> {
        self.usd.get(&symbol.to_uppercase())
    }

    /// Value of `amount` units of `symbol` in USD
    pub fn value_in_usd(&self, symbol: &str, amount: f64) -> Option<f64> {
        self.usd_rate(symbol).map(|r| r.price_usd * amount)
    }

    pub fn rates(&self) -> impl Iterator<Item = &Rate> {
        self.pairs.values()
    }

    pub fn usd_rates(&self) -> impl Iterator<Item = &UsdRate> {
        self.usd.values()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.usd.is_empty()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_accepts_string_and_number_encodings() {
        let json = r#"[
            {"source": "ETH", "dest": "KNC", "rate": "120.5", "minRate": 118.0},
            {"source": "KNC", "dest": "ETH", "rate": 0.0083}
        ]"#;
        let rates: Vec<Rate> = serde_json::from_str(json).unwrap();
        assert_eq!(rates[0].rate, 120.5);
        assert_eq!(rates[0].min_rate, 118.0);
        assert_eq!(rates[1].min_rate, 0.0);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let table = RateTable::new(
            vec![Rate {
                source: "ETH".into(),
                dest: "KNC".into(),
                rate: 120.5,
                min_rate: 118.0,
            }],
            vec![UsdRate {
                symbol: "ETH".into(),
                price_usd: 200.0,
                change_24h: -1.5,
            }],
        );

        assert_eq!(table.rate("eth", "knc"), Some(120.5));
        assert_eq!(table.rate("KNC", "ETH"), None);
        assert_eq!(table.rate("dai", "DAI"), Some(1.0));
        assert_eq!(table.value_in_usd("eth", 2.0), Some(400.0));
        assert!(table.updated_at().is_some());
    }
}
