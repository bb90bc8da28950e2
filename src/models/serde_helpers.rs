//! Remote services encode numbers either as JSON numbers or as strings.

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    String(String),
}

pub fn f64_lenient<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom(format!("number {} is not representable as f64", n))),
        NumberOrString::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| de::Error::custom(format!("invalid number '{}': {}", s, e))),
    }
}

pub fn f64_lenient_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NumberOrString>::deserialize(deserializer).and_then(|value| match value {
        None => Ok(0.0),
        Some(NumberOrString::Number(n)) => Ok(n.as_f64().unwrap_or(0.0)),
        Some(NumberOrString::String(s)) if s.trim().is_empty() => Ok(0.0),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| de::Error::custom(format!("invalid number '{}': {}", s, e))),
    })
}

pub fn u64_lenient<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n
            .as_u64()
            .ok_or_else(|| de::Error::custom(format!("number {} is not an unsigned integer", n))),
        NumberOrString::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| de::Error::custom(format!("invalid integer '{}': {}", s, e))),
    }
}

pub fn u8_lenient<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = u64_lenient(deserializer)?;
    u8::try_from(value).map_err(|_| de::Error::custom(format!("decimals {} out of range", value)))
}
