use crate::error::{Error, Result};
use alloy_primitives::U256;

/// Render a base-unit amount with `decimals` fractional digits, trailing zeros trimmed
pub fn format_units(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// Convert wei to ETH
pub fn wei_to_ether(wei: U256) -> f64 {
    format_units(wei, 18).parse().unwrap_or(f64::MAX)
}

/// Parse a decimal string like "1.5" into base units
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(Error::cast(format!("'{}' is not a decimal amount", amount)));
    }
    if fraction.len() > decimals as usize {
        return Err(Error::cast(format!(
            "'{}' has more than {} decimal places",
            amount, decimals
        )));
    }

    let digits = format!("{}{:0<width$}", whole, fraction, width = decimals as usize);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10)
        .map_err(|e| Error::cast(format!("'{}' out of range: {}", amount, e)))
}
