/// Format an address for display (shortened)
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    let len = chars.len();
    if len <= 12 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[len - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Format a rate with precision that suits its magnitude
pub fn format_rate(rate: f64) -> String {
    if rate == 0.0 {
        "0".to_string()
    } else if rate.abs() >= 1000.0 {
        format!("{:.2}", rate)
    } else if rate.abs() >= 1.0 {
        format!("{:.4}", rate)
    } else {
        format!("{:.8}", rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortens_addresses() {
        assert_eq!(
            short_address("0xdd974d5c2e2928dea5f71b9825b8b646686bd200"),
            "0xdd97...d200"
        );
        assert_eq!(short_address("0x1234"), "0x1234");
        assert_eq!(short_address("ключ-кошелька-ёж"), "ключ-к...а-ёж");
    }

    #[test]
    fn rate_precision_follows_magnitude() {
        assert_eq!(format_rate(0.0), "0");
        assert_eq!(format_rate(1234.5678), "1234.57");
        assert_eq!(format_rate(120.5), "120.5000");
        assert_eq!(format_rate(0.00123), "0.00123000");
    }
}
