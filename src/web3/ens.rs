//! ENS name normalisation and EIP-137 namehash.

use crate::error::{Error, Result};
use alloy_primitives::{keccak256, B256};
use regex::Regex;
use std::sync::OnceLock;

const ENS_NAME_PATTERN: &str = r"^[a-z0-9-]+(\.[a-z0-9-]+)+$";

fn ens_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ENS_NAME_PATTERN).expect("Failed to compile ENS name pattern"))
}

/// Lower-case and validate a dotted ENS name such as `vitalik.eth`
pub fn normalize(name: &str) -> Result<String> {
    let name = name.trim().to_lowercase();
    if !ens_name_regex().is_match(&name) {
        return Err(Error::InvalidEnsName(name));
    }
    Ok(name)
}

/// Whether the input looks like an ENS name rather than a hex address
pub fn is_ens_name(input: &str) -> bool {
    let input = input.trim();
    !input.starts_with("0x") && normalize(input).is_ok()
}

/// Recursive keccak hash of the labels, right to left
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }

    for label in name.rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(label_hash.as_slice());
        node = keccak256(buf);
    }

    node
}
