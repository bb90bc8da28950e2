pub mod abi;
pub mod ens;
pub mod rpc;
mod service;

pub use abi::{CallOutput, ContractCall};
pub use rpc::{RpcClient, RpcRequest, RpcTransport};
pub use service::Web3Service;

use crate::error::{Error, Result};
use alloy_primitives::Address;
use std::str::FromStr;

/// Parse a hex address, accepting any letter case
pub fn parse_address(address: &str) -> Result<Address> {
    Address::from_str(address.trim()).map_err(|_| Error::InvalidAddress(address.to_string()))
}
