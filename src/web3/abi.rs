//! Typed contract calls and their return decoding.

use crate::error::{Error, Result};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};

sol! {
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256 balance);
        function decimals() external view returns (uint8);
        function allowance(address owner, address spender) external view returns (uint256 remaining);
    }

    interface IENSRegistry {
        function resolver(bytes32 node) external view returns (address);
    }

    interface IENSResolver {
        function addr(bytes32 node) external view returns (address);
    }

    interface IKyberNetworkProxy {
        function getExpectedRate(address src, address dest, uint256 srcQty)
            external view returns (uint256 expectedRate, uint256 slippageRate);
    }
}

/// A read-only call against a contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    Erc20Balance { token: Address, owner: Address },
    Erc20Decimals { token: Address },
    Erc20Allowance { token: Address, owner: Address, spender: Address },
    EnsResolver { registry: Address, node: B256 },
    EnsAddr { resolver: Address, node: B256 },
    ExpectedRate { proxy: Address, src: Address, dest: Address, amount: U256 },
}

/// Decoded return value of a `ContractCall`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutput {
    Amount(U256),
    Decimals(u8),
    Address(Address),
    ExpectedRate { expected: U256, slippage: U256 },
}

impl ContractCall {
    pub fn name(&self) -> &'static str {
        match self {
            ContractCall::Erc20Balance { .. } => "balanceOf",
            ContractCall::Erc20Decimals { .. } => "decimals",
            ContractCall::Erc20Allowance { .. } => "allowance",
            ContractCall::EnsResolver { .. } => "resolver",
            ContractCall::EnsAddr { .. } => "addr",
            ContractCall::ExpectedRate { .. } => "getExpectedRate",
        }
    }

    /// Contract the call is sent to
    pub fn to(&self) -> Address {
        match self {
            ContractCall::Erc20Balance { token, .. }
            | ContractCall::Erc20Decimals { token }
            | ContractCall::Erc20Allowance { token, .. } => *token,
            ContractCall::EnsResolver { registry, .. } => *registry,
            ContractCall::EnsAddr { resolver, .. } => *resolver,
            ContractCall::ExpectedRate { proxy, .. } => *proxy,
        }
    }

    /// ABI-encoded calldata, selector first
    pub fn encode(&self) -> Bytes {
        let data = match self {
            ContractCall::Erc20Balance { owner, .. } => {
                IERC20::balanceOfCall { owner: *owner }.abi_encode()
            }
            ContractCall::Erc20Decimals { .. } => IERC20::decimalsCall {}.abi_encode(),
            ContractCall::Erc20Allowance { owner, spender, .. } => IERC20::allowanceCall {
                owner: *owner,
                spender: *spender,
            }
            .abi_encode(),
            ContractCall::EnsResolver { node, .. } => {
                IENSRegistry::resolverCall { node: *node }.abi_encode()
            }
            ContractCall::EnsAddr { node, .. } => IENSResolver::addrCall { node: *node }.abi_encode(),
            ContractCall::ExpectedRate {
                src, dest, amount, ..
            } => IKyberNetworkProxy::getExpectedRateCall {
                src: *src,
                dest: *dest,
                srcQty: *amount,
            }
            .abi_encode(),
        };
        Bytes::from(data)
    }

    /// Decode the raw return data of this call.
    ///
    /// Data that does not match the declared return shape is a `Cast` error.
    pub fn decode(&self, data: &[u8]) -> Result<CallOutput> {
        let cast = |e: alloy_sol_types::Error| {
            Error::Cast(format!("{} returned {} bytes: {}", self.name(), data.len(), e))
        };

        let output = match self {
            ContractCall::Erc20Balance { .. } => CallOutput::Amount(
                IERC20::balanceOfCall::abi_decode_returns(data, true)
                    .map_err(cast)?
                    .balance,
            ),
            ContractCall::Erc20Decimals { .. } => CallOutput::Decimals(
                IERC20::decimalsCall::abi_decode_returns(data, true)
                    .map_err(cast)?
                    ._0,
            ),
            ContractCall::Erc20Allowance { .. } => CallOutput::Amount(
                IERC20::allowanceCall::abi_decode_returns(data, true)
                    .map_err(cast)?
                    .remaining,
            ),
            ContractCall::EnsResolver { .. } => CallOutput::Address(
                IENSRegistry::resolverCall::abi_decode_returns(data, true)
                    .map_err(cast)?
                    ._0,
            ),
            ContractCall::EnsAddr { .. } => CallOutput::Address(
                IENSResolver::addrCall::abi_decode_returns(data, true)
                    .map_err(cast)?
                    ._0,
            ),
            ContractCall::ExpectedRate { .. } => {
                let ret = IKyberNetworkProxy::getExpectedRateCall::abi_decode_returns(data, true)
                    .map_err(cast)?;
                CallOutput::ExpectedRate {
                    expected: ret.expectedRate,
                    slippage: ret.slippageRate,
                }
            }
        };
        Ok(output)
    }
}

impl CallOutput {
    pub fn into_amount(self) -> Result<U256> {
        match self {
            CallOutput::Amount(amount) => Ok(amount),
            other => Err(Error::cast(format!("expected an amount, got {:?}", other))),
        }
    }

    pub fn into_decimals(self) -> Result<u8> {
        match self {
            CallOutput::Decimals(decimals) => Ok(decimals),
            other => Err(Error::cast(format!("expected decimals, got {:?}", other))),
        }
    }

    pub fn into_address(self) -> Result<Address> {
        match self {
            CallOutput::Address(address) => Ok(address),
            other => Err(Error::cast(format!("expected an address, got {:?}", other))),
        }
    }

    pub fn into_expected_rate(self) -> Result<(U256, U256)> {
        match self {
            CallOutput::ExpectedRate { expected, slippage } => Ok((expected, slippage)),
            other => Err(Error::cast(format!("expected a rate pair, got {:?}", other))),
        }
    }
}
