use crate::config::NetworkDescriptor;
use crate::error::{Error, Result};
use crate::web3::abi::{CallOutput, ContractCall};
use crate::web3::ens;
use crate::web3::parse_address;
use crate::web3::rpc::{parse_data, parse_quantity, RpcRequest, RpcTransport};
use alloy_primitives::{Address, U256};
use log::debug;
use std::sync::Arc;

/// On-chain reads for the wallet: balances, ENS and Kyber expected rates
pub struct Web3Service {
    transport: Arc<dyn RpcTransport>,
    ens_registry: Address,
    network_proxy: Address,
    eth_address: Address,
}

impl Web3Service {
    pub fn new(transport: Arc<dyn RpcTransport>, network: &NetworkDescriptor) -> Result<Self> {
        Ok(Self {
            transport,
            ens_registry: parse_address(&network.ens_registry)?,
            network_proxy: parse_address(&network.network_address)?,
            eth_address: parse_address(&network.eth_address)?,
        })
    }

    /// Run a contract call and decode its return data
    pub async fn call(&self, call: ContractCall) -> Result<CallOutput> {
        debug!("eth_call {} on {}", call.name(), call.to());
        let result = self.transport.request(RpcRequest::eth_call(&call)).await?;
        let data = parse_data(&result)?;
        call.decode(&data)
    }

    pub async fn eth_balance(&self, owner: Address) -> Result<U256> {
        let result = self.transport.request(RpcRequest::eth_get_balance(owner)).await?;
        parse_quantity(&result)
    }

    /// Balance of `token` held by `owner`; the ETH pseudo-address reads the native balance
    pub async fn token_balance(&self, token: Address, owner: Address) -> Result<U256> {
        if token == self.eth_address {
            return self.eth_balance(owner).await;
        }
        self.call(ContractCall::Erc20Balance { token, owner })
            .await?
            .into_amount()
    }

    pub async fn token_decimals(&self, token: Address) -> Result<u8> {
        if token == self.eth_address {
            return Ok(18);
        }
        self.call(ContractCall::Erc20Decimals { token })
            .await?
            .into_decimals()
    }

    pub async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        if token == self.eth_address {
            return Ok(U256::MAX);
        }
        self.call(ContractCall::Erc20Allowance {
            token,
            owner,
            spender,
        })
        .await?
        .into_amount()
    }

    /// Resolve an ENS name; `None` when the name has no resolver or no address
    pub async fn resolve_ens(&self, name: &str) -> Result<Option<Address>> {
        let name = ens::normalize(name)?;
        let node = ens::namehash(&name);

        let resolver = self
            .call(ContractCall::EnsResolver {
                registry: self.ens_registry,
                node,
            })
            .await?
            .into_address()?;
        if resolver == Address::ZERO {
            debug!("ENS name {} has no resolver", name);
            return Ok(None);
        }

        let address = self
            .call(ContractCall::EnsAddr { resolver, node })
            .await?
            .into_address()?;
        if address == Address::ZERO {
            return Ok(None);
        }
        Ok(Some(address))
    }

    /// Expected and worst-case rate for swapping `amount` of `src` into `dest`
    pub async fn expected_rate(&self, src: Address, dest: Address, amount: U256) -> Result<(U256, U256)> {
        self.call(ContractCall::ExpectedRate {
            proxy: self.network_proxy,
            src,
            dest,
            amount,
        })
        .await?
        .into_expected_rate()
    }

    pub async fn block_number(&self) -> Result<u64> {
        let result = self.transport.request(RpcRequest::eth_block_number()).await?;
        let block = parse_quantity(&result)?;
        u64::try_from(block).map_err(|_| Error::cast(format!("block number {} overflows", block)))
    }

    pub async fn gas_price(&self) -> Result<U256> {
        let result = self.transport.request(RpcRequest::eth_gas_price()).await?;
        parse_quantity(&result)
    }

    pub async fn transaction_count(&self, owner: Address) -> Result<u64> {
        let result = self
            .transport
            .request(RpcRequest::eth_get_transaction_count(owner))
            .await?;
        let nonce = parse_quantity(&result)?;
        u64::try_from(nonce).map_err(|_| Error::cast(format!("nonce {} overflows", nonce)))
    }
}
