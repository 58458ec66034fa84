//! EVM-compatible blockchain client implementation.
//!
//! Covers the JSON-RPC calls needed to find contract deployments and read
//! their bytecode. Every call is bounded by the chain's RPC timeout.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::{
	models::{Chain, EvmBlock, EvmReceipt},
	services::blockchain::{
		client::{with_timeout, BlockChainClient},
		transports::{BlockchainTransport, HttpTransportClient},
		BlockChainError,
	},
};

/// Client implementation for Ethereum Virtual Machine (EVM) compatible blockchains
#[derive(Clone)]
pub struct EvmClient<T: Send + Sync + Clone> {
	transport: T,
	timeout: Duration,
}

impl<T: Send + Sync + Clone> EvmClient<T> {
	/// Creates a new EVM client instance with a specific transport client
	pub fn new_with_transport(transport: T, timeout: Duration) -> Self {
		Self { transport, timeout }
	}
}

impl EvmClient<HttpTransportClient> {
	/// Connects to the chain's RPC endpoints
	pub async fn new(chain: &Chain) -> Result<Self, BlockChainError> {
		let transport = HttpTransportClient::new(chain).await?;
		Ok(Self::new_with_transport(transport, chain.rpc_timeout()))
	}
}

impl<T: Send + Sync + Clone + BlockchainTransport> EvmClient<T> {
	/// Performs a call and returns its `result`, `None` when the node answered `null`
	async fn call<R: DeserializeOwned>(
		&self,
		method: &str,
		params: Value,
	) -> Result<Option<R>, BlockChainError> {
		let response = with_timeout(
			self.timeout,
			method,
			self.transport.send_raw_request(method, Some(params)),
		)
		.await?;

		let result = response.get("result").ok_or_else(|| {
			BlockChainError::request_error(format!("{}: missing 'result' field", method))
		})?;

		if result.is_null() {
			return Ok(None);
		}

		serde_json::from_value(result.clone()).map(Some).map_err(|e| {
			BlockChainError::request_error(format!("{}: failed to parse result: {}", method, e))
		})
	}
}

/// Extended functionality specific to EVM-compatible blockchains
#[async_trait]
pub trait EvmClientTrait: BlockChainClient {
	/// Retrieves a transaction receipt, `None` if the node does not know it
	async fn get_transaction_receipt(
		&self,
		transaction_hash: String,
	) -> Result<Option<EvmReceipt>, BlockChainError>;

	/// Retrieves the deployed bytecode at `address` as a `0x`-prefixed hex string
	async fn get_code(&self, address: String) -> Result<String, BlockChainError>;
}

#[async_trait]
impl<T: Send + Sync + Clone + BlockchainTransport> EvmClientTrait for EvmClient<T> {
	async fn get_transaction_receipt(
		&self,
		transaction_hash: String,
	) -> Result<Option<EvmReceipt>, BlockChainError> {
		self.call("eth_getTransactionReceipt", json!([transaction_hash]))
			.await
	}

	async fn get_code(&self, address: String) -> Result<String, BlockChainError> {
		let code: Option<String> = self.call("eth_getCode", json!([address, "latest"])).await?;
		Ok(code.unwrap_or_else(|| "0x".to_string()))
	}
}

#[async_trait]
impl<T: Send + Sync + Clone + BlockchainTransport> BlockChainClient for EvmClient<T> {
	async fn get_latest_block_number(&self) -> Result<u64, BlockChainError> {
		let hex_str: String = self
			.call("eth_blockNumber", json!([]))
			.await?
			.ok_or_else(|| BlockChainError::request_error("eth_blockNumber returned null"))?;

		u64::from_str_radix(hex_str.trim_start_matches("0x"), 16).map_err(|e| {
			BlockChainError::request_error(format!("Failed to parse block number: {}", e))
		})
	}

	async fn get_block(&self, block_number: u64) -> Result<Option<EvmBlock>, BlockChainError> {
		self.call(
			"eth_getBlockByNumber",
			json!([format!("0x{:x}", block_number), true]),
		)
		.await
	}
}
