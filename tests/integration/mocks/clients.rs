//! Mock implementations of blockchain clients.
//!
//! - [`MockEvmClientTrait`] - Mock implementation of the EVM blockchain client
//!
//! These mocks allow testing pollers and the correlation engine without
//! network connections.

use async_trait::async_trait;
use mockall::mock;

use contract_sentinel::{
	models::{EvmBlock, EvmReceipt},
	services::blockchain::{BlockChainClient, BlockChainError, EvmClientTrait},
};

mock! {
	/// Mock implementation of the EVM client trait.
	pub EvmClientTrait {}

	#[async_trait]
	impl BlockChainClient for EvmClientTrait {
		async fn get_latest_block_number(&self) -> Result<u64, BlockChainError>;
		async fn get_block(&self, block_number: u64) -> Result<Option<EvmBlock>, BlockChainError>;
	}

	#[async_trait]
	impl EvmClientTrait for EvmClientTrait {
		async fn get_transaction_receipt(
			&self,
			transaction_hash: String,
		) -> Result<Option<EvmReceipt>, BlockChainError>;

		async fn get_code(&self, address: String) -> Result<String, BlockChainError>;
	}
}
