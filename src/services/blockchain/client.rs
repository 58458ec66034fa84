//! Core blockchain client interface.

use std::{future::Future, time::Duration};

use async_trait::async_trait;

use crate::{models::EvmBlock, services::blockchain::BlockChainError};

/// Defines the core interface for blockchain clients
///
/// The pollers only need the chain tip and individual blocks; everything
/// else lives on the chain-specific extension traits.
#[async_trait]
pub trait BlockChainClient: Send + Sync {
	/// Retrieves the latest block number from the blockchain
	async fn get_latest_block_number(&self) -> Result<u64, BlockChainError>;

	/// Retrieves a single block with its transactions.
	///
	/// Returns `Ok(None)` when the node does not know the block (yet).
	async fn get_block(&self, block_number: u64) -> Result<Option<EvmBlock>, BlockChainError>;
}

/// Bounds `future` by `duration`, turning an elapsed timer into a `TimeoutError`
pub async fn with_timeout<T, F>(
	duration: Duration,
	operation: &str,
	future: F,
) -> Result<T, BlockChainError>
where
	F: Future<Output = Result<T, BlockChainError>>,
{
	match tokio::time::timeout(duration, future).await {
		Ok(result) => result,
		Err(_) => Err(BlockChainError::timeout_error(format!(
			"{} did not complete within {}ms",
			operation,
			duration.as_millis()
		))),
	}
}
