//! Per-chain processing state.
//!
//! Files under `<data_dir>/chains/`:
//! - `chain<index>_state.json`: processed block number to `{contract: creation tx hash}`
//! - `chain<index>_last_block.txt`: the cursor
//! - `chain<index>_missed_blocks.txt`: blocks that could not be fetched and still
//!   wait for a retry, one per line

use std::{
	collections::{BTreeMap, BTreeSet, HashMap},
	path::{Path, PathBuf},
	sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{
	error::StorageError,
	file::{read_with_backup, write_atomic, JsonDocument},
};
use crate::{models::ContractCreation, utils::normalize_address};

/// Contracts created in one block, contract address to creation tx hash
pub type BlockContracts = BTreeMap<String, String>;

type ChainState = BTreeMap<u64, BlockContracts>;

/// Interface for the per-chain processing state
#[async_trait]
pub trait ChainStateStore: Send + Sync {
	/// Blocks in `[from, to]` that are already marked processed
	async fn get_processed_blocks(
		&self,
		chain_index: usize,
		from: u64,
		to: u64,
	) -> Result<BTreeSet<u64>, StorageError>;

	/// Marks a block processed together with the contracts it created.
	///
	/// Called even when `contracts` is empty. A contract already recorded for
	/// the block keeps its first tx hash. The block leaves the missed-block log.
	async fn save_block(
		&self,
		chain_index: usize,
		block_number: u64,
		contracts: &[ContractCreation],
	) -> Result<(), StorageError>;

	/// Contracts recorded for a processed block, `None` if the block is not processed
	async fn get_block(
		&self,
		chain_index: usize,
		block_number: u64,
	) -> Result<Option<BlockContracts>, StorageError>;

	async fn get_cursor(&self, chain_index: usize) -> Result<Option<u64>, StorageError>;

	/// Persists the cursor. A value below the stored cursor is ignored.
	async fn save_cursor(&self, chain_index: usize, block_number: u64)
		-> Result<(), StorageError>;

	/// Adds a block to the missed-block log
	async fn save_missed_block(
		&self,
		chain_index: usize,
		block_number: u64,
	) -> Result<(), StorageError>;

	/// Blocks in the missed-block log, waiting to be fetched again
	async fn get_missed_blocks(&self, chain_index: usize) -> Result<BTreeSet<u64>, StorageError>;
}

/// File-backed chain state, one set of files per chain
pub struct FileChainStateStore {
	storage_path: PathBuf,
	locks: Mutex<HashMap<usize, Arc<Mutex<()>>>>,
}

impl FileChainStateStore {
	pub fn new(data_dir: &Path) -> Self {
		Self {
			storage_path: data_dir.join("chains"),
			locks: Mutex::new(HashMap::new()),
		}
	}

	fn state_document(&self, chain_index: usize) -> JsonDocument<ChainState> {
		JsonDocument::new(
			self.storage_path
				.join(format!("chain{}_state.json", chain_index)),
		)
	}

	fn cursor_path(&self, chain_index: usize) -> PathBuf {
		self.storage_path
			.join(format!("chain{}_last_block.txt", chain_index))
	}

	fn missed_blocks_path(&self, chain_index: usize) -> PathBuf {
		self.storage_path
			.join(format!("chain{}_missed_blocks.txt", chain_index))
	}

	async fn chain_lock(&self, chain_index: usize) -> Arc<Mutex<()>> {
		let mut locks = self.locks.lock().await;
		locks.entry(chain_index).or_default().clone()
	}

	async fn read_cursor(&self, chain_index: usize) -> Result<Option<u64>, StorageError> {
		read_with_backup(&self.cursor_path(chain_index), |content| {
			content
				.trim()
				.parse::<u64>()
				.map_err(|e| format!("invalid block number '{}': {}", content.trim(), e))
		})
		.await
	}

	async fn read_missed_blocks(&self, chain_index: usize) -> Result<BTreeSet<u64>, StorageError> {
		let missed = read_with_backup(&self.missed_blocks_path(chain_index), |content| {
			content
				.lines()
				.map(str::trim)
				.filter(|line| !line.is_empty())
				.map(|line| {
					line.parse::<u64>()
						.map_err(|e| format!("invalid block number '{}': {}", line, e))
				})
				.collect::<Result<BTreeSet<u64>, String>>()
		})
		.await?;
		Ok(missed.unwrap_or_default())
	}

	async fn write_missed_blocks(
		&self,
		chain_index: usize,
		missed: &BTreeSet<u64>,
	) -> Result<(), StorageError> {
		let content: String = missed.iter().map(|block| format!("{}\n", block)).collect();
		write_atomic(&self.missed_blocks_path(chain_index), content.as_bytes()).await
	}
}

#[async_trait]
impl ChainStateStore for FileChainStateStore {
	async fn get_processed_blocks(
		&self,
		chain_index: usize,
		from: u64,
		to: u64,
	) -> Result<BTreeSet<u64>, StorageError> {
		if from > to {
			return Ok(BTreeSet::new());
		}
		let state = self.state_document(chain_index).load().await?;
		Ok(state.range(from..=to).map(|(block, _)| *block).collect())
	}

	async fn save_block(
		&self,
		chain_index: usize,
		block_number: u64,
		contracts: &[ContractCreation],
	) -> Result<(), StorageError> {
		let lock = self.chain_lock(chain_index).await;
		let _guard = lock.lock().await;

		let document = self.state_document(chain_index);
		let mut state = document.load().await?;
		let entry = state.entry(block_number).or_default();
		for contract in contracts {
			let address = normalize_address(&contract.contract_address)
				.unwrap_or_else(|| contract.contract_address.clone());
			entry
				.entry(address)
				.or_insert_with(|| contract.tx_hash.clone());
		}
		document.save(&state).await?;

		let mut missed = self.read_missed_blocks(chain_index).await?;
		if missed.remove(&block_number) {
			self.write_missed_blocks(chain_index, &missed).await?;
			debug!(chain = chain_index, block = block_number, "Recovered missed block");
		}

		debug!(
			chain = chain_index,
			block = block_number,
			contracts = contracts.len(),
			"Saved processed block"
		);
		Ok(())
	}

	async fn get_block(
		&self,
		chain_index: usize,
		block_number: u64,
	) -> Result<Option<BlockContracts>, StorageError> {
		let mut state = self.state_document(chain_index).load().await?;
		Ok(state.remove(&block_number))
	}

	async fn get_cursor(&self, chain_index: usize) -> Result<Option<u64>, StorageError> {
		self.read_cursor(chain_index).await
	}

	async fn save_cursor(
		&self,
		chain_index: usize,
		block_number: u64,
	) -> Result<(), StorageError> {
		let lock = self.chain_lock(chain_index).await;
		let _guard = lock.lock().await;

		if let Some(current) = self.read_cursor(chain_index).await? {
			if current >= block_number {
				return Ok(());
			}
		}
		write_atomic(
			&self.cursor_path(chain_index),
			block_number.to_string().as_bytes(),
		)
		.await
	}

	async fn save_missed_block(
		&self,
		chain_index: usize,
		block_number: u64,
	) -> Result<(), StorageError> {
		let lock = self.chain_lock(chain_index).await;
		let _guard = lock.lock().await;

		let mut missed = self.read_missed_blocks(chain_index).await?;
		if !missed.insert(block_number) {
			return Ok(());
		}
		self.write_missed_blocks(chain_index, &missed).await
	}

	async fn get_missed_blocks(&self, chain_index: usize) -> Result<BTreeSet<u64>, StorageError> {
		self.read_missed_blocks(chain_index).await
	}
}
