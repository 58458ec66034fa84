//! Log of matched contracts.
//!
//! Stored in `<data_dir>/matches.json` as
//! `chainIndex -> blockNumber -> {contractAddress: [userAddress, ..]}`.

use std::{collections::BTreeMap, path::Path};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{error::StorageError, file::JsonDocument};
use crate::utils::{normalize_address, same_address};

/// Matches of one block, contract address to matched user addresses
pub type BlockMatches = BTreeMap<String, Vec<String>>;

type Matches = BTreeMap<usize, BTreeMap<u64, BlockMatches>>;

#[async_trait]
pub trait MatchStore: Send + Sync {
	/// Records that `contract_address` references `user_address`.
	///
	/// Returns false when the pair was already recorded.
	async fn record_match(
		&self,
		chain_index: usize,
		block_number: u64,
		contract_address: &str,
		user_address: &str,
	) -> Result<bool, StorageError>;

	async fn get_matches(
		&self,
		chain_index: usize,
		block_number: u64,
	) -> Result<BlockMatches, StorageError>;

	/// Every recorded match of a chain, by block
	async fn get_chain_matches(
		&self,
		chain_index: usize,
	) -> Result<BTreeMap<u64, BlockMatches>, StorageError>;
}

pub struct FileMatchStore {
	document: JsonDocument<Matches>,
	lock: Mutex<()>,
}

impl FileMatchStore {
	pub fn new(data_dir: &Path) -> Self {
		Self {
			document: JsonDocument::new(data_dir.join("matches.json")),
			lock: Mutex::new(()),
		}
	}
}

#[async_trait]
impl MatchStore for FileMatchStore {
	async fn record_match(
		&self,
		chain_index: usize,
		block_number: u64,
		contract_address: &str,
		user_address: &str,
	) -> Result<bool, StorageError> {
		let contract =
			normalize_address(contract_address).unwrap_or_else(|| contract_address.to_string());
		let user = normalize_address(user_address).unwrap_or_else(|| user_address.to_string());

		let _guard = self.lock.lock().await;
		let mut matches = self.document.load().await?;
		let users = matches
			.entry(chain_index)
			.or_default()
			.entry(block_number)
			.or_default()
			.entry(contract)
			.or_default();

		if users.iter().any(|existing| same_address(existing, &user)) {
			return Ok(false);
		}
		users.push(user);
		self.document.save(&matches).await?;
		Ok(true)
	}

	async fn get_matches(
		&self,
		chain_index: usize,
		block_number: u64,
	) -> Result<BlockMatches, StorageError> {
		let mut matches = self.document.load().await?;
		Ok(matches
			.get_mut(&chain_index)
			.and_then(|blocks| blocks.remove(&block_number))
			.unwrap_or_default())
	}

	async fn get_chain_matches(
		&self,
		chain_index: usize,
	) -> Result<BTreeMap<u64, BlockMatches>, StorageError> {
		let mut matches = self.document.load().await?;
		Ok(matches.remove(&chain_index).unwrap_or_default())
	}
}
