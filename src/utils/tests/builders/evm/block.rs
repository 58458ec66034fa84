use alloy::primitives::{Bytes, U64};

use crate::models::{EvmBlock, EvmBlockTransaction, EvmTransaction};

/// A builder for creating test EVM blocks.
#[derive(Debug, Default)]
pub struct BlockBuilder {
	number: Option<u64>,
	timestamp: u64,
	transactions: Option<Vec<EvmBlockTransaction>>,
}

impl BlockBuilder {
	/// Creates a block with an empty transaction list
	pub fn new() -> Self {
		Self {
			transactions: Some(vec![]),
			..Self::default()
		}
	}

	pub fn number(mut self, number: u64) -> Self {
		self.number = Some(number);
		self
	}

	pub fn timestamp(mut self, timestamp: u64) -> Self {
		self.timestamp = timestamp;
		self
	}

	/// Adds a transaction with the given input payload, e.g. `"0x6080"` for init code
	pub fn add_transaction(mut self, hash: &str, input: &str) -> Self {
		let input: Bytes = input.parse().unwrap_or_default();
		self.transactions
			.get_or_insert_with(Vec::new)
			.push(EvmBlockTransaction::Full(EvmTransaction {
				hash: hash.to_string(),
				input,
				to: None,
			}));
		self
	}

	/// Adds a transaction known only by its hash
	pub fn add_transaction_hash(mut self, hash: &str) -> Self {
		self.transactions
			.get_or_insert_with(Vec::new)
			.push(EvmBlockTransaction::Hash(hash.to_string()));
		self
	}

	/// Drops the transaction list, as a node does when it omits it
	pub fn without_transactions(mut self) -> Self {
		self.transactions = None;
		self
	}

	pub fn build(self) -> EvmBlock {
		EvmBlock {
			number: self.number.map(U64::from),
			hash: self.number.map(|n| format!("0x{:064x}", n)),
			timestamp: U64::from(self.timestamp),
			transactions: self.transactions,
		}
	}
}
