//! EVM block data structures.

use alloy::primitives::{Bytes, U64};
use serde::{Deserialize, Serialize};

/// Block as returned by `eth_getBlockByNumber`.
///
/// Only the fields needed to find contract deployments are decoded.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvmBlock {
	/// Block number, absent for pending blocks
	#[serde(default)]
	pub number: Option<U64>,
	/// Block hash
	#[serde(default)]
	pub hash: Option<String>,
	/// Unix timestamp in seconds
	#[serde(default)]
	pub timestamp: U64,
	/// Transactions in block order. Absent when the node omitted them.
	#[serde(default)]
	pub transactions: Option<Vec<EvmBlockTransaction>>,
}

impl EvmBlock {
	/// Get the block number
	pub fn number(&self) -> Option<u64> {
		self.number.map(|n| n.to::<u64>())
	}

	/// Block timestamp in seconds
	pub fn timestamp(&self) -> u64 {
		self.timestamp.to::<u64>()
	}
}

/// A transaction inside a block.
///
/// Nodes return full objects when asked for them, but some providers still
/// answer with bare hashes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum EvmBlockTransaction {
	Full(EvmTransaction),
	Hash(String),
}

impl EvmBlockTransaction {
	pub fn hash(&self) -> &str {
		match self {
			Self::Full(tx) => &tx.hash,
			Self::Hash(hash) => hash,
		}
	}

	/// Whether the transaction could have created a contract.
	///
	/// A deployment always carries init code, so full transactions with an
	/// empty input are skipped. Bare hashes have to be checked through their receipt.
	pub fn is_deployment_candidate(&self) -> bool {
		match self {
			Self::Full(tx) => !tx.input.is_empty(),
			Self::Hash(_) => true,
		}
	}
}

/// Transaction object, reduced to the fields used here
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvmTransaction {
	pub hash: String,
	#[serde(default)]
	pub input: Bytes,
	#[serde(default)]
	pub to: Option<String>,
}
