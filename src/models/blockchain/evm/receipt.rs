//! EVM transaction receipt.

use alloy::primitives::U64;
use serde::{Deserialize, Serialize};

/// Receipt as returned by `eth_getTransactionReceipt`
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvmReceipt {
	pub transaction_hash: String,
	/// Set only when the transaction deployed a contract
	#[serde(default)]
	pub contract_address: Option<String>,
	#[serde(default)]
	pub block_number: Option<U64>,
	/// `1` for success, `0` for a reverted transaction
	#[serde(default)]
	pub status: Option<U64>,
}

impl EvmReceipt {
	/// Address of the contract created by this transaction, if any
	pub fn created_contract(&self) -> Option<&str> {
		self.contract_address.as_deref().filter(|a| !a.is_empty())
	}
}
