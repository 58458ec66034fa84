//! Events exchanged between the services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contract deployed by a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCreation {
	pub contract_address: String,
	pub tx_hash: String,
}

/// Published by a chain poller for every block that created at least one contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContractsEvent {
	pub chain_index: usize,
	pub block_number: u64,
	pub contracts: Vec<ContractCreation>,
}

/// A new contract whose bytecode embeds a watched address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
	pub chain_index: usize,
	pub block_number: u64,
	pub contract_address: String,
	pub user_address: String,
	pub tx_hash: String,
	/// Block timestamp in seconds, absent when the lookup failed
	pub timestamp: Option<u64>,
}

impl MatchEvent {
	/// Creation time of the contract, taken from its block
	pub fn created_at(&self) -> Option<DateTime<Utc>> {
		self.timestamp
			.and_then(|ts| i64::try_from(ts).ok())
			.and_then(|ts| DateTime::from_timestamp(ts, 0))
	}
}
