use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::constants::DEFAULT_RPC_TIMEOUT_MS;

/// RPC endpoint of a chain
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RpcUrl {
	pub type_: String,
	pub url: String,
	pub weight: u32,
}

/// A watched chain.
///
/// `index` identifies the chain in every store and event; it must be unique
/// across the loaded configuration and must never change once data exists.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Chain {
	pub index: usize,
	pub slug: String,
	pub name: String,
	pub rpc_urls: Vec<RpcUrl>,
	/// Confirmation depth, also the maximum window span per cycle
	pub confirmation_blocks: u64,
	pub cron_schedule: String,
	#[serde(default)]
	pub rpc_timeout_ms: Option<u64>,
	/// Block explorer base URL, e.g. `https://etherscan.io`
	#[serde(default)]
	pub explorer_url: Option<String>,
}

impl Chain {
	/// Upper bound for a single remote call on this chain
	pub fn rpc_timeout(&self) -> Duration {
		Duration::from_millis(self.rpc_timeout_ms.unwrap_or(DEFAULT_RPC_TIMEOUT_MS))
	}

	/// Explorer link for a transaction, when an explorer is configured
	pub fn explorer_tx_url(&self, tx_hash: &str) -> Option<String> {
		self.explorer_url
			.as_ref()
			.map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
	}
}
