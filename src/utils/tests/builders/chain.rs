use crate::models::{Chain, RpcUrl};

/// A builder for creating test chains with default values.
#[derive(Debug)]
pub struct ChainBuilder {
	index: usize,
	slug: String,
	name: String,
	rpc_urls: Vec<RpcUrl>,
	confirmation_blocks: u64,
	cron_schedule: String,
	rpc_timeout_ms: Option<u64>,
	explorer_url: Option<String>,
}

impl Default for ChainBuilder {
	/// Default chain builder for an Ethereum mainnet chain at index 0
	fn default() -> Self {
		Self {
			index: 0,
			slug: "ethereum".to_string(),
			name: "Ethereum Mainnet".to_string(),
			rpc_urls: vec![RpcUrl {
				type_: "rpc".to_string(),
				url: "https://eth.drpc.org".to_string(),
				weight: 100,
			}],
			confirmation_blocks: 25,
			cron_schedule: "0 */1 * * * *".to_string(),
			rpc_timeout_ms: None,
			explorer_url: None,
		}
	}
}

impl ChainBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn index(mut self, index: usize) -> Self {
		self.index = index;
		self
	}

	pub fn slug(mut self, slug: &str) -> Self {
		self.slug = slug.to_string();
		self
	}

	pub fn name(mut self, name: &str) -> Self {
		self.name = name.to_string();
		self
	}

	/// Replaces the RPC endpoints with a single `rpc` endpoint
	pub fn rpc_url(mut self, url: &str, weight: u32) -> Self {
		self.rpc_urls = vec![RpcUrl {
			type_: "rpc".to_string(),
			url: url.to_string(),
			weight,
		}];
		self
	}

	pub fn rpc_url_with_type(mut self, type_: &str, url: &str, weight: u32) -> Self {
		self.rpc_urls = vec![RpcUrl {
			type_: type_.to_string(),
			url: url.to_string(),
			weight,
		}];
		self
	}

	/// Adds an extra `rpc` endpoint
	pub fn add_rpc_url(mut self, url: &str, weight: u32) -> Self {
		self.rpc_urls.push(RpcUrl {
			type_: "rpc".to_string(),
			url: url.to_string(),
			weight,
		});
		self
	}

	pub fn clear_rpc_urls(mut self) -> Self {
		self.rpc_urls.clear();
		self
	}

	pub fn confirmation_blocks(mut self, blocks: u64) -> Self {
		self.confirmation_blocks = blocks;
		self
	}

	pub fn cron_schedule(mut self, schedule: &str) -> Self {
		self.cron_schedule = schedule.to_string();
		self
	}

	pub fn rpc_timeout_ms(mut self, ms: u64) -> Self {
		self.rpc_timeout_ms = Some(ms);
		self
	}

	pub fn explorer_url(mut self, url: &str) -> Self {
		self.explorer_url = Some(url.to_string());
		self
	}

	pub fn build(self) -> Chain {
		Chain {
			index: self.index,
			slug: self.slug,
			name: self.name,
			rpc_urls: self.rpc_urls,
			confirmation_blocks: self.confirmation_blocks,
			cron_schedule: self.cron_schedule,
			rpc_timeout_ms: self.rpc_timeout_ms,
			explorer_url: self.explorer_url,
		}
	}
}
