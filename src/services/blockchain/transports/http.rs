//! HTTP transport implementation for blockchain interactions.
//!
//! JSON-RPC over HTTP with:
//! - Multiple RPC endpoints ordered by weight, with automatic failover
//! - Exponential backoff retries for transient HTTP failures
//! - Connection probing with `net_version`

pub mod endpoint_manager;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;

use crate::{
	models::Chain,
	services::blockchain::{
		transports::{BlockchainTransport, RotatingTransport},
		BlockChainError,
	},
	utils::http::{create_retryable_http_client, HttpRetryConfig},
};

use endpoint_manager::EndpointManager;

/// Basic HTTP transport client for blockchain interactions
///
/// The client is cheap to clone and can be shared across tasks.
#[derive(Clone, Debug)]
pub struct HttpTransportClient {
	/// Plain client used for connection probes
	pub client: Client,
	endpoint_manager: EndpointManager,
}

fn probe_payload() -> Value {
	json!({
		"jsonrpc": "2.0",
		"id": 1,
		"method": "net_version",
		"params": []
	})
}

impl HttpTransportClient {
	/// Creates a transport connected to the highest-weighted reachable endpoint.
	///
	/// Endpoints with weight 0 are ignored. Fails when no endpoint answers the probe.
	pub async fn new(chain: &Chain) -> Result<Self, BlockChainError> {
		Self::new_with_retry_config(chain, &HttpRetryConfig::default()).await
	}

	pub async fn new_with_retry_config(
		chain: &Chain,
		retry_config: &HttpRetryConfig,
	) -> Result<Self, BlockChainError> {
		let mut rpc_urls: Vec<_> = chain
			.rpc_urls
			.iter()
			.filter(|rpc_url| rpc_url.type_ == "rpc" && rpc_url.weight > 0)
			.collect();

		rpc_urls.sort_by(|a, b| b.weight.cmp(&a.weight));

		let timeout = chain.rpc_timeout();
		let http_client = reqwest::ClientBuilder::new()
			.timeout(timeout)
			.connect_timeout(timeout)
			.build()
			.map_err(|e| {
				BlockChainError::internal_error(format!("Failed to create HTTP client: {}", e))
			})?;
		let retrying_client =
			create_retryable_http_client(retry_config, timeout).map_err(|e| {
				BlockChainError::internal_error(format!("Failed to create HTTP client: {}", e))
			})?;

		for rpc_url in rpc_urls.iter() {
			let url = match Url::parse(&rpc_url.url) {
				Ok(url) => url,
				Err(_) => continue,
			};

			match http_client.post(url).json(&probe_payload()).send().await {
				Ok(response) if response.status().is_success() => {
					let fallback_urls: Vec<String> = rpc_urls
						.iter()
						.filter(|url| url.url != rpc_url.url)
						.map(|url| url.url.clone())
						.collect();

					tracing::info!(
						chain = %chain.slug,
						url = %rpc_url.url,
						fallbacks = fallback_urls.len(),
						"Connected to RPC endpoint"
					);

					return Ok(Self {
						client: http_client,
						endpoint_manager: EndpointManager::new(
							retrying_client,
							rpc_url.url.as_ref(),
							fallback_urls,
						),
					});
				}
				Ok(response) => {
					tracing::warn!(
						"RPC endpoint {} answered the probe with HTTP {}",
						rpc_url.url,
						response.status()
					);
				}
				Err(e) => {
					tracing::warn!("RPC endpoint {} is unreachable: {}", rpc_url.url, e);
				}
			}
		}

		Err(BlockChainError::connection_error(format!(
			"All RPC URLs failed to connect for chain {}",
			chain.slug
		)))
	}
}

#[async_trait]
impl BlockchainTransport for HttpTransportClient {
	async fn get_current_url(&self) -> String {
		self.endpoint_manager.active_url.read().await.clone()
	}

	async fn send_raw_request<P>(
		&self,
		method: &str,
		params: Option<P>,
	) -> Result<Value, BlockChainError>
	where
		P: Into<Value> + Send + Clone + Serialize,
	{
		self.endpoint_manager
			.send_raw_request(self, method, params)
			.await
	}
}

#[async_trait]
impl RotatingTransport for HttpTransportClient {
	async fn try_connect(&self, url: &str) -> Result<(), BlockChainError> {
		let url = Url::parse(url)
			.map_err(|_| BlockChainError::connection_error(format!("Invalid URL: {}", url)))?;

		let response = self
			.client
			.post(url.clone())
			.json(&probe_payload())
			.send()
			.await
			.map_err(|e| BlockChainError::connection_error(format!("{}: {}", url, e)))?;

		if !response.status().is_success() {
			return Err(BlockChainError::connection_error(format!(
				"{} answered the probe with HTTP {}",
				url,
				response.status()
			)));
		}
		Ok(())
	}

	/// The underlying HTTP clients are not bound to a URL, nothing to rebuild.
	async fn update_client(&self, _url: &str) -> Result<(), BlockChainError> {
		Ok(())
	}
}
