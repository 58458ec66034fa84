//! Manages the rotation of blockchain HTTP RPC endpoints
//!
//! Requests go to the active endpoint. Network failures and rate limiting
//! move the manager to the next fallback URL that accepts a connection.
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::services::blockchain::{
	transports::{RotatingTransport, ROTATE_ON_ERROR_CODES},
	BlockChainError,
};

/// Manages the rotation of blockchain RPC endpoints
#[derive(Clone, Debug)]
pub struct EndpointManager {
	pub active_url: Arc<RwLock<String>>,
	pub fallback_urls: Arc<RwLock<Vec<String>>>,
	client: ClientWithMiddleware,
	rotation_lock: Arc<tokio::sync::Mutex<()>>,
}

impl EndpointManager {
	pub fn new(client: ClientWithMiddleware, active_url: &str, fallback_urls: Vec<String>) -> Self {
		Self {
			active_url: Arc::new(RwLock::new(active_url.to_string())),
			fallback_urls: Arc::new(RwLock::new(fallback_urls)),
			rotation_lock: Arc::new(tokio::sync::Mutex::new(())),
			client,
		}
	}

	/// Rotates to the next fallback URL that accepts a connection probe
	pub async fn rotate_url<T: RotatingTransport>(
		&self,
		transport: &T,
	) -> Result<(), BlockChainError> {
		let _guard = self.rotation_lock.lock().await;

		let current_active = self.active_url.read().await.clone();

		let new_url = {
			let mut fallback_urls = self.fallback_urls.write().await;
			match fallback_urls.iter().position(|url| url != &current_active) {
				Some(pos) => fallback_urls.remove(pos),
				None => {
					return Err(BlockChainError::connection_error(
						"No fallback URLs available",
					))
				}
			}
		};

		if transport.try_connect(&new_url).await.is_ok() {
			transport.update_client(&new_url).await?;

			let mut active_url = self.active_url.write().await;
			let mut fallback_urls = self.fallback_urls.write().await;
			tracing::debug!(
				"Successful rotation - from: {}, to: {}",
				current_active,
				new_url
			);
			fallback_urls.push(current_active);
			*active_url = new_url;
			Ok(())
		} else {
			// Keep the failed URL for a later attempt
			let mut fallback_urls = self.fallback_urls.write().await;
			fallback_urls.push(new_url.clone());
			Err(BlockChainError::connection_error(format!(
				"Failed to connect to fallback URL {}",
				new_url
			)))
		}
	}

	/// Rotates when fallbacks exist and the failure warrants it.
	///
	/// Returns `Ok(true)` when the caller should retry on the new endpoint.
	async fn should_attempt_rotation<T: RotatingTransport>(
		&self,
		transport: &T,
		status: Option<u16>,
	) -> Result<bool, BlockChainError> {
		let should_rotate = {
			let fallback_urls = self.fallback_urls.read().await;
			!fallback_urls.is_empty()
				&& status.is_none_or(|s| ROTATE_ON_ERROR_CODES.contains(&s))
		};

		if should_rotate {
			self.rotate_url(transport).await.map(|_| true)
		} else {
			Ok(false)
		}
	}

	/// Sends a JSON-RPC request to the active endpoint, rotating on failure.
	///
	/// A response carrying a JSON-RPC `error` object is returned as a `RequestError`.
	pub async fn send_raw_request<
		T: RotatingTransport,
		P: Into<Value> + Send + Clone + Serialize,
	>(
		&self,
		transport: &T,
		method: &str,
		params: Option<P>,
	) -> Result<Value, BlockChainError> {
		// Each endpoint gets at most one attempt per request
		let max_attempts = 1 + self.fallback_urls.read().await.len();
		let mut attempts = 0;

		loop {
			attempts += 1;
			let current_url = self.active_url.read().await.clone();
			let request_body = transport.customize_request(method, params.clone()).await;

			let response = match self
				.client
				.post(current_url.as_str())
				.header("Content-Type", "application/json")
				.json(&request_body)
				.send()
				.await
			{
				Ok(resp) => resp,
				Err(network_error) => {
					tracing::warn!(
						"Network error while sending {} to {}: {}",
						method,
						current_url,
						network_error
					);
					if attempts < max_attempts
						&& self.should_attempt_rotation(transport, None).await?
					{
						continue;
					}
					return Err(BlockChainError::connection_error(format!(
						"{} failed: {}",
						method, network_error
					)));
				}
			};

			let status = response.status();
			if !status.is_success() {
				let error_body = response.text().await.unwrap_or_default();
				tracing::warn!("Request failed with status {}: {}", status, error_body);

				if attempts < max_attempts
					&& self
						.should_attempt_rotation(transport, Some(status.as_u16()))
						.await?
				{
					continue;
				}
				return Err(BlockChainError::request_error(format!(
					"{} returned HTTP {}: {}",
					method, status, error_body
				)));
			}

			let body: Value = response.json().await.map_err(|e| {
				BlockChainError::request_error(format!("Failed to parse JSON response: {}", e))
			})?;

			if let Some(error) = body.get("error") {
				return Err(BlockChainError::request_error(format!(
					"{} returned error: {}",
					method, error
				)));
			}

			return Ok(body);
		}
	}
}
