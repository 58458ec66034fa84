//! Webhook notification implementation.
//!
//! Posts every match as JSON to a configured URL. When a secret is set the
//! request carries an HMAC-SHA256 signature of the body and timestamp.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use sha2::Sha256;

use crate::{
	models::MatchEvent,
	services::notification::{MatchNotification, NotificationError, Notifier},
	utils::http::{create_retryable_http_client, HttpRetryConfig},
};

/// HMAC SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Implementation of match notifications via webhooks
pub struct WebhookNotifier {
	url: String,
	secret: Option<String>,
	client: ClientWithMiddleware,
}

/// Body of a webhook request
#[derive(Serialize, Debug)]
pub struct WebhookPayload<'a> {
	pub title: &'static str,
	pub body: &'a str,
	pub subscribers: &'a [String],
	#[serde(rename = "match")]
	pub event: &'a MatchEvent,
}

impl WebhookNotifier {
	/// Creates a notifier posting to `url`; transient failures are retried per `retry_config`
	pub fn new(
		url: String,
		secret: Option<String>,
		retry_config: &HttpRetryConfig,
	) -> Result<Self, NotificationError> {
		let parsed = url::Url::parse(&url)
			.map_err(|e| NotificationError::config_error(format!("Invalid webhook URL: {}", e)))?;
		if !matches!(parsed.scheme(), "http" | "https") {
			return Err(NotificationError::config_error(format!(
				"Webhook URL must be http or https: {}",
				url
			)));
		}

		let client = create_retryable_http_client(retry_config, WEBHOOK_TIMEOUT).map_err(|e| {
			NotificationError::config_error(format!("Failed to create HTTP client: {}", e))
		})?;

		Ok(Self {
			url,
			secret: secret.filter(|s| !s.is_empty()),
			client,
		})
	}

	/// Signs `body` with the current timestamp in milliseconds.
	///
	/// Returns the hex signature and the timestamp it covers.
	pub fn sign_request(
		&self,
		secret: &str,
		body: &[u8],
	) -> Result<(String, String), NotificationError> {
		let timestamp = Utc::now().timestamp_millis().to_string();

		let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
			.map_err(|e| NotificationError::config_error(format!("Invalid secret: {}", e)))?;
		mac.update(body);
		mac.update(timestamp.as_bytes());

		Ok((hex::encode(mac.finalize().into_bytes()), timestamp))
	}

	fn signature_headers(&self, body: &[u8]) -> Result<HeaderMap, NotificationError> {
		let mut headers = HeaderMap::new();
		headers.insert(
			reqwest::header::CONTENT_TYPE,
			HeaderValue::from_static("application/json"),
		);

		let Some(secret) = &self.secret else {
			return Ok(headers);
		};

		let (signature, timestamp) = self.sign_request(secret, body)?;
		for (name, value) in [
			(HeaderName::from_static("x-signature"), signature),
			(HeaderName::from_static("x-timestamp"), timestamp),
		] {
			let value = HeaderValue::from_str(&value).map_err(|e| {
				NotificationError::internal_error(format!("Invalid {} value: {}", name, e))
			})?;
			headers.insert(name, value);
		}
		Ok(headers)
	}
}

#[async_trait]
impl Notifier for WebhookNotifier {
	fn name(&self) -> &str {
		"webhook"
	}

	async fn notify(&self, notification: &MatchNotification) -> Result<(), NotificationError> {
		let payload = WebhookPayload {
			title: "Watched address found in new contract",
			body: &notification.message,
			subscribers: &notification.subscribers,
			event: &notification.event,
		};
		let body = serde_json::to_vec(&payload).map_err(|e| {
			NotificationError::internal_error(format!("Failed to serialize payload: {}", e))
		})?;
		let headers = self.signature_headers(&body)?;

		let response = self
			.client
			.post(self.url.as_str())
			.headers(headers)
			.body(body)
			.send()
			.await
			.map_err(|e| {
				NotificationError::network_error(format!(
					"Failed to send webhook notification: {}",
					e
				))
			})?;

		if !response.status().is_success() {
			return Err(NotificationError::network_error(format!(
				"Webhook returned error status: {}",
				response.status()
			)));
		}

		Ok(())
	}
}
