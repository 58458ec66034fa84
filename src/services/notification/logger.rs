//! Structured-log notifier.

use async_trait::async_trait;
use tracing::info;

use crate::services::notification::{MatchNotification, NotificationError, Notifier};

/// Emits every match as an `info` event with the full message
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
	fn name(&self) -> &str {
		"log"
	}

	async fn notify(&self, notification: &MatchNotification) -> Result<(), NotificationError> {
		let event = &notification.event;
		info!(
			chain = event.chain_index,
			block = event.block_number,
			contract = %event.contract_address,
			user_address = %event.user_address,
			subscribers = ?notification.subscribers,
			"{}",
			notification.message
		);
		Ok(())
	}
}
