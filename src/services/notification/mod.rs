//! Match notification dispatch.
//!
//! Receives match events from the correlation engine, resolves which users
//! watch the matched address and relays a message through every configured
//! notifier.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

mod error;
mod logger;
mod message;
mod webhook;

pub use error::NotificationError;
pub use logger::LogNotifier;
pub use message::build_message;
pub use webhook::{WebhookNotifier, WebhookPayload};

use crate::{
	models::{Chain, MatchEvent},
	services::storage::UserRegistry,
};

/// A match ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchNotification {
	pub event: MatchEvent,
	/// Users watching the matched address on the chain
	pub subscribers: Vec<String>,
	pub message: String,
}

/// Interface for notification channels
#[async_trait]
pub trait Notifier: Send + Sync {
	fn name(&self) -> &str;

	async fn notify(&self, notification: &MatchNotification) -> Result<(), NotificationError>;
}

/// Relays match events to all notifiers
pub struct NotificationService<U: UserRegistry + 'static> {
	registry: Arc<U>,
	chains: HashMap<usize, Chain>,
	notifiers: Vec<Arc<dyn Notifier>>,
}

impl<U: UserRegistry + 'static> NotificationService<U> {
	pub fn new(
		registry: Arc<U>,
		chains: impl IntoIterator<Item = Chain>,
		notifiers: Vec<Arc<dyn Notifier>>,
	) -> Self {
		Self {
			registry,
			chains: chains
				.into_iter()
				.map(|chain| (chain.index, chain))
				.collect(),
			notifiers,
		}
	}

	/// Builds the notification for a match.
	///
	/// A failed subscriber lookup yields an empty subscriber list rather than
	/// dropping the match.
	pub async fn prepare(&self, event: &MatchEvent) -> MatchNotification {
		let subscribers = match self
			.registry
			.get_subscribers(event.chain_index, &event.user_address)
			.await
		{
			Ok(subscribers) => subscribers,
			Err(e) => {
				warn!(
					chain = event.chain_index,
					user_address = %event.user_address,
					"Failed to resolve subscribers: {}",
					e
				);
				Vec::new()
			}
		};

		MatchNotification {
			message: build_message(event, self.chains.get(&event.chain_index)),
			event: event.clone(),
			subscribers,
		}
	}

	/// Delivers a match through every notifier.
	///
	/// Returns the number of notifiers that succeeded. A failing notifier does
	/// not prevent delivery through the others.
	pub async fn dispatch(&self, event: &MatchEvent) -> usize {
		let notification = self.prepare(event).await;
		if notification.subscribers.is_empty() {
			debug!(
				user_address = %event.user_address,
				"No subscribers for matched address"
			);
		}

		let mut delivered = 0;
		for notifier in &self.notifiers {
			match notifier.notify(&notification).await {
				Ok(()) => delivered += 1,
				Err(e) => warn!(notifier = notifier.name(), "Failed to deliver notification: {}", e),
			}
		}
		delivered
	}

	/// Relays match events until shutdown, then drains what is queued
	pub async fn run(
		self,
		mut match_rx: mpsc::Receiver<MatchEvent>,
		mut shutdown_rx: watch::Receiver<bool>,
	) {
		let names: Vec<&str> = self.notifiers.iter().map(|n| n.name()).collect();
		info!(notifiers = ?names, "Notification service started");

		loop {
			tokio::select! {
				event = match_rx.recv() => match event {
					Some(event) => {
						self.dispatch(&event).await;
					}
					None => break,
				},
				changed = shutdown_rx.changed() => {
					if changed.is_err() || *shutdown_rx.borrow() {
						break;
					}
				}
			}
		}

		// Remaining matches come from the engine's own drain
		while let Some(event) = match_rx.recv().await {
			self.dispatch(&event).await;
		}

		info!("Notification service stopped");
	}
}
