use std::sync::Arc;

use mockito::{Matcher, Server};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::{mpsc, watch};

use crate::integration::mocks::{
	create_test_chain, tx_hash, CONTRACT_ADDRESS, WATCHED_ADDRESS,
};
use contract_sentinel::{
	models::MatchEvent,
	services::{
		notification::{LogNotifier, NotificationService, Notifier, WebhookNotifier},
		storage::{FileUserRegistry, UserRegistry},
	},
	utils::http::HttpRetryConfig,
};

fn match_event() -> MatchEvent {
	MatchEvent {
		chain_index: 0,
		block_number: 110,
		contract_address: CONTRACT_ADDRESS.to_string(),
		user_address: WATCHED_ADDRESS.to_string(),
		tx_hash: tx_hash(110),
		timestamp: Some(1_700_000_000),
	}
}

async fn registry(dir: &TempDir) -> Arc<FileUserRegistry> {
	let registry = Arc::new(FileUserRegistry::new(dir.path()));
	registry
		.watch_addresses("alice", 0, &[WATCHED_ADDRESS.to_lowercase()])
		.await
		.unwrap();
	registry
}

fn webhook(url: &str, secret: Option<&str>) -> Arc<dyn Notifier> {
	Arc::new(
		WebhookNotifier::new(
			url.to_string(),
			secret.map(str::to_string),
			&HttpRetryConfig::no_retries(),
		)
		.unwrap(),
	)
}

#[tokio::test]
async fn test_service_delivers_match_to_webhook() {
	let dir = TempDir::new().unwrap();
	let mut server = Server::new_async().await;
	let expected_link = format!(r"Transaction Link: https://etherscan\.io/tx/{}", tx_hash(110));
	let mock = server
		.mock("POST", "/hook")
		.match_header("content-type", "application/json")
		.match_body(Matcher::AllOf(vec![
			Matcher::PartialJson(json!({
				"subscribers": ["alice"],
				"match": {
					"chain_index": 0,
					"block_number": 110,
					"contract_address": CONTRACT_ADDRESS,
					"user_address": WATCHED_ADDRESS
				}
			})),
			Matcher::Regex(expected_link),
		]))
		.with_status(200)
		.expect(1)
		.create_async()
		.await;

	let service = NotificationService::new(
		registry(&dir).await,
		vec![create_test_chain(0, "ethereum", 25)],
		vec![
			Arc::new(LogNotifier) as Arc<dyn Notifier>,
			webhook(&format!("{}/hook", server.url()), None),
		],
	);

	assert_eq!(service.dispatch(&match_event()).await, 2);
	mock.assert_async().await;
}

#[tokio::test]
async fn test_signed_delivery() {
	let dir = TempDir::new().unwrap();
	let mut server = Server::new_async().await;
	let mock = server
		.mock("POST", "/")
		.match_header("x-signature", Matcher::Regex("^[0-9a-f]{64}$".to_string()))
		.match_header("x-timestamp", Matcher::Regex("^[0-9]{13}$".to_string()))
		.with_status(204)
		.create_async()
		.await;

	let service = NotificationService::new(
		registry(&dir).await,
		Vec::new(),
		vec![webhook(&server.url(), Some("shared-secret"))],
	);

	assert_eq!(service.dispatch(&match_event()).await, 1);
	mock.assert_async().await;
}

#[tokio::test]
async fn test_webhook_failure_does_not_block_log_notifier() {
	let dir = TempDir::new().unwrap();
	let mut server = Server::new_async().await;
	let mock = server
		.mock("POST", "/")
		.with_status(500)
		.create_async()
		.await;

	let service = NotificationService::new(
		registry(&dir).await,
		Vec::new(),
		vec![
			webhook(&server.url(), None),
			Arc::new(LogNotifier) as Arc<dyn Notifier>,
		],
	);

	assert_eq!(service.dispatch(&match_event()).await, 1);
	mock.assert_async().await;
}

#[tokio::test]
async fn test_run_delivers_until_channel_closes() {
	let dir = TempDir::new().unwrap();
	let mut server = Server::new_async().await;
	let mock = server
		.mock("POST", "/")
		.with_status(200)
		.expect(3)
		.create_async()
		.await;

	let service = NotificationService::new(
		registry(&dir).await,
		Vec::new(),
		vec![webhook(&server.url(), None)],
	);

	let (match_tx, match_rx) = mpsc::channel(8);
	let (_shutdown_tx, shutdown_rx) = watch::channel(false);
	for _ in 0..3 {
		match_tx.send(match_event()).await.unwrap();
	}
	drop(match_tx);

	service.run(match_rx, shutdown_rx).await;
	mock.assert_async().await;
}
