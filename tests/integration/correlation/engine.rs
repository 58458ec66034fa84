use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::{mpsc, watch};

use crate::integration::mocks::{
	bytecode_embedding, tx_hash, MockEvmClientTrait, MockMatchStore, CONTRACT_ADDRESS,
	OTHER_CONTRACT_ADDRESS, WATCHED_ADDRESS,
};
use contract_sentinel::{
	models::{ContractCreation, MatchEvent, NewContractsEvent},
	services::{
		blockchain::BlockChainError,
		correlation::{CorrelationEngine, CorrelationError},
		storage::{FileUserRegistry, StorageError, UserRegistry},
	},
	utils::tests::builders::evm::block::BlockBuilder,
};

const UNRELATED_CODE: &str = "0x6080604052600080fd";
const BLOCK_TIME: u64 = 1_700_000_000;

type Engine = CorrelationEngine<MockEvmClientTrait, FileUserRegistry, MockMatchStore>;

async fn registry_watching(dir: &TempDir, addresses: &[&str]) -> Arc<FileUserRegistry> {
	let registry = Arc::new(FileUserRegistry::new(dir.path()));
	if !addresses.is_empty() {
		let addresses: Vec<String> = addresses.iter().map(|a| a.to_lowercase()).collect();
		registry
			.watch_addresses("alice", 0, &addresses)
			.await
			.unwrap();
	}
	registry
}

fn event(contracts: &[&str]) -> NewContractsEvent {
	NewContractsEvent {
		chain_index: 0,
		block_number: 110,
		contracts: contracts
			.iter()
			.enumerate()
			.map(|(i, address)| ContractCreation {
				contract_address: address.to_string(),
				tx_hash: tx_hash(i as u64),
			})
			.collect(),
	}
}

/// Client serving the watched address in `CONTRACT_ADDRESS` and unrelated code elsewhere
fn client_with_code() -> MockEvmClientTrait {
	let mut client = MockEvmClientTrait::new();
	client.expect_get_code().returning(|address| {
		if address == CONTRACT_ADDRESS {
			Ok(bytecode_embedding(&WATCHED_ADDRESS.to_lowercase()))
		} else {
			Ok(UNRELATED_CODE.to_string())
		}
	});
	client
		.expect_get_block()
		.returning(|number| {
			Ok(Some(
				BlockBuilder::new()
					.number(number)
					.timestamp(BLOCK_TIME)
					.build(),
			))
		});
	client
}

fn store_returning(result: fn() -> Result<bool, StorageError>, times: usize) -> MockMatchStore {
	let mut store = MockMatchStore::new();
	store
		.expect_record_match()
		.withf(|chain, block, contract, user| {
			*chain == 0
				&& *block == 110
				&& contract.eq_ignore_ascii_case(CONTRACT_ADDRESS)
				&& user.eq_ignore_ascii_case(WATCHED_ADDRESS)
		})
		.returning(move |_, _, _, _| result())
		.times(times);
	store
}

fn engine(
	client: MockEvmClientTrait,
	registry: Arc<FileUserRegistry>,
	store: MockMatchStore,
) -> (Engine, mpsc::Receiver<MatchEvent>) {
	let (match_tx, match_rx) = mpsc::channel(16);
	let mut engine = CorrelationEngine::new(registry, Arc::new(store), match_tx);
	engine.register_chain(0, Arc::new(client));
	(engine, match_rx)
}

#[tokio::test]
async fn test_match_is_recorded_and_published() {
	let dir = TempDir::new().unwrap();
	let (engine, mut match_rx) = engine(
		client_with_code(),
		registry_watching(&dir, &[WATCHED_ADDRESS]).await,
		store_returning(|| Ok(true), 1),
	);

	let published = engine
		.handle_new_contracts(&event(&[CONTRACT_ADDRESS, OTHER_CONTRACT_ADDRESS]))
		.await
		.unwrap();

	let expected = MatchEvent {
		chain_index: 0,
		block_number: 110,
		contract_address: CONTRACT_ADDRESS.to_string(),
		user_address: WATCHED_ADDRESS.to_string(),
		tx_hash: tx_hash(0),
		timestamp: Some(BLOCK_TIME),
	};
	assert_eq!(published, vec![expected.clone()]);
	assert_eq!(match_rx.recv().await.unwrap(), expected);
	assert!(match_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_duplicate_match_is_not_republished() {
	let dir = TempDir::new().unwrap();
	let (engine, mut match_rx) = engine(
		client_with_code(),
		registry_watching(&dir, &[WATCHED_ADDRESS]).await,
		store_returning(|| Ok(false), 1),
	);

	let published = engine
		.handle_new_contracts(&event(&[CONTRACT_ADDRESS]))
		.await
		.unwrap();

	assert!(published.is_empty());
	assert!(match_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_record_still_publishes() {
	let dir = TempDir::new().unwrap();
	let (engine, mut match_rx) = engine(
		client_with_code(),
		registry_watching(&dir, &[WATCHED_ADDRESS]).await,
		store_returning(|| Err(StorageError::InvalidInput("disk full".into())), 1),
	);

	let published = engine
		.handle_new_contracts(&event(&[CONTRACT_ADDRESS]))
		.await
		.unwrap();

	assert_eq!(published.len(), 1);
	assert!(match_rx.recv().await.is_some());
}

#[tokio::test]
async fn test_bytecode_failure_skips_only_that_contract() {
	let dir = TempDir::new().unwrap();
	let mut client = MockEvmClientTrait::new();
	client.expect_get_code().returning(|address| {
		if address == OTHER_CONTRACT_ADDRESS {
			Err(BlockChainError::request_error("eth_getCode failed"))
		} else {
			Ok(bytecode_embedding(WATCHED_ADDRESS))
		}
	});
	client
		.expect_get_block()
		.returning(|number| Ok(Some(BlockBuilder::new().number(number).build())));

	let (engine, _match_rx) = engine(
		client,
		registry_watching(&dir, &[WATCHED_ADDRESS]).await,
		store_returning(|| Ok(true), 1),
	);

	let published = engine
		.handle_new_contracts(&event(&[OTHER_CONTRACT_ADDRESS, CONTRACT_ADDRESS]))
		.await
		.unwrap();

	assert_eq!(published.len(), 1);
	assert_eq!(published[0].contract_address, CONTRACT_ADDRESS);
	assert_eq!(published[0].tx_hash, tx_hash(1));
}

#[tokio::test]
async fn test_block_timestamp_fetched_once_per_event() {
	let dir = TempDir::new().unwrap();
	let mut client = MockEvmClientTrait::new();
	client
		.expect_get_code()
		.returning(|_| Ok(bytecode_embedding(WATCHED_ADDRESS)));
	client
		.expect_get_block()
		.returning(|_| Ok(Some(BlockBuilder::new().timestamp(BLOCK_TIME).build())))
		.times(1);

	let mut store = MockMatchStore::new();
	store
		.expect_record_match()
		.returning(|_, _, _, _| Ok(true))
		.times(2);

	let (engine, _match_rx) = engine(
		client,
		registry_watching(&dir, &[WATCHED_ADDRESS]).await,
		store,
	);

	let published = engine
		.handle_new_contracts(&event(&[CONTRACT_ADDRESS, OTHER_CONTRACT_ADDRESS]))
		.await
		.unwrap();

	assert_eq!(published.len(), 2);
	assert!(published.iter().all(|m| m.timestamp == Some(BLOCK_TIME)));
}

#[tokio::test]
async fn test_missing_block_timestamp_is_unknown() {
	let dir = TempDir::new().unwrap();
	let mut client = MockEvmClientTrait::new();
	client
		.expect_get_code()
		.returning(|_| Ok(bytecode_embedding(WATCHED_ADDRESS)));
	client
		.expect_get_block()
		.returning(|_| Err(BlockChainError::connection_error("node down")));

	let (engine, _match_rx) = engine(
		client,
		registry_watching(&dir, &[WATCHED_ADDRESS]).await,
		store_returning(|| Ok(true), 1),
	);

	let published = engine
		.handle_new_contracts(&event(&[CONTRACT_ADDRESS]))
		.await
		.unwrap();

	assert_eq!(published[0].timestamp, None);
	assert!(published[0].created_at().is_none());
}

#[tokio::test]
async fn test_no_watched_addresses_skips_bytecode() {
	let dir = TempDir::new().unwrap();
	let mut client = MockEvmClientTrait::new();
	client.expect_get_code().times(0);

	let mut store = MockMatchStore::new();
	store.expect_record_match().times(0);

	let (engine, _match_rx) = engine(client, registry_watching(&dir, &[]).await, store);

	let published = engine
		.handle_new_contracts(&event(&[CONTRACT_ADDRESS]))
		.await
		.unwrap();
	assert!(published.is_empty());
}

#[tokio::test]
async fn test_watched_on_other_chain_does_not_match() {
	let dir = TempDir::new().unwrap();
	let registry = Arc::new(FileUserRegistry::new(dir.path()));
	registry
		.watch_addresses("alice", 1, &[WATCHED_ADDRESS.to_string()])
		.await
		.unwrap();

	let mut client = MockEvmClientTrait::new();
	client.expect_get_code().times(0);
	let mut store = MockMatchStore::new();
	store.expect_record_match().times(0);

	let (engine, _match_rx) = engine(client, registry, store);
	assert!(engine
		.handle_new_contracts(&event(&[CONTRACT_ADDRESS]))
		.await
		.unwrap()
		.is_empty());
}

#[tokio::test]
async fn test_unknown_chain_is_error() {
	let dir = TempDir::new().unwrap();
	let (engine, _match_rx) = engine(
		MockEvmClientTrait::new(),
		registry_watching(&dir, &[WATCHED_ADDRESS]).await,
		MockMatchStore::new(),
	);

	let mut unknown = event(&[CONTRACT_ADDRESS]);
	unknown.chain_index = 7;
	let result = engine.handle_new_contracts(&unknown).await;
	assert!(matches!(result, Err(CorrelationError::UnknownChain(7))));
}

#[tokio::test]
async fn test_run_drains_queued_events_on_shutdown() {
	let dir = TempDir::new().unwrap();
	let (engine, mut match_rx) = engine(
		client_with_code(),
		registry_watching(&dir, &[WATCHED_ADDRESS]).await,
		store_returning(|| Ok(true), 1),
	);

	let (event_tx, event_rx) = mpsc::channel(4);
	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	event_tx.send(event(&[CONTRACT_ADDRESS])).await.unwrap();
	shutdown_tx.send(true).unwrap();

	engine.run(event_rx, shutdown_rx).await;

	assert_eq!(match_rx.recv().await.unwrap().contract_address, CONTRACT_ADDRESS);
	// The engine closed its receiver on the way out
	assert!(event_tx.send(event(&[CONTRACT_ADDRESS])).await.is_err());
}
