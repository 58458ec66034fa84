//! Correlation engine.
//!
//! Single consumer of the new-contract channel. For every new contract it
//! fetches the deployed bytecode, looks for the chain's watched addresses and
//! records and publishes each match.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::{
	models::{ContractCreation, MatchEvent, NewContractsEvent},
	services::{
		blockchain::EvmClientTrait,
		correlation::{
			error::CorrelationError,
			matcher::{find_references, prepare_candidates, WatchCandidate},
		},
		storage::{MatchStore, UserRegistry},
	},
	utils::is_valid_address,
};

pub struct CorrelationEngine<C, U, M>
where
	C: EvmClientTrait + ?Sized + 'static,
	U: UserRegistry + 'static,
	M: MatchStore + 'static,
{
	clients: HashMap<usize, Arc<C>>,
	registry: Arc<U>,
	match_store: Arc<M>,
	match_tx: mpsc::Sender<MatchEvent>,
}

impl<C, U, M> CorrelationEngine<C, U, M>
where
	C: EvmClientTrait + ?Sized + 'static,
	U: UserRegistry + 'static,
	M: MatchStore + 'static,
{
	pub fn new(registry: Arc<U>, match_store: Arc<M>, match_tx: mpsc::Sender<MatchEvent>) -> Self {
		Self {
			clients: HashMap::new(),
			registry,
			match_store,
			match_tx,
		}
	}

	/// Registers the client used for bytecode and timestamp lookups on a chain
	pub fn register_chain(&mut self, chain_index: usize, client: Arc<C>) {
		self.clients.insert(chain_index, client);
	}

	pub fn registered_chains(&self) -> Vec<usize> {
		let mut chains: Vec<usize> = self.clients.keys().copied().collect();
		chains.sort_unstable();
		chains
	}

	pub fn match_store(&self) -> &Arc<M> {
		&self.match_store
	}

	/// Correlates the contracts of one block with the chain's watched addresses.
	///
	/// Returns the matches that were published. A contract whose bytecode cannot
	/// be fetched is skipped; the rest of the event is still processed.
	#[instrument(skip_all, fields(chain = event.chain_index, block = event.block_number))]
	pub async fn handle_new_contracts(
		&self,
		event: &NewContractsEvent,
	) -> Result<Vec<MatchEvent>, CorrelationError> {
		let client = self
			.clients
			.get(&event.chain_index)
			.ok_or_else(|| CorrelationError::unknown_chain(event.chain_index))?;

		let watched = self
			.registry
			.get_watched_addresses(event.chain_index)
			.await?;
		let candidates = prepare_candidates(&watched);
		if candidates.is_empty() {
			debug!("No watched addresses, skipping {} contracts", event.contracts.len());
			return Ok(Vec::new());
		}

		let mut published = Vec::new();
		// Fetched at most once per event, and only once something matched
		let mut block_time: Option<Option<u64>> = None;

		for contract in &event.contracts {
			let matched = self
				.match_contract(client.as_ref(), contract, &candidates)
				.await;
			if matched.is_empty() {
				continue;
			}

			let timestamp = match block_time {
				Some(ts) => ts,
				None => {
					let ts = self.block_timestamp(client.as_ref(), event.block_number).await;
					block_time = Some(ts);
					ts
				}
			};

			for candidate in matched {
				let match_event = MatchEvent {
					chain_index: event.chain_index,
					block_number: event.block_number,
					contract_address: contract.contract_address.clone(),
					user_address: candidate.address.clone(),
					tx_hash: contract.tx_hash.clone(),
					timestamp,
				};
				if self.record_and_publish(match_event.clone()).await {
					published.push(match_event);
				}
			}
		}

		Ok(published)
	}

	/// Watched candidates referenced by the contract's bytecode
	async fn match_contract<'a>(
		&self,
		client: &C,
		contract: &ContractCreation,
		candidates: &'a [WatchCandidate],
	) -> Vec<&'a WatchCandidate> {
		if !is_valid_address(&contract.contract_address) {
			debug!(contract = %contract.contract_address, "Malformed contract address, skipping");
			return Vec::new();
		}

		let bytecode = match client.get_code(contract.contract_address.clone()).await {
			Ok(code) => code,
			Err(e) => {
				warn!(
					contract = %contract.contract_address,
					error = %e,
					"Failed to fetch bytecode, skipping contract"
				);
				return Vec::new();
			}
		};

		find_references(&bytecode, candidates)
	}

	async fn block_timestamp(&self, client: &C, block_number: u64) -> Option<u64> {
		match client.get_block(block_number).await {
			Ok(Some(block)) => Some(block.timestamp()),
			Ok(None) => {
				warn!(block = block_number, "Block not available for timestamp lookup");
				None
			}
			Err(e) => {
				warn!(block = block_number, error = %e, "Failed to fetch block timestamp");
				None
			}
		}
	}

	/// Records the match and publishes it if it was not already known.
	///
	/// A failed write still publishes, the detection itself is not lost.
	async fn record_and_publish(&self, event: MatchEvent) -> bool {
		let is_new = match self
			.match_store
			.record_match(
				event.chain_index,
				event.block_number,
				&event.contract_address,
				&event.user_address,
			)
			.await
		{
			Ok(is_new) => is_new,
			Err(e) => {
				error!("Failed to record match: {}", e);
				true
			}
		};

		if !is_new {
			debug!(
				contract = %event.contract_address,
				user_address = %event.user_address,
				"Match already recorded"
			);
			return false;
		}

		info!(
			contract = %event.contract_address,
			user_address = %event.user_address,
			tx = %event.tx_hash,
			"Watched address found in new contract"
		);

		if self.match_tx.send(event).await.is_err() {
			warn!("Match channel closed, dropping match");
			return false;
		}
		true
	}

	/// Consumes new-contract events until shutdown, then drains what is queued
	pub async fn run(
		self,
		mut event_rx: mpsc::Receiver<NewContractsEvent>,
		mut shutdown_rx: watch::Receiver<bool>,
	) {
		info!(chains = ?self.registered_chains(), "Correlation engine started");

		loop {
			tokio::select! {
				event = event_rx.recv() => match event {
					Some(event) => self.handle_logged(&event).await,
					None => break,
				},
				changed = shutdown_rx.changed() => {
					if changed.is_err() || *shutdown_rx.borrow() {
						break;
					}
				}
			}
		}

		event_rx.close();
		while let Some(event) = event_rx.recv().await {
			self.handle_logged(&event).await;
		}

		info!("Correlation engine stopped");
	}

	async fn handle_logged(&self, event: &NewContractsEvent) {
		if let Err(e) = self.handle_new_contracts(event).await {
			warn!(
				chain = event.chain_index,
				block = event.block_number,
				"Failed to correlate new contracts: {}",
				e
			);
		}
	}
}
