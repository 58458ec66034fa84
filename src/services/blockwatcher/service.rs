//! Block watcher service implementation.
//!
//! One scheduled poller per chain. Each cycle determines the block window from
//! the persisted cursor, records contract deployments of every pending block,
//! publishes them as [`NewContractsEvent`]s and advances the cursor. Blocks that
//! could not be fetched stay in the missed-block log and are fetched again by
//! later cycles, even once the cursor has moved past them.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, instrument, warn};

use crate::{
	models::{Chain, ContractCreation, NewContractsEvent},
	services::{
		blockchain::EvmClientTrait,
		blockwatcher::{error::BlockWatcherError, tracker::BlockWindow},
		storage::ChainStateStore,
	},
	utils::normalize_address,
};

/// Outcome of one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
	/// Window covered by the cycle, `None` when the cursor had caught up
	pub window: Option<BlockWindow>,
	/// Blocks fetched and marked processed
	pub processed_blocks: Vec<u64>,
	/// Blocks that could not be fetched and were logged as missed
	pub missed_blocks: Vec<u64>,
	/// Previously missed blocks fetched again this cycle, successfully or not
	pub retried_blocks: Vec<u64>,
	/// Number of new-contract events published
	pub events_published: usize,
	/// Cursor after the cycle
	pub cursor: Option<u64>,
	/// Whether shutdown stopped the cycle before the end of the window
	pub interrupted: bool,
}

/// Trait for job scheduler
///
/// Abstracts the cron scheduler so watchers can be tested without timers.
#[async_trait]
pub trait JobSchedulerTrait: Send + Sync + Sized {
	async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>>;
	async fn add(&self, job: Job) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
	async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
	async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[async_trait]
impl JobSchedulerTrait for JobScheduler {
	async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
		Self::new().await.map_err(Into::into)
	}

	async fn add(&self, job: Job) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.add(job).await.map(|_| ()).map_err(Into::into)
	}

	async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.start().await.map_err(Into::into)
	}

	async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.shutdown().await.map_err(Into::into)
	}
}

/// Fetches a block and extracts the contracts it deployed.
///
/// Returns `None` when the block or its transaction list is unavailable.
/// Receipts that cannot be fetched only drop their own transaction.
async fn fetch_block_contracts<C: EvmClientTrait + ?Sized>(
	chain: &Chain,
	client: &C,
	block_number: u64,
) -> Option<Vec<ContractCreation>> {
	let block = match client.get_block(block_number).await {
		Ok(Some(block)) => block,
		Ok(None) => {
			warn!(chain = %chain.slug, block = block_number, "Block not available");
			return None;
		}
		Err(e) => {
			warn!(chain = %chain.slug, block = block_number, error = %e, "Failed to fetch block");
			return None;
		}
	};

	let Some(transactions) = block.transactions else {
		warn!(chain = %chain.slug, block = block_number, "Block has no transaction list");
		return None;
	};

	let mut contracts = Vec::new();
	for tx in transactions
		.iter()
		.filter(|tx| tx.is_deployment_candidate())
	{
		let tx_hash = tx.hash().to_string();
		match client.get_transaction_receipt(tx_hash.clone()).await {
			Ok(Some(receipt)) => {
				if let Some(created) = receipt.created_contract() {
					let address = normalize_address(created).unwrap_or_else(|| created.to_string());
					debug!(
						chain = %chain.slug,
						block = block_number,
						contract = %address,
						tx = %tx_hash,
						"Found contract creation"
					);
					contracts.push(ContractCreation {
						contract_address: address,
						tx_hash,
					});
				}
			}
			Ok(None) => {
				debug!(chain = %chain.slug, tx = %tx_hash, "Receipt not available, skipping");
			}
			Err(e) => {
				warn!(chain = %chain.slug, tx = %tx_hash, error = %e, "Failed to fetch receipt, skipping");
			}
		}
	}

	Some(contracts)
}

/// Runs one poll cycle for a chain.
///
/// Blocks are handled in increasing order and each is persisted before the
/// next is fetched. Shutdown is checked between blocks; an interrupted cycle
/// keeps the cursor where it was. Storage failures abort the cycle.
#[instrument(skip_all, fields(chain = %chain.slug))]
pub async fn process_new_blocks<C, S>(
	chain: &Chain,
	client: &C,
	store: &S,
	event_tx: &mpsc::Sender<NewContractsEvent>,
	shutdown_rx: &watch::Receiver<bool>,
) -> Result<CycleReport, BlockWatcherError>
where
	C: EvmClientTrait + ?Sized,
	S: ChainStateStore + ?Sized,
{
	let cursor = store.get_cursor(chain.index).await?;
	let latest = client.get_latest_block_number().await?;

	let mut report = CycleReport {
		cursor,
		..CycleReport::default()
	};

	let Some(window) = BlockWindow::determine(cursor, latest, chain.confirmation_blocks) else {
		debug!(latest, ?cursor, "No new blocks");
		return Ok(report);
	};
	report.window = Some(window);

	let processed = store
		.get_processed_blocks(chain.index, window.start, window.end)
		.await?;
	let pending = window.pending_blocks(&processed);

	// Missed blocks behind the window are retried in the slots the window leaves free
	let budget = chain.confirmation_blocks.saturating_add(1);
	let free_slots = budget.saturating_sub(pending.len() as u64) as usize;
	let retries: Vec<u64> = store
		.get_missed_blocks(chain.index)
		.await?
		.range(..window.start)
		.copied()
		.take(free_slots)
		.collect();

	debug!(
		start = window.start,
		end = window.end,
		latest,
		pending = pending.len(),
		retries = retries.len(),
		"Processing block window"
	);

	report.retried_blocks = retries.clone();

	let mut events = Vec::new();
	for block_number in retries.into_iter().chain(pending) {
		if *shutdown_rx.borrow() {
			info!(block = block_number, "Shutdown requested, stopping cycle");
			report.interrupted = true;
			break;
		}

		match fetch_block_contracts(chain, client, block_number).await {
			Some(contracts) => {
				store
					.save_block(chain.index, block_number, &contracts)
					.await?;
				report.processed_blocks.push(block_number);
				if !contracts.is_empty() {
					events.push(NewContractsEvent {
						chain_index: chain.index,
						block_number,
						contracts,
					});
				}
			}
			None => {
				store.save_missed_block(chain.index, block_number).await?;
				report.missed_blocks.push(block_number);
			}
		}
	}

	// Contracts of persisted blocks are published even when interrupted, as
	// those blocks will not be fetched again.
	for event in events {
		if let Err(e) = event_tx.send(event).await {
			warn!(block = e.0.block_number, "Event channel closed, dropping new contracts");
			continue;
		}
		report.events_published += 1;
	}

	if report.interrupted {
		return Ok(report);
	}

	let next_cursor = cursor.map_or(window.end, |c| c.max(window.end));
	store.save_cursor(chain.index, next_cursor).await?;
	report.cursor = Some(next_cursor);

	info!(
		start = window.start,
		end = window.end,
		processed = report.processed_blocks.len(),
		missed = report.missed_blocks.len(),
		retried = report.retried_blocks.len(),
		events = report.events_published,
		cursor = next_cursor,
		"Completed poll cycle"
	);

	Ok(report)
}

/// Scheduled poller of a single chain
pub struct ChainBlockWatcher<S, J>
where
	S: ChainStateStore + 'static,
	J: JobSchedulerTrait,
{
	pub chain: Chain,
	pub store: Arc<S>,
	pub event_tx: mpsc::Sender<NewContractsEvent>,
	pub shutdown_rx: watch::Receiver<bool>,
	in_flight: Arc<Mutex<()>>,
	scheduler: J,
}

impl<S, J> ChainBlockWatcher<S, J>
where
	S: ChainStateStore + 'static,
	J: JobSchedulerTrait,
{
	pub async fn new(
		chain: Chain,
		store: Arc<S>,
		event_tx: mpsc::Sender<NewContractsEvent>,
		shutdown_rx: watch::Receiver<bool>,
	) -> Result<Self, BlockWatcherError> {
		let scheduler = J::new().await.map_err(|e| {
			BlockWatcherError::scheduler_error(format!("Failed to create scheduler: {}", e))
		})?;
		Ok(Self {
			chain,
			store,
			event_tx,
			shutdown_rx,
			in_flight: Arc::new(Mutex::new(())),
			scheduler,
		})
	}

	/// Schedules the poll cycle on the chain's cron schedule and starts it.
	///
	/// A tick that fires while the previous cycle is still running is skipped.
	pub async fn start<C: EvmClientTrait + 'static>(
		&mut self,
		client: Arc<C>,
	) -> Result<(), BlockWatcherError> {
		let chain = self.chain.clone();
		let store = self.store.clone();
		let event_tx = self.event_tx.clone();
		let shutdown_rx = self.shutdown_rx.clone();
		let in_flight = self.in_flight.clone();

		let job = Job::new_async(self.chain.cron_schedule.as_str(), move |_uuid, _l| {
			let chain = chain.clone();
			let client = client.clone();
			let store = store.clone();
			let event_tx = event_tx.clone();
			let shutdown_rx = shutdown_rx.clone();
			let in_flight = in_flight.clone();

			Box::pin(async move {
				let Ok(_guard) = in_flight.try_lock_owned() else {
					warn!(chain = %chain.slug, "Previous cycle still running, skipping tick");
					return;
				};
				if *shutdown_rx.borrow() {
					return;
				}

				if let Err(e) = process_new_blocks(
					&chain,
					client.as_ref(),
					store.as_ref(),
					&event_tx,
					&shutdown_rx,
				)
				.await
				{
					error!(chain = %chain.slug, "Error processing blocks: {}", e);
				}
			})
		})
		.map_err(|e| BlockWatcherError::scheduler_error(format!("Failed to create job: {}", e)))?;

		self.scheduler
			.add(job)
			.await
			.map_err(|e| BlockWatcherError::scheduler_error(format!("Failed to add job: {}", e)))?;

		self.scheduler.start().await.map_err(|e| {
			BlockWatcherError::scheduler_error(format!("Failed to start scheduler: {}", e))
		})?;

		info!("Started block watcher for chain: {}", self.chain.slug);
		Ok(())
	}

	/// Stops the scheduler. A cycle already running finishes its current block.
	pub async fn stop(&mut self) -> Result<(), BlockWatcherError> {
		self.scheduler.shutdown().await.map_err(|e| {
			BlockWatcherError::scheduler_error(format!("Failed to stop scheduler: {}", e))
		})?;

		info!("Stopped block watcher for chain: {}", self.chain.slug);
		Ok(())
	}
}

/// Owns the block watchers of all chains
pub struct BlockWatcherService<S, J>
where
	S: ChainStateStore + 'static,
	J: JobSchedulerTrait,
{
	pub store: Arc<S>,
	pub event_tx: mpsc::Sender<NewContractsEvent>,
	pub shutdown_rx: watch::Receiver<bool>,
	pub active_watchers: Arc<RwLock<HashMap<usize, ChainBlockWatcher<S, J>>>>,
}

impl<S, J> BlockWatcherService<S, J>
where
	S: ChainStateStore + 'static,
	J: JobSchedulerTrait,
{
	pub async fn new(
		store: Arc<S>,
		event_tx: mpsc::Sender<NewContractsEvent>,
		shutdown_rx: watch::Receiver<bool>,
	) -> Result<Self, BlockWatcherError> {
		Ok(Self {
			store,
			event_tx,
			shutdown_rx,
			active_watchers: Arc::new(RwLock::new(HashMap::new())),
		})
	}

	/// Starts a watcher for `chain`; a chain that is already watched is left alone
	pub async fn start_chain_watcher<C: EvmClientTrait + 'static>(
		&self,
		chain: &Chain,
		client: Arc<C>,
	) -> Result<(), BlockWatcherError> {
		let mut watchers = self.active_watchers.write().await;

		if watchers.contains_key(&chain.index) {
			info!("Block watcher already running for chain: {}", chain.slug);
			return Ok(());
		}

		let mut watcher = ChainBlockWatcher::<S, J>::new(
			chain.clone(),
			self.store.clone(),
			self.event_tx.clone(),
			self.shutdown_rx.clone(),
		)
		.await?;
		watcher.start(client).await?;
		watchers.insert(chain.index, watcher);

		Ok(())
	}

	pub async fn stop_chain_watcher(&self, chain_index: usize) -> Result<(), BlockWatcherError> {
		let mut watchers = self.active_watchers.write().await;

		if let Some(mut watcher) = watchers.remove(&chain_index) {
			watcher.stop().await?;
		}

		Ok(())
	}

	/// Stops every watcher, reporting the first failure after trying them all
	pub async fn stop_all(&self) -> Result<(), BlockWatcherError> {
		let mut watchers = self.active_watchers.write().await;
		let mut first_error = None;

		for (_, mut watcher) in watchers.drain() {
			if let Err(e) = watcher.stop().await {
				first_error.get_or_insert(e);
			}
		}

		first_error.map_or(Ok(()), Err)
	}

	pub async fn active_chains(&self) -> Vec<usize> {
		let mut chains: Vec<usize> = self.active_watchers.read().await.keys().copied().collect();
		chains.sort_unstable();
		chains
	}
}
