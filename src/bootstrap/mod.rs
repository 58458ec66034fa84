//! Bootstrap module for initializing services.
//!
//! Resolves settings from the environment, loads the chain configuration,
//! opens the stores, connects the RPC clients and builds the notifiers. Also
//! executes the user registry commands of the CLI.

use std::{
	env::var,
	error::Error,
	path::{Path, PathBuf},
	sync::Arc,
};

use tracing::{error, info};

use crate::{
	models::Chain,
	repositories::{ChainRepository, ChainRepositoryTrait, ChainService},
	services::{
		blockchain::{EvmClient, HttpTransportClient},
		notification::{LogNotifier, Notifier, WebhookNotifier},
		storage::{FileChainStateStore, FileMatchStore, FileUserRegistry, UserRegistry},
	},
	utils::{
		constants::{DEFAULT_CHAINS_CONFIG_DIR, DEFAULT_DATA_DIR},
		http::HttpRetryConfig,
	},
};

/// Type alias for handling ServiceResult
pub type Result<T> = std::result::Result<T, Box<dyn Error + Send + Sync>>;

/// Client used for every configured chain
pub type ChainClient = EvmClient<HttpTransportClient>;

/// Settings resolved from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
	pub config_dir: PathBuf,
	pub data_dir: PathBuf,
	pub webhook_url: Option<String>,
	pub webhook_secret: Option<String>,
}

impl ServiceSettings {
	/// Reads `CONFIG_DIR`, `DATA_DIR`, `WEBHOOK_URL` and `WEBHOOK_SECRET`
	pub fn from_env() -> Self {
		let non_empty = |key: &str| var(key).ok().filter(|v| !v.trim().is_empty());
		Self {
			config_dir: non_empty("CONFIG_DIR")
				.map(PathBuf::from)
				.unwrap_or_else(|| PathBuf::from(DEFAULT_CHAINS_CONFIG_DIR)),
			data_dir: non_empty("DATA_DIR")
				.map(PathBuf::from)
				.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
			webhook_url: non_empty("WEBHOOK_URL"),
			webhook_secret: non_empty("WEBHOOK_SECRET"),
		}
	}
}

/// The file-backed stores under the data directory
pub struct Stores {
	pub chain_state: Arc<FileChainStateStore>,
	pub users: Arc<FileUserRegistry>,
	pub matches: Arc<FileMatchStore>,
}

impl Stores {
	pub fn open(data_dir: &Path) -> Self {
		Self {
			chain_state: Arc::new(FileChainStateStore::new(data_dir)),
			users: Arc::new(FileUserRegistry::new(data_dir)),
			matches: Arc::new(FileMatchStore::new(data_dir)),
		}
	}
}

/// Loads the chain configuration and opens the stores.
///
/// # Errors
/// Returns an error if the configuration directory is missing, a chain file
/// is invalid, or no chain is configured.
pub fn initialize_services(
	settings: &ServiceSettings,
) -> Result<(ChainService<ChainRepository>, Stores)> {
	let repository = ChainRepository::new(Some(settings.config_dir.as_path()))?;
	if repository.get_all().is_empty() {
		return Err(format!(
			"No chain configurations found in {}",
			settings.config_dir.display()
		)
		.into());
	}
	let chain_service = ChainService::<ChainRepository>::new_with_repository(repository)?;

	Ok((chain_service, Stores::open(&settings.data_dir)))
}

/// Connects to every chain, skipping those whose endpoints are all unreachable
pub async fn connect_chains(chains: &[Chain]) -> Vec<(Chain, Arc<ChainClient>)> {
	let mut connected = Vec::with_capacity(chains.len());
	for chain in chains {
		match ChainClient::new(chain).await {
			Ok(client) => {
				info!(chain = %chain.slug, index = chain.index, "Connected to chain");
				connected.push((chain.clone(), Arc::new(client)));
			}
			Err(e) => {
				error!(chain = %chain.slug, "Failed to connect, chain will not be watched: {}", e);
			}
		}
	}
	connected
}

/// Builds the notifiers: structured logs always, plus a webhook when configured
pub fn create_notifiers(settings: &ServiceSettings) -> Result<Vec<Arc<dyn Notifier>>> {
	let mut notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier)];

	if let Some(url) = &settings.webhook_url {
		let webhook = WebhookNotifier::new(
			url.clone(),
			settings.webhook_secret.clone(),
			&HttpRetryConfig::default(),
		)?;
		notifiers.push(Arc::new(webhook));
	}

	Ok(notifiers)
}

/// A user registry command issued from the CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
	AddUser(String),
	RemoveUser(String),
	Watch {
		user: String,
		chain: String,
		addresses: Vec<String>,
	},
	Unwatch {
		user: String,
		chain: String,
		addresses: Vec<String>,
	},
	List {
		user: String,
		chain: String,
	},
}

/// Executes a registry command and returns the text to show the user.
///
/// `chain` arguments accept a slug or an index.
pub async fn execute_user_command<U, T>(
	command: UserCommand,
	registry: &U,
	chains: &ChainService<T>,
) -> Result<String>
where
	U: UserRegistry + ?Sized,
	T: ChainRepositoryTrait,
{
	match command {
		UserCommand::AddUser(user) => {
			registry.add_user(&user).await?;
			Ok(format!("User {} added", user))
		}
		UserCommand::RemoveUser(user) => {
			registry.remove_user(&user).await?;
			Ok(format!("User {} removed", user))
		}
		UserCommand::Watch {
			user,
			chain,
			addresses,
		} => {
			let chain = chains.resolve(&chain)?;
			let added = registry
				.watch_addresses(&user, chain.index, &addresses)
				.await?;
			if added.is_empty() {
				Ok(format!("All addresses already watched on {}", chain.name))
			} else {
				Ok(format!(
					"Now watching on {}: {}",
					chain.name,
					added.join(", ")
				))
			}
		}
		UserCommand::Unwatch {
			user,
			chain,
			addresses,
		} => {
			let chain = chains.resolve(&chain)?;
			let removed = registry
				.unwatch_addresses(&user, chain.index, &addresses)
				.await?;
			Ok(format!(
				"Stopped watching on {}: {}",
				chain.name,
				removed.join(", ")
			))
		}
		UserCommand::List { user, chain } => {
			let chain = chains.resolve(&chain)?;
			let addresses = registry.get_user_addresses(&user, chain.index).await?;
			if addresses.is_empty() {
				Ok(format!("No addresses watched on {}", chain.name))
			} else {
				Ok(format!(
					"Addresses watched on {}:\n{}",
					chain.name,
					addresses.join("\n")
				))
			}
		}
	}
}
