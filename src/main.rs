//! Contract sentinel entry point.
//!
//! Without a subcommand the binary runs the service: it loads the chain
//! configuration, starts one block watcher per reachable chain, and wires
//! the watchers to the correlation engine and the notification service.
//! Ctrl+C stops the watchers and lets the engine and notifiers drain.
//!
//! The `users`, `watch`, `unwatch` and `list` subcommands manage the user
//! registry in the data directory.

use std::env::{set_var, var};

use clap::{Arg, ArgMatches, Command};
use dotenvy::dotenv;
use tokio::sync::{mpsc, watch};
use tokio_cron_scheduler::JobScheduler;
use tracing::{error, info};

use contract_sentinel::{
	bootstrap::{
		connect_chains, create_notifiers, execute_user_command, initialize_services, ChainClient,
		Result, ServiceSettings, UserCommand,
	},
	services::{
		blockwatcher::BlockWatcherService, correlation::CorrelationEngine,
		notification::NotificationService, storage::FileChainStateStore,
	},
	utils::{constants::EVENT_CHANNEL_CAPACITY, logging::setup_logging},
};

fn cli() -> Command {
	let user_arg = || Arg::new("user").required(true).value_name("USER");
	let chain_arg = || {
		Arg::new("chain")
			.required(true)
			.value_name("CHAIN")
			.help("Chain slug or index")
	};
	let addresses_arg = || {
		Arg::new("addresses")
			.required(true)
			.num_args(1..)
			.value_name("ADDRESS")
	};

	Command::new("contract-sentinel")
		.version(env!("CARGO_PKG_VERSION"))
		.about(
			"Watches newly deployed contracts on several chains and reports those whose bytecode \
			 references a registered address.",
		)
		.arg(
			Arg::new("log-file")
				.long("log-file")
				.help("Write logs to file instead of stdout")
				.action(clap::ArgAction::SetTrue),
		)
		.arg(
			Arg::new("log-level")
				.long("log-level")
				.help("Set log level (trace, debug, info, warn, error)")
				.value_name("LEVEL"),
		)
		.arg(
			Arg::new("log-path")
				.long("log-path")
				.help("Path to store log files (default: logs/)")
				.value_name("PATH"),
		)
		.arg(
			Arg::new("config-dir")
				.long("config-dir")
				.help("Directory of chain configuration files (default: config/chains)")
				.value_name("DIR"),
		)
		.arg(
			Arg::new("data-dir")
				.long("data-dir")
				.help("Directory of the persisted stores (default: data)")
				.value_name("DIR"),
		)
		.subcommand(
			Command::new("users")
				.about("Manage registered users")
				.subcommand_required(true)
				.subcommand(Command::new("add").about("Register a user").arg(user_arg()))
				.subcommand(
					Command::new("remove")
						.about("Delete a user and all watched addresses")
						.arg(user_arg()),
				),
		)
		.subcommand(
			Command::new("watch")
				.about("Watch addresses on a chain")
				.arg(user_arg())
				.arg(chain_arg())
				.arg(addresses_arg()),
		)
		.subcommand(
			Command::new("unwatch")
				.about("Stop watching addresses on a chain")
				.arg(user_arg())
				.arg(chain_arg())
				.arg(addresses_arg()),
		)
		.subcommand(
			Command::new("list")
				.about("List the addresses a user watches on a chain")
				.arg(user_arg())
				.arg(chain_arg()),
		)
}

/// Only applies CLI options whose environment variable is not already set
fn apply_cli_overrides(matches: &ArgMatches) {
	if matches.get_flag("log-file") && var("LOG_MODE").is_err() {
		set_var("LOG_MODE", "file");
	}

	for (arg, key) in [
		("log-level", "LOG_LEVEL"),
		("log-path", "LOG_DATA_DIR"),
		("config-dir", "CONFIG_DIR"),
		("data-dir", "DATA_DIR"),
	] {
		if let Some(value) = matches.get_one::<String>(arg) {
			if var(key).is_err() {
				set_var(key, value);
			}
		}
	}
}

fn user_command(matches: &ArgMatches) -> Option<UserCommand> {
	let string = |m: &ArgMatches, id: &str| m.get_one::<String>(id).cloned().unwrap_or_default();
	let strings = |m: &ArgMatches, id: &str| -> Vec<String> {
		m.get_many::<String>(id)
			.map(|values| values.cloned().collect())
			.unwrap_or_default()
	};

	match matches.subcommand()? {
		("users", sub) => match sub.subcommand()? {
			("add", m) => Some(UserCommand::AddUser(string(m, "user"))),
			("remove", m) => Some(UserCommand::RemoveUser(string(m, "user"))),
			_ => None,
		},
		("watch", m) => Some(UserCommand::Watch {
			user: string(m, "user"),
			chain: string(m, "chain"),
			addresses: strings(m, "addresses"),
		}),
		("unwatch", m) => Some(UserCommand::Unwatch {
			user: string(m, "user"),
			chain: string(m, "chain"),
			addresses: strings(m, "addresses"),
		}),
		("list", m) => Some(UserCommand::List {
			user: string(m, "user"),
			chain: string(m, "chain"),
		}),
		_ => None,
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let matches = cli().get_matches();

	// Load environment variables from .env file
	dotenv().ok();
	apply_cli_overrides(&matches);

	setup_logging().unwrap_or_else(|e| {
		eprintln!("Failed to setup logging: {}", e);
	});

	let settings = ServiceSettings::from_env();
	let (chain_service, stores) = initialize_services(&settings).map_err(|e| {
		anyhow::anyhow!(
			"Failed to initialize services: {}. Chain configurations are read from {}.",
			e,
			settings.config_dir.display()
		)
	})?;

	if let Some(command) = user_command(&matches) {
		let output = execute_user_command(command, stores.users.as_ref(), &chain_service).await?;
		println!("{}", output);
		return Ok(());
	}

	let chains = connect_chains(&chain_service.get_sorted()).await;
	if chains.is_empty() {
		return Err(anyhow::anyhow!("No configured chain could be reached. Exiting...").into());
	}

	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
	let (match_tx, match_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

	let mut engine = CorrelationEngine::<ChainClient, _, _>::new(
		stores.users.clone(),
		stores.matches.clone(),
		match_tx,
	);
	for (chain, client) in &chains {
		engine.register_chain(chain.index, client.clone());
	}

	let notification_service = NotificationService::new(
		stores.users.clone(),
		chains.iter().map(|(chain, _)| chain.clone()),
		create_notifiers(&settings)?,
	);

	let engine_task = tokio::spawn(engine.run(event_rx, shutdown_rx.clone()));
	let notifier_task = tokio::spawn(notification_service.run(match_rx, shutdown_rx.clone()));

	let block_watcher = BlockWatcherService::<FileChainStateStore, JobScheduler>::new(
		stores.chain_state.clone(),
		event_tx,
		shutdown_rx,
	)
	.await?;

	for (chain, client) in &chains {
		let _ = block_watcher
			.start_chain_watcher(chain, client.clone())
			.await
			.inspect_err(|e| {
				error!("Failed to start block watcher for {}: {}", chain.slug, e);
			});
	}

	if block_watcher.active_chains().await.is_empty() {
		let _ = shutdown_tx.send(true);
		return Err(anyhow::anyhow!("No block watcher could be started. Exiting...").into());
	}

	info!("Service started. Press Ctrl+C to shutdown");

	if let Err(e) = tokio::signal::ctrl_c().await {
		error!("Error waiting for Ctrl+C: {}", e);
	}
	info!("Shutdown signal received, stopping services...");

	let _ = shutdown_tx.send(true);

	if let Err(e) = block_watcher.stop_all().await {
		error!("Error during shutdown: {}", e);
	}
	// Jobs may still hold senders; the engine closes its receiver itself
	drop(block_watcher);

	for (name, result) in [
		("correlation engine", engine_task.await),
		("notification service", notifier_task.await),
	] {
		if let Err(e) = result {
			error!("The {} task failed: {}", name, e);
		}
	}

	info!("Shutdown complete");
	Ok(())
}
