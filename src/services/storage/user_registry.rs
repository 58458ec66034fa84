//! Registry of watched addresses.
//!
//! Stored in `<data_dir>/users.json` as `userID -> chainIndex -> {"addresses": [..]}`.
//! Addresses are validated and stored checksummed, so duplicates are detected
//! regardless of case or prefix.

use std::{
	collections::{BTreeMap, BTreeSet},
	path::Path,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use super::{error::StorageError, file::JsonDocument};
use crate::utils::{normalize_address, same_address};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
struct WatchList {
	#[serde(default)]
	addresses: Vec<String>,
}

type Users = BTreeMap<String, BTreeMap<usize, WatchList>>;

/// Interface for user registrations
#[async_trait]
pub trait UserRegistry: Send + Sync {
	/// Registers a user with no watched addresses. Conflict if the user exists.
	async fn add_user(&self, user_id: &str) -> Result<(), StorageError>;

	/// Deletes a user and all of their watched addresses. Conflict if unknown.
	async fn remove_user(&self, user_id: &str) -> Result<(), StorageError>;

	async fn list_users(&self) -> Result<Vec<String>, StorageError>;

	/// Adds addresses to a user's watch list for a chain and returns the ones
	/// that were not already present. The user is created if needed.
	///
	/// The whole request is rejected if any address is malformed.
	async fn watch_addresses(
		&self,
		user_id: &str,
		chain_index: usize,
		addresses: &[String],
	) -> Result<Vec<String>, StorageError>;

	/// Removes addresses from a user's watch list. If any of them is not
	/// watched the request fails with a conflict naming them, and nothing changes.
	async fn unwatch_addresses(
		&self,
		user_id: &str,
		chain_index: usize,
		addresses: &[String],
	) -> Result<Vec<String>, StorageError>;

	async fn get_user_addresses(
		&self,
		user_id: &str,
		chain_index: usize,
	) -> Result<Vec<String>, StorageError>;

	/// Unique watched addresses for a chain across all users
	async fn get_watched_addresses(
		&self,
		chain_index: usize,
	) -> Result<BTreeSet<String>, StorageError>;

	/// Users watching `address` on a chain
	async fn get_subscribers(
		&self,
		chain_index: usize,
		address: &str,
	) -> Result<Vec<String>, StorageError>;
}

fn validate_user_id(user_id: &str) -> Result<(), StorageError> {
	if user_id.trim().is_empty() || user_id.chars().any(char::is_whitespace) {
		return Err(StorageError::InvalidInput(format!(
			"Invalid user ID: '{}'",
			user_id
		)));
	}
	Ok(())
}

/// Validates every address, reporting all malformed ones at once
fn normalize_all(addresses: &[String]) -> Result<Vec<String>, StorageError> {
	if addresses.is_empty() {
		return Err(StorageError::InvalidInput("No addresses given".into()));
	}

	let mut valid = Vec::with_capacity(addresses.len());
	let mut invalid = Vec::new();
	for address in addresses {
		match normalize_address(address) {
			Some(normalized) => valid.push(normalized),
			None => invalid.push(address.as_str()),
		}
	}

	if !invalid.is_empty() {
		return Err(StorageError::InvalidInput(format!(
			"Invalid addresses: {}",
			invalid.join(", ")
		)));
	}
	Ok(valid)
}

/// File-backed user registry.
///
/// All mutations are serialized through one lock, so concurrent registrations
/// of the same address store it once.
pub struct FileUserRegistry {
	document: JsonDocument<Users>,
	lock: Mutex<()>,
}

impl FileUserRegistry {
	pub fn new(data_dir: &Path) -> Self {
		Self {
			document: JsonDocument::new(data_dir.join("users.json")),
			lock: Mutex::new(()),
		}
	}
}

#[async_trait]
impl UserRegistry for FileUserRegistry {
	async fn add_user(&self, user_id: &str) -> Result<(), StorageError> {
		validate_user_id(user_id)?;
		let _guard = self.lock.lock().await;

		let mut users = self.document.load().await?;
		if users.contains_key(user_id) {
			return Err(StorageError::Conflict(format!(
				"User {} already exists",
				user_id
			)));
		}
		users.insert(user_id.to_string(), BTreeMap::new());
		self.document.save(&users).await?;

		info!(user = user_id, "Added user");
		Ok(())
	}

	async fn remove_user(&self, user_id: &str) -> Result<(), StorageError> {
		let _guard = self.lock.lock().await;

		let mut users = self.document.load().await?;
		if users.remove(user_id).is_none() {
			return Err(StorageError::Conflict(format!(
				"User {} not found",
				user_id
			)));
		}
		self.document.save(&users).await?;

		info!(user = user_id, "Removed user");
		Ok(())
	}

	async fn list_users(&self) -> Result<Vec<String>, StorageError> {
		let users = self.document.load().await?;
		Ok(users.into_keys().collect())
	}

	async fn watch_addresses(
		&self,
		user_id: &str,
		chain_index: usize,
		addresses: &[String],
	) -> Result<Vec<String>, StorageError> {
		validate_user_id(user_id)?;
		let requested = normalize_all(addresses)?;
		let _guard = self.lock.lock().await;

		let mut users = self.document.load().await?;
		let watch_list = users
			.entry(user_id.to_string())
			.or_default()
			.entry(chain_index)
			.or_default();

		let mut added = Vec::new();
		for address in requested {
			let present = watch_list
				.addresses
				.iter()
				.any(|existing| same_address(existing, &address));
			if !present {
				watch_list.addresses.push(address.clone());
				added.push(address);
			}
		}

		if !added.is_empty() {
			self.document.save(&users).await?;
			info!(
				user = user_id,
				chain = chain_index,
				added = added.len(),
				"Watching new addresses"
			);
		}
		Ok(added)
	}

	async fn unwatch_addresses(
		&self,
		user_id: &str,
		chain_index: usize,
		addresses: &[String],
	) -> Result<Vec<String>, StorageError> {
		let requested = normalize_all(addresses)?;
		let _guard = self.lock.lock().await;

		let mut users = self.document.load().await?;
		let user = users.get_mut(user_id).ok_or_else(|| {
			StorageError::Conflict(format!("User {} not found", user_id))
		})?;
		let watch_list = user.entry(chain_index).or_default();

		// Report the addresses as the caller spelled them
		let missing: Vec<&str> = addresses
			.iter()
			.zip(&requested)
			.filter(|(_, address)| {
				!watch_list
					.addresses
					.iter()
					.any(|existing| same_address(existing, address))
			})
			.map(|(input, _)| input.as_str())
			.collect();
		if !missing.is_empty() {
			return Err(StorageError::Conflict(format!(
				"The following addresses are not watched on chain {}: {}",
				chain_index,
				missing.join(", ")
			)));
		}

		watch_list.addresses.retain(|existing| {
			!requested
				.iter()
				.any(|address| same_address(existing, address))
		});
		if watch_list.addresses.is_empty() {
			user.remove(&chain_index);
		}
		self.document.save(&users).await?;

		info!(
			user = user_id,
			chain = chain_index,
			removed = requested.len(),
			"Stopped watching addresses"
		);
		Ok(requested)
	}

	async fn get_user_addresses(
		&self,
		user_id: &str,
		chain_index: usize,
	) -> Result<Vec<String>, StorageError> {
		let users = self.document.load().await?;
		Ok(users
			.get(user_id)
			.and_then(|chains| chains.get(&chain_index))
			.map(|list| list.addresses.clone())
			.unwrap_or_default())
	}

	async fn get_watched_addresses(
		&self,
		chain_index: usize,
	) -> Result<BTreeSet<String>, StorageError> {
		let users = self.document.load().await?;
		Ok(users
			.values()
			.filter_map(|chains| chains.get(&chain_index))
			.flat_map(|list| list.addresses.iter().cloned())
			.collect())
	}

	async fn get_subscribers(
		&self,
		chain_index: usize,
		address: &str,
	) -> Result<Vec<String>, StorageError> {
		let users = self.document.load().await?;
		Ok(users
			.iter()
			.filter(|(_, chains)| {
				chains.get(&chain_index).is_some_and(|list| {
					list.addresses
						.iter()
						.any(|existing| same_address(existing, address))
				})
			})
			.map(|(user_id, _)| user_id.clone())
			.collect())
	}
}
