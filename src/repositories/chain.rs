//! Chain configuration repository.

use std::{
	collections::{HashMap, HashSet},
	path::Path,
};

use crate::{
	models::{Chain, ConfigLoader},
	repositories::error::RepositoryError,
};

/// Chains loaded from the configuration directory, keyed by file stem
pub struct ChainRepository {
	pub chains: HashMap<String, Chain>,
}

impl ChainRepository {
	pub fn new(path: Option<&Path>) -> Result<Self, RepositoryError> {
		let chains = Chain::load_all(path)
			.map_err(|e| RepositoryError::load_error(format!("Failed to load chains: {}", e)))?;
		Self::validate_indices(&chains)?;
		Ok(ChainRepository { chains })
	}

	/// Every chain index must be unique, as it keys all persisted data.
	fn validate_indices(chains: &HashMap<String, Chain>) -> Result<(), RepositoryError> {
		let mut seen = HashSet::new();
		let mut slugs = HashSet::new();
		for chain in chains.values() {
			if !seen.insert(chain.index) {
				return Err(RepositoryError::validation_error(format!(
					"Duplicate chain index {}",
					chain.index
				)));
			}
			if !slugs.insert(chain.slug.as_str()) {
				return Err(RepositoryError::validation_error(format!(
					"Duplicate chain slug {}",
					chain.slug
				)));
			}
		}
		Ok(())
	}
}

pub trait ChainRepositoryTrait {
	fn load_all(&self, path: Option<&Path>) -> Result<HashMap<String, Chain>, RepositoryError>;
	fn get(&self, chain_id: &str) -> Option<Chain>;
	fn get_all(&self) -> HashMap<String, Chain>;
}

impl ChainRepositoryTrait for ChainRepository {
	fn load_all(&self, path: Option<&Path>) -> Result<HashMap<String, Chain>, RepositoryError> {
		let chains = Chain::load_all(path)
			.map_err(|e| RepositoryError::load_error(format!("Failed to load chains: {}", e)))?;
		Self::validate_indices(&chains)?;
		Ok(chains)
	}

	fn get(&self, chain_id: &str) -> Option<Chain> {
		self.chains.get(chain_id).cloned()
	}

	fn get_all(&self) -> HashMap<String, Chain> {
		self.chains.clone()
	}
}

pub struct ChainService<T: ChainRepositoryTrait> {
	repository: T,
}

impl<T: ChainRepositoryTrait> ChainService<T> {
	pub fn new(path: Option<&Path>) -> Result<ChainService<ChainRepository>, RepositoryError> {
		let repository = ChainRepository::new(path)?;
		Ok(ChainService { repository })
	}

	pub fn new_with_repository(repository: T) -> Result<Self, RepositoryError> {
		Ok(ChainService { repository })
	}

	pub fn get(&self, chain_id: &str) -> Option<Chain> {
		self.repository.get(chain_id)
	}

	pub fn get_all(&self) -> HashMap<String, Chain> {
		self.repository.get_all()
	}

	/// All chains ordered by index
	pub fn get_sorted(&self) -> Vec<Chain> {
		let mut chains: Vec<Chain> = self.repository.get_all().into_values().collect();
		chains.sort_by_key(|c| c.index);
		chains
	}

	pub fn get_by_index(&self, index: usize) -> Option<Chain> {
		self.repository
			.get_all()
			.into_values()
			.find(|c| c.index == index)
	}

	/// Resolves a chain from a slug, a config file stem or a numeric index
	pub fn resolve(&self, slug_or_index: &str) -> Result<Chain, RepositoryError> {
		let all = self.repository.get_all();
		if let Some(chain) = all.values().find(|c| c.slug == slug_or_index) {
			return Ok(chain.clone());
		}
		if let Some(chain) = all.get(slug_or_index) {
			return Ok(chain.clone());
		}
		slug_or_index
			.parse::<usize>()
			.ok()
			.and_then(|index| all.into_values().find(|c| c.index == index))
			.ok_or_else(|| RepositoryError::not_found(slug_or_index))
	}
}
