use std::{path::Path, str::FromStr};

use crate::{
	models::{Chain, ConfigLoader},
	utils::constants::DEFAULT_CHAINS_CONFIG_DIR,
};

use super::error::ConfigError;

impl ConfigLoader for Chain {
	fn load_all<T>(path: Option<&Path>) -> Result<T, ConfigError>
	where
		T: FromIterator<(String, Self)>,
	{
		let chain_dir = path.unwrap_or(Path::new(DEFAULT_CHAINS_CONFIG_DIR));
		let mut pairs = Vec::new();

		if !chain_dir.exists() {
			return Err(ConfigError::directory_not_found(
				chain_dir.display().to_string(),
			));
		}

		let mut entries = std::fs::read_dir(chain_dir)?
			.map(|entry| entry.map(|e| e.path()))
			.collect::<Result<Vec<_>, _>>()?;
		entries.sort();

		for path in entries {
			if !Self::is_json_file(&path) {
				continue;
			}

			let name = path
				.file_stem()
				.and_then(|s| s.to_str())
				.unwrap_or("unknown")
				.to_string();

			let chain = Self::load_from_path(&path).map_err(|e| {
				ConfigError::validation_error(format!("{}: {}", path.display(), e))
			})?;
			pairs.push((name, chain));
		}

		Ok(T::from_iter(pairs))
	}

	fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		let file = std::fs::File::open(path)?;
		let config: Chain = serde_json::from_reader(file)?;

		if let Err(validation_error) = config.validate() {
			return Err(ConfigError::validation_error(validation_error));
		}

		Ok(config)
	}

	fn validate(&self) -> Result<(), String> {
		// Validate slug
		if self.slug.is_empty()
			|| !self
				.slug
				.chars()
				.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
		{
			return Err(
				"Slug must contain only lowercase letters, numbers, and underscores".to_string(),
			);
		}

		if self.rpc_urls.is_empty() {
			return Err("At least one RPC URL is required".to_string());
		}

		// Validate RPC URL types
		let supported_types = ["rpc"];
		if !self
			.rpc_urls
			.iter()
			.all(|rpc_url| supported_types.contains(&rpc_url.type_.as_str()))
		{
			return Err(format!(
				"RPC URL type must be one of: {}",
				supported_types.join(", ")
			));
		}

		// Validate RPC URLs format
		if !self.rpc_urls.iter().all(|rpc_url| {
			url::Url::parse(&rpc_url.url)
				.map(|u| u.scheme() == "http" || u.scheme() == "https")
				.unwrap_or(false)
		}) {
			return Err("All RPC URLs must be valid http:// or https:// URLs".to_string());
		}

		// Validate RPC URL weights
		if !self.rpc_urls.iter().all(|rpc_url| rpc_url.weight <= 100) {
			return Err("All RPC URL weights must be between 0 and 100".to_string());
		}

		if self.confirmation_blocks == 0 {
			return Err("Confirmation blocks must be greater than 0".to_string());
		}

		if let Err(e) = cron::Schedule::from_str(&self.cron_schedule) {
			return Err(format!(
				"Invalid cron schedule '{}': {}",
				self.cron_schedule, e
			));
		}

		if self.rpc_timeout_ms.is_some_and(|ms| ms < 100) {
			return Err("RPC timeout must be at least 100ms".to_string());
		}

		if let Some(explorer) = &self.explorer_url {
			if url::Url::parse(explorer).is_err() {
				return Err(format!("Invalid explorer URL: {}", explorer));
			}
		}

		Ok(())
	}
}
