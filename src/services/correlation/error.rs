//! Correlation engine error types.

use log::error;
use std::error::Error;
use std::fmt;

use crate::services::{blockchain::BlockChainError, storage::StorageError};

#[derive(Debug)]
pub enum CorrelationError {
	/// No client was registered for the chain of an event
	UnknownChain(usize),
	StorageError(String),
	NetworkError(String),
}

impl CorrelationError {
	fn format_message(&self) -> String {
		match self {
			Self::UnknownChain(index) => format!("No client registered for chain {}", index),
			Self::StorageError(msg) => format!("Storage error: {}", msg),
			Self::NetworkError(msg) => format!("Network error: {}", msg),
		}
	}

	pub fn unknown_chain(index: usize) -> Self {
		let error = Self::UnknownChain(index);
		error!("{}", error.format_message());
		error
	}

	pub fn storage_error(msg: impl Into<String>) -> Self {
		let error = Self::StorageError(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn network_error(msg: impl Into<String>) -> Self {
		let error = Self::NetworkError(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for CorrelationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for CorrelationError {}

impl From<StorageError> for CorrelationError {
	fn from(err: StorageError) -> Self {
		Self::storage_error(err.to_string())
	}
}

impl From<BlockChainError> for CorrelationError {
	fn from(err: BlockChainError) -> Self {
		Self::network_error(err.to_string())
	}
}
