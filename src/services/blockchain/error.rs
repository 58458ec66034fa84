//! Blockchain error types and handling.
//!
//! Every variant is a transient failure from the point of view of the pollers:
//! the affected work is skipped and retried on a later cycle.

use crate::services::blockwatcher::BlockWatcherError;

use log::{error, warn};

/// Represents possible errors that can occur during blockchain operations
#[derive(Debug)]
pub enum BlockChainError {
	/// Errors related to network connectivity issues
	ConnectionError(String),

	/// Errors related to malformed requests or invalid responses
	RequestError(String),

	/// When a requested block cannot be found on the blockchain
	BlockNotFound(u64),

	/// A remote call did not complete within the chain's RPC timeout
	TimeoutError(String),

	/// Internal errors within the blockchain client
	InternalError(String),
}

impl BlockChainError {
	fn format_message(&self) -> String {
		match self {
			Self::ConnectionError(msg) => format!("Connection error: {}", msg),
			Self::RequestError(msg) => format!("Request error: {}", msg),
			Self::BlockNotFound(number) => format!("Block not found: {}", number),
			Self::TimeoutError(msg) => format!("Timeout: {}", msg),
			Self::InternalError(msg) => format!("Internal error: {}", msg),
		}
	}

	/// Creates a new connection error with logging
	pub fn connection_error(msg: impl Into<String>) -> Self {
		let error = Self::ConnectionError(msg.into());
		warn!("{}", error.format_message());
		error
	}

	/// Creates a new request error with logging
	pub fn request_error(msg: impl Into<String>) -> Self {
		let error = Self::RequestError(msg.into());
		warn!("{}", error.format_message());
		error
	}

	/// Creates a new block not found error with logging
	pub fn block_not_found(number: u64) -> Self {
		let error = Self::BlockNotFound(number);
		warn!("{}", error.format_message());
		error
	}

	/// Creates a new timeout error with logging
	pub fn timeout_error(msg: impl Into<String>) -> Self {
		let error = Self::TimeoutError(msg.into());
		warn!("{}", error.format_message());
		error
	}

	/// Creates a new internal error with logging
	pub fn internal_error(msg: impl Into<String>) -> Self {
		let error = Self::InternalError(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl std::fmt::Display for BlockChainError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl std::error::Error for BlockChainError {}

impl From<reqwest_middleware::Error> for BlockChainError {
	fn from(err: reqwest_middleware::Error) -> Self {
		Self::connection_error(err.to_string())
	}
}

/// Conversion from BlockChainError to BlockWatcherError
impl From<BlockChainError> for BlockWatcherError {
	fn from(err: BlockChainError) -> Self {
		BlockWatcherError::network_error(err.to_string())
	}
}
