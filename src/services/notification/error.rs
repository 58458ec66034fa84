//! Notification error types and handling.
//!
//! Provides error types for delivering match notifications,
//! including network issues and configuration problems.

use log::error;
use std::{error::Error, fmt};

use crate::services::storage::StorageError;

/// Represents possible errors during notification operations
#[derive(Debug)]
pub enum NotificationError {
	/// Network-related errors (e.g., webhook failures)
	NetworkError(String),
	/// Configuration-related errors
	ConfigError(String),
	/// Subscriber lookup failures
	StorageError(String),
	/// Internal errors (e.g., failed to sign a payload)
	InternalError(String),
}

impl NotificationError {
	fn format_message(&self) -> String {
		match self {
			Self::NetworkError(msg) => format!("Network error: {}", msg),
			Self::ConfigError(msg) => format!("Config error: {}", msg),
			Self::StorageError(msg) => format!("Storage error: {}", msg),
			Self::InternalError(msg) => format!("Internal error: {}", msg),
		}
	}

	pub fn network_error(msg: impl Into<String>) -> Self {
		let error = Self::NetworkError(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn config_error(msg: impl Into<String>) -> Self {
		let error = Self::ConfigError(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn storage_error(msg: impl Into<String>) -> Self {
		let error = Self::StorageError(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn internal_error(msg: impl Into<String>) -> Self {
		let error = Self::InternalError(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl From<reqwest::Error> for NotificationError {
	fn from(error: reqwest::Error) -> Self {
		Self::network_error(error.to_string())
	}
}

impl From<reqwest_middleware::Error> for NotificationError {
	fn from(error: reqwest_middleware::Error) -> Self {
		Self::network_error(error.to_string())
	}
}

impl From<StorageError> for NotificationError {
	fn from(error: StorageError) -> Self {
		Self::storage_error(error.to_string())
	}
}

impl fmt::Display for NotificationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for NotificationError {}
