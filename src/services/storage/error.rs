//! Storage error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the persistent stores
#[derive(Debug, Error)]
pub enum StorageError {
	/// The file system refused a read or a write
	#[error("I/O error on {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// Neither the store file nor its backup could be parsed
	#[error("Store {path} is corrupted: {message}")]
	Corrupted { path: PathBuf, message: String },

	/// Rejected input, never persisted
	#[error("Invalid input: {0}")]
	InvalidInput(String),

	/// The request conflicts with the stored state; nothing was changed
	#[error("{0}")]
	Conflict(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl StorageError {
	pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Self::Io {
			path: path.into(),
			source,
		}
	}

	pub(crate) fn corrupted(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
		Self::Corrupted {
			path: path.into(),
			message: message.into(),
		}
	}

	/// Whether the caller made a mistake rather than the store failing
	pub fn is_user_error(&self) -> bool {
		matches!(self, Self::InvalidInput(_) | Self::Conflict(_))
	}
}
