//! Atomic file primitives shared by the stores.

use std::{
	ffi::OsString,
	marker::PhantomData,
	path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use super::error::StorageError;

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
	let mut name = OsString::from(path.as_os_str());
	name.push(".");
	name.push(suffix);
	PathBuf::from(name)
}

/// Location of the previous version of `path`
pub fn backup_path(path: &Path) -> PathBuf {
	with_suffix(path, "bak")
}

async fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
	match tokio::fs::read_to_string(path).await {
		Ok(content) => Ok(Some(content)),
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(StorageError::io(path, e)),
	}
}

/// Replaces `path` with `contents`.
///
/// The data is written and synced to a temporary sibling first; the current
/// file is then moved to `<path>.bak` and the temporary file renamed into place.
/// A crash at any point leaves either the new file, or the old one as backup.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		tokio::fs::create_dir_all(parent)
			.await
			.map_err(|e| StorageError::io(parent, e))?;
	}

	let tmp = with_suffix(path, "tmp");
	let mut file = tokio::fs::File::create(&tmp)
		.await
		.map_err(|e| StorageError::io(&tmp, e))?;
	file.write_all(contents)
		.await
		.map_err(|e| StorageError::io(&tmp, e))?;
	file.sync_all()
		.await
		.map_err(|e| StorageError::io(&tmp, e))?;
	drop(file);

	if tokio::fs::try_exists(path).await.unwrap_or(false) {
		let backup = backup_path(path);
		tokio::fs::rename(path, &backup)
			.await
			.map_err(|e| StorageError::io(&backup, e))?;
	}

	tokio::fs::rename(&tmp, path)
		.await
		.map_err(|e| StorageError::io(path, e))
}

/// Reads and parses `path`, falling back to its backup.
///
/// Returns `Ok(None)` when neither file exists, and `Corrupted` when the
/// surviving files cannot be parsed.
pub async fn read_with_backup<T, F>(path: &Path, parse: F) -> Result<Option<T>, StorageError>
where
	F: Fn(&str) -> Result<T, String>,
{
	let backup = backup_path(path);

	match read_optional(path).await? {
		Some(content) => match parse(&content) {
			Ok(value) => Ok(Some(value)),
			Err(primary_err) => match read_optional(&backup).await? {
				Some(previous) => match parse(&previous) {
					Ok(value) => {
						warn!(
							"{} is unreadable ({}), using backup {}",
							path.display(),
							primary_err,
							backup.display()
						);
						Ok(Some(value))
					}
					Err(_) => Err(StorageError::corrupted(path, primary_err)),
				},
				None => Err(StorageError::corrupted(path, primary_err)),
			},
		},
		// An interrupted write can leave only the backup behind
		None => match read_optional(&backup).await? {
			Some(previous) => parse(&previous)
				.map(Some)
				.map_err(|e| StorageError::corrupted(&backup, e)),
			None => Ok(None),
		},
	}
}

/// A JSON document on disk holding a whole collection.
///
/// There is no caching: every `load` reads the file and every `save` rewrites it.
#[derive(Debug, Clone)]
pub struct JsonDocument<T> {
	path: PathBuf,
	_marker: PhantomData<fn() -> T>,
}

impl<T> JsonDocument<T>
where
	T: Serialize + DeserializeOwned + Default,
{
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			_marker: PhantomData,
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Loads the document, or its default when the store does not exist yet
	pub async fn load(&self) -> Result<T, StorageError> {
		let value = read_with_backup(&self.path, |content| {
			if content.trim().is_empty() {
				return Ok(T::default());
			}
			serde_json::from_str(content).map_err(|e| e.to_string())
		})
		.await?;
		Ok(value.unwrap_or_default())
	}

	pub async fn save(&self, value: &T) -> Result<(), StorageError> {
		let json = serde_json::to_vec_pretty(value)?;
		write_atomic(&self.path, &json).await
	}
}
