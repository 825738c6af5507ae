//! File-based storage backend.
//!
//! Each key is one JSON file under the configured directory. Writes go to a
//! temporary file first and are renamed into place, so a crash mid-write
//! never leaves a truncated document behind.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use orderbot_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

const DEFAULT_STORAGE_PATH: &str = "./data";

pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Maps a key to a filesystem-safe path, e.g. `ledger:blocked_users`
	/// becomes `<base>/ledger_blocked_users.json`.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', '\\', ':'], "_");
		self.base_path.join(format!("{}.json", safe_key))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.get_file_path(key);
		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		let temp_path = path.with_extension("json.tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		debug!(path = %path.display(), "Wrote storage file");
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		fs::try_exists(self.get_file_path(key))
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("storage_path", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(path) if path.trim().is_empty() => {
							Err("storage_path cannot be empty".to_string())
						},
						_ => Ok(()),
					}
				}),
			],
		);
		schema.validate(config)
	}
}

/// Builds a file backend from its config table.
///
/// Configuration parameters:
/// - `storage_path`: directory holding the documents (default: "./data")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_write_read_overwrite() {
		let dir = TempDir::new().unwrap();
		let storage = FileStorage::new(dir.path().to_path_buf());

		assert!(!storage.exists("ledger:blocked_users").await.unwrap());
		storage
			.set_bytes("ledger:blocked_users", b"{}".to_vec())
			.await
			.unwrap();

		assert!(dir.path().join("ledger_blocked_users.json").exists());
		assert!(!dir.path().join("ledger_blocked_users.json.tmp").exists());
		assert_eq!(
			storage.get_bytes("ledger:blocked_users").await.unwrap(),
			b"{}".to_vec()
		);

		assert!(storage.exists("ledger:blocked_users").await.unwrap());

		storage
			.set_bytes("ledger:blocked_users", b"{\"a\":1}".to_vec())
			.await
			.unwrap();
		assert_eq!(
			storage.get_bytes("ledger:blocked_users").await.unwrap(),
			b"{\"a\":1}".to_vec()
		);
		assert!(matches!(
			storage.get_bytes("ledger:other").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_creates_missing_directory() {
		let dir = TempDir::new().unwrap();
		let nested = dir.path().join("state").join("relay");
		let storage = FileStorage::new(nested.clone());

		storage.set_bytes("ledger:doc", b"[]".to_vec()).await.unwrap();
		assert!(nested.join("ledger_doc.json").exists());
	}

	#[test]
	fn test_factory_validates_config() {
		let ok: toml::Value = toml::from_str(r#"storage_path = "/tmp/relay""#).unwrap();
		assert!(create_storage(&ok).is_ok());

		let empty: toml::Value = toml::from_str(r#"storage_path = " ""#).unwrap();
		assert!(matches!(
			create_storage(&empty),
			Err(StorageError::Configuration(_))
		));

		let wrong: toml::Value = toml::from_str("storage_path = 3").unwrap();
		assert!(create_storage(&wrong).is_err());
	}
}
