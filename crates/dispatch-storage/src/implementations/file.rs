//! File-based storage backend.
//!
//! Each key is stored as one JSON file under a base directory. Writes go to a
//! temporary file that is renamed over the target, so readers never observe a
//! partially written record.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use dispatch_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

const DEFAULT_STORAGE_PATH: &str = "./data/storage";
const EXTENSION: &str = "json";

/// File-based storage implementation.
///
/// Compare-and-swap is serialized through an in-process mutex. It is atomic
/// against other requests of the same process only; two processes sharing a
/// directory are not supported.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
	/// Serializes read-compare-write sequences.
	cas_lock: Mutex<()>,
}

impl FileStorage {
	/// Creates a new FileStorage instance rooted at `base_path`.
	pub fn new(base_path: PathBuf) -> Self {
		Self {
			base_path,
			cas_lock: Mutex::new(()),
		}
	}

	/// Converts a storage key to a filesystem-safe file name (without extension).
	///
	/// ASCII letters, digits and `-` are kept; every other byte becomes `%XX`.
	/// The mapping is injective and preserves prefixes, so prefix scans can
	/// match on the encoded name.
	fn file_stem(key: &str) -> String {
		let mut stem = String::with_capacity(key.len());
		for byte in key.bytes() {
			if byte.is_ascii_alphanumeric() || byte == b'-' {
				stem.push(char::from(byte));
			} else {
				stem.push_str(&format!("%{:02X}", byte));
			}
		}
		stem
	}

	fn get_file_path(&self, key: &str) -> PathBuf {
		self.base_path
			.join(format!("{}.{}", Self::file_stem(key), EXTENSION))
	}

	async fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
		match fs::read(path).await {
			Ok(data) => Ok(Some(data)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn write(&self, path: &Path, value: Vec<u8>) -> Result<(), StorageError> {
		fs::create_dir_all(&self.base_path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.read(&self.get_file_path(key))
			.await?
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let _guard = self.cas_lock.lock().await;
		self.write(&self.get_file_path(key), value).await
	}

	async fn scan(&self, prefix: &str) -> Result<Vec<Vec<u8>>, StorageError> {
		let stem_prefix = Self::file_stem(prefix);
		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let mut matching = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new(EXTENSION)) {
				continue;
			}
			let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
				continue;
			};
			if stem.starts_with(&stem_prefix) {
				matching.push((stem.to_string(), path));
			}
		}
		matching.sort_by(|a, b| a.0.cmp(&b.0));

		let mut values = Vec::with_capacity(matching.len());
		for (_, path) in matching {
			// Deleted between listing and reading
			if let Some(data) = self.read(&path).await? {
				values.push(data);
			} else {
				tracing::debug!("Skipping file {:?}: removed during scan", path);
			}
		}
		Ok(values)
	}

	async fn compare_and_swap(
		&self,
		key: &str,
		expected: Option<Vec<u8>>,
		new_value: Vec<u8>,
	) -> Result<bool, StorageError> {
		let _guard = self.cas_lock.lock().await;
		let path = self.get_file_path(key);
		let current = self.read(&path).await?;
		if current != expected {
			return Ok(false);
		}
		self.write(&path, new_value).await?;
		Ok(true)
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
			vec![Field::new("storage_path", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(path) if !path.trim().is_empty() => Ok(()),
					_ => Err("storage_path cannot be empty".to_string()),
				}
			})],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for file storage (default: "./data/storage")
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

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_values_survive_a_new_instance() {
		let temp_dir = TempDir::new().unwrap();
		let storage = FileStorage::new(temp_dir.path().to_path_buf());
		storage
			.set_bytes("orders:abc", b"{\"id\":\"abc\"}".to_vec())
			.await
			.unwrap();

		let reopened = FileStorage::new(temp_dir.path().to_path_buf());
		assert_eq!(
			reopened.get_bytes("orders:abc").await.unwrap(),
			b"{\"id\":\"abc\"}".to_vec()
		);
		assert!(matches!(
			reopened.get_bytes("orders:missing").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_scan_by_namespace() {
		let temp_dir = TempDir::new().unwrap();
		let storage = FileStorage::new(temp_dir.path().to_path_buf());
		storage.set_bytes("drivers:2", b"d2".to_vec()).await.unwrap();
		storage.set_bytes("drivers:1", b"d1".to_vec()).await.unwrap();
		storage.set_bytes("orders:1", b"o1".to_vec()).await.unwrap();

		let drivers = storage.scan("drivers:").await.unwrap();
		assert_eq!(drivers, vec![b"d1".to_vec(), b"d2".to_vec()]);
	}

	#[tokio::test]
	async fn test_keys_differing_in_separators_do_not_collide() {
		let temp_dir = TempDir::new().unwrap();
		let storage = FileStorage::new(temp_dir.path().to_path_buf());
		storage.set_bytes("zip_codes:1/2", b"slash".to_vec()).await.unwrap();
		storage.set_bytes("zip_codes:1_2", b"underscore".to_vec()).await.unwrap();
		storage.set_bytes("zip_codes:1:2", b"colon".to_vec()).await.unwrap();

		assert_eq!(storage.get_bytes("zip_codes:1/2").await.unwrap(), b"slash".to_vec());
		assert_eq!(
			storage.get_bytes("zip_codes:1_2").await.unwrap(),
			b"underscore".to_vec()
		);
		assert_eq!(storage.get_bytes("zip_codes:1:2").await.unwrap(), b"colon".to_vec());
		assert_eq!(storage.scan("zip_codes:").await.unwrap().len(), 3);
		assert_eq!(
			storage.scan("zip_codes:1_").await.unwrap(),
			vec![b"underscore".to_vec()]
		);
	}

	#[tokio::test]
	async fn test_scan_of_missing_directory_is_empty() {
		let temp_dir = TempDir::new().unwrap();
		let storage = FileStorage::new(temp_dir.path().join("not-created-yet"));
		assert!(storage.scan("orders:").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_compare_and_swap() {
		let temp_dir = TempDir::new().unwrap();
		let storage = FileStorage::new(temp_dir.path().to_path_buf());

		assert!(storage
			.compare_and_swap("drivers:1", None, b"available".to_vec())
			.await
			.unwrap());
		assert!(!storage
			.compare_and_swap("drivers:1", None, b"available".to_vec())
			.await
			.unwrap());
		assert!(storage
			.compare_and_swap("drivers:1", Some(b"available".to_vec()), b"busy".to_vec())
			.await
			.unwrap());
		assert!(!storage
			.compare_and_swap("drivers:1", Some(b"available".to_vec()), b"busy".to_vec())
			.await
			.unwrap());
	}

	#[test]
	fn test_empty_storage_path_rejected() {
		let config: toml::Value = toml::from_str("storage_path = \"  \"").unwrap();
		let result = create_storage(&config);
		assert!(matches!(result, Err(StorageError::Configuration(_))));
	}
}
