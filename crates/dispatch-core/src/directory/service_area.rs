//! Service area directory: which zip codes are served, and how fast.

use super::DirectoryError;
use crate::clock::Clock;
use crate::utils::validation_message;
use dispatch_config::ServiceAreaSeed;
use dispatch_storage::StorageService;
use dispatch_types::{CreateServiceAreaRequest, ServiceAreaEntry, StorageKey};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Attempts made by [`ServiceAreaDirectory::upsert`] before giving up.
const MAX_UPSERT_ATTEMPTS: usize = 3;

/// Zip code to delivery-time lookup.
///
/// Entries are keyed by zip code. Registering a zip code again replaces its
/// bounds and keeps the entry id.
pub struct ServiceAreaDirectory {
	storage: Arc<StorageService>,
	clock: Arc<dyn Clock>,
}

impl ServiceAreaDirectory {
	pub fn new(storage: Arc<StorageService>, clock: Arc<dyn Clock>) -> Self {
		Self { storage, clock }
	}

	/// Registers or replaces the bounds of a zip code.
	///
	/// The first registration is an insert-if-absent and later ones swap
	/// against the entry just read, so concurrent registrations of one zip
	/// code agree on a single id.
	pub async fn upsert(
		&self,
		request: CreateServiceAreaRequest,
	) -> Result<ServiceAreaEntry, DirectoryError> {
		request
			.validate()
			.map_err(|e| DirectoryError::Validation(validation_message(&e)))?;

		let namespace = StorageKey::ZipCodes.as_str();
		for attempt in 1..=MAX_UPSERT_ATTEMPTS {
			let existing = self.lookup(&request.zip_code).await?;
			let entry = ServiceAreaEntry {
				id: existing
					.as_ref()
					.map(|e| e.id.clone())
					.unwrap_or_else(|| Uuid::new_v4().to_string()),
				zip_code: request.zip_code.clone(),
				min_delivery_time: request.min_delivery_time,
				max_delivery_time: request.max_delivery_time,
				expected_delivery_time: request.expected_delivery_time,
				created_at: self.clock.now(),
			};

			let written = match &existing {
				None => self.storage.insert_new(namespace, &entry.zip_code, &entry).await,
				Some(current) => {
					self.storage
						.compare_and_swap(namespace, &entry.zip_code, current, &entry)
						.await
				},
			}
			.map_err(|e| DirectoryError::Storage(e.to_string()))?;

			if written {
				tracing::info!(
					zip_code = %entry.zip_code,
					min = entry.min_delivery_time,
					expected = entry.expected_delivery_time,
					max = entry.max_delivery_time,
					"Service area registered"
				);
				return Ok(entry);
			}
			tracing::debug!(
				zip_code = %entry.zip_code,
				attempt,
				"Service area changed while registering, retrying"
			);
		}

		Err(DirectoryError::Conflict(format!("Zip code {}", request.zip_code)))
	}

	/// Returns the entry for a zip code, if it is serviced.
	pub async fn lookup(&self, zip_code: &str) -> Result<Option<ServiceAreaEntry>, DirectoryError> {
		self.storage
			.find(StorageKey::ZipCodes.as_str(), zip_code)
			.await
			.map_err(|e| DirectoryError::Storage(e.to_string()))
	}

	/// Upserts the service areas declared in configuration.
	pub async fn seed(&self, seeds: &[ServiceAreaSeed]) -> Result<usize, DirectoryError> {
		for seed in seeds {
			self.upsert(CreateServiceAreaRequest {
				zip_code: seed.zip_code.clone(),
				min_delivery_time: seed.min_delivery_minutes,
				max_delivery_time: seed.max_delivery_minutes,
				expected_delivery_time: seed.expected_delivery_minutes,
			})
			.await?;
		}
		Ok(seeds.len())
	}
}
