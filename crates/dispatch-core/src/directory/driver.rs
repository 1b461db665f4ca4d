//! Driver registry.
//!
//! Availability is a single flag per driver. Flipping it is always a
//! compare-and-swap against the record the caller last saw, so two requests
//! racing for the same driver cannot both win.

use super::DirectoryError;
use crate::clock::Clock;
use crate::utils::{truncate_id, validation_message};
use dispatch_storage::StorageService;
use dispatch_types::{CreateDriverRequest, Driver, DriverAvailability, StorageKey};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Attempts made by [`DriverRegistry::release`] before giving up.
const MAX_RELEASE_ATTEMPTS: usize = 3;

/// Registry of drivers and their availability.
pub struct DriverRegistry {
	storage: Arc<StorageService>,
	clock: Arc<dyn Clock>,
}

impl DriverRegistry {
	pub fn new(storage: Arc<StorageService>, clock: Arc<dyn Clock>) -> Self {
		Self { storage, clock }
	}

	/// Registers a new driver as available.
	pub async fn create(&self, request: CreateDriverRequest) -> Result<Driver, DirectoryError> {
		request
			.validate()
			.map_err(|e| DirectoryError::Validation(validation_message(&e)))?;

		let now = self.clock.now();
		let driver = Driver {
			id: Uuid::new_v4().to_string(),
			name: request.name,
			phone: request.phone,
			email: request.email,
			vehicle: request.vehicle,
			availability_status: DriverAvailability::Available,
			created_at: now,
			updated_at: now,
		};
		self.storage
			.store(StorageKey::Drivers.as_str(), &driver.id, &driver)
			.await
			.map_err(|e| DirectoryError::Storage(e.to_string()))?;

		tracing::info!(driver_id = %driver.id, name = %driver.name, "Driver registered");
		Ok(driver)
	}

	/// Lists every driver, oldest first.
	pub async fn list(&self) -> Result<Vec<Driver>, DirectoryError> {
		let mut drivers: Vec<Driver> = self
			.storage
			.retrieve_all(StorageKey::Drivers.as_str())
			.await
			.map_err(|e| DirectoryError::Storage(e.to_string()))?;
		drivers.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
		Ok(drivers)
	}

	/// Lists available drivers in the same order as [`list`](Self::list).
	pub async fn list_available(&self) -> Result<Vec<Driver>, DirectoryError> {
		let mut drivers = self.list().await?;
		drivers.retain(Driver::is_available);
		Ok(drivers)
	}

	/// Returns the driver or `None` when the id is unknown.
	pub async fn find(&self, id: &str) -> Result<Option<Driver>, DirectoryError> {
		self.storage
			.find(StorageKey::Drivers.as_str(), id)
			.await
			.map_err(|e| DirectoryError::Storage(e.to_string()))
	}

	/// Returns the driver or `NotFound`.
	pub async fn get(&self, id: &str) -> Result<Driver, DirectoryError> {
		self.find(id).await?.ok_or(DirectoryError::NotFound("Driver"))
	}

	/// Marks `driver` busy if it is still exactly as the caller read it.
	///
	/// Returns `None` when the snapshot is not available or another writer
	/// changed the record first. Nothing is retried: a lost claim means the
	/// driver is taken.
	pub async fn claim(&self, driver: &Driver) -> Result<Option<Driver>, DirectoryError> {
		if !driver.is_available() {
			return Ok(None);
		}

		let mut busy = driver.clone();
		busy.availability_status = DriverAvailability::Busy;
		busy.updated_at = self.clock.now();

		let swapped = self
			.storage
			.compare_and_swap(StorageKey::Drivers.as_str(), &driver.id, driver, &busy)
			.await
			.map_err(|e| DirectoryError::Storage(e.to_string()))?;

		if swapped {
			tracing::debug!(driver_id = %truncate_id(&driver.id), "Driver claimed");
			Ok(Some(busy))
		} else {
			tracing::debug!(driver_id = %truncate_id(&driver.id), "Driver claim lost");
			Ok(None)
		}
	}

	/// Marks a driver available again.
	///
	/// Releasing an available driver is a no-op.
	pub async fn release(&self, driver_id: &str) -> Result<Driver, DirectoryError> {
		for attempt in 1..=MAX_RELEASE_ATTEMPTS {
			let current = self.get(driver_id).await?;
			if current.is_available() {
				return Ok(current);
			}

			let mut available = current.clone();
			available.availability_status = DriverAvailability::Available;
			available.updated_at = self.clock.now();

			let swapped = self
				.storage
				.compare_and_swap(StorageKey::Drivers.as_str(), driver_id, &current, &available)
				.await
				.map_err(|e| DirectoryError::Storage(e.to_string()))?;
			if swapped {
				tracing::debug!(driver_id = %truncate_id(driver_id), "Driver released");
				return Ok(available);
			}
			tracing::debug!(
				driver_id = %truncate_id(driver_id),
				attempt,
				"Driver changed during release, retrying"
			);
		}

		Err(DirectoryError::Conflict(format!("Driver {}", driver_id)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{storage, t0};
	use crate::FixedClock;
	use chrono::Duration;

	fn registry() -> (DriverRegistry, Arc<FixedClock>) {
		let clock = Arc::new(FixedClock::new(t0()));
		(DriverRegistry::new(storage(), clock.clone()), clock)
	}

	fn request(name: &str) -> CreateDriverRequest {
		CreateDriverRequest {
			name: name.into(),
			phone: Some("555-0100".into()),
			email: None,
			vehicle: Some("bike".into()),
		}
	}

	#[tokio::test]
	async fn test_new_driver_is_available() {
		let (registry, _) = registry();
		let driver = registry.create(request("Ana")).await.unwrap();
		assert!(driver.is_available());
		assert_eq!(registry.list_available().await.unwrap(), vec![driver]);
	}

	#[tokio::test]
	async fn test_claim_with_stale_snapshot_loses() {
		let (registry, _) = registry();
		let driver = registry.create(request("Ana")).await.unwrap();

		let claimed = registry.claim(&driver).await.unwrap().unwrap();
		assert_eq!(claimed.availability_status, DriverAvailability::Busy);
		assert!(registry.claim(&driver).await.unwrap().is_none());
		assert!(registry.claim(&claimed).await.unwrap().is_none());
		assert!(registry.list_available().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_release_restores_availability() {
		let (registry, clock) = registry();
		let driver = registry.create(request("Ana")).await.unwrap();
		registry.claim(&driver).await.unwrap().unwrap();

		clock.advance(Duration::minutes(10));
		let released = registry.release(&driver.id).await.unwrap();
		assert!(released.is_available());
		assert_eq!(released.updated_at, t0() + Duration::minutes(10));

		// Second release is a no-op
		let again = registry.release(&driver.id).await.unwrap();
		assert_eq!(again, released);
	}

	#[tokio::test]
	async fn test_release_of_unknown_driver() {
		let (registry, _) = registry();
		let err = registry.release("ghost").await.unwrap_err();
		assert!(matches!(err, DirectoryError::NotFound("Driver")));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_concurrent_claims_have_one_winner() {
		let (registry, _) = registry();
		let registry = Arc::new(registry);
		let driver = registry.create(request("Ana")).await.unwrap();

		let handles: Vec<_> = (0..8)
			.map(|_| {
				let registry = Arc::clone(&registry);
				let driver = driver.clone();
				tokio::spawn(async move { registry.claim(&driver).await.unwrap() })
			})
			.collect();

		let mut winners = 0;
		for handle in handles {
			if handle.await.unwrap().is_some() {
				winners += 1;
			}
		}
		assert_eq!(winners, 1);
	}
}
