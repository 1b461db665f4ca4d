//! Business directory.

use super::DirectoryError;
use crate::clock::Clock;
use crate::utils::validation_message;
use dispatch_storage::StorageService;
use dispatch_types::{Business, CreateBusinessRequest, StorageKey};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Create and read access to businesses. Businesses are never modified.
pub struct BusinessDirectory {
	storage: Arc<StorageService>,
	clock: Arc<dyn Clock>,
}

impl BusinessDirectory {
	pub fn new(storage: Arc<StorageService>, clock: Arc<dyn Clock>) -> Self {
		Self { storage, clock }
	}

	/// Registers a new business.
	pub async fn create(&self, request: CreateBusinessRequest) -> Result<Business, DirectoryError> {
		request
			.validate()
			.map_err(|e| DirectoryError::Validation(validation_message(&e)))?;

		let business = Business {
			id: Uuid::new_v4().to_string(),
			name: request.name,
			email: request.email,
			phone: request.phone,
			address: request.address,
			created_at: self.clock.now(),
		};
		self.storage
			.store(StorageKey::Businesses.as_str(), &business.id, &business)
			.await
			.map_err(|e| DirectoryError::Storage(e.to_string()))?;

		tracing::info!(business_id = %business.id, name = %business.name, "Business registered");
		Ok(business)
	}

	/// Lists every business, oldest first.
	pub async fn list(&self) -> Result<Vec<Business>, DirectoryError> {
		let mut businesses: Vec<Business> = self
			.storage
			.retrieve_all(StorageKey::Businesses.as_str())
			.await
			.map_err(|e| DirectoryError::Storage(e.to_string()))?;
		businesses.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
		Ok(businesses)
	}

	/// Returns the business or `None` when the id is unknown.
	pub async fn find(&self, id: &str) -> Result<Option<Business>, DirectoryError> {
		self.storage
			.find(StorageKey::Businesses.as_str(), id)
			.await
			.map_err(|e| DirectoryError::Storage(e.to_string()))
	}

	/// Returns the business or `NotFound`.
	pub async fn get(&self, id: &str) -> Result<Business, DirectoryError> {
		self.find(id)
			.await?
			.ok_or(DirectoryError::NotFound("Business"))
	}
}
