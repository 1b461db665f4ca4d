//! Fixtures shared by the unit tests of this crate.

use crate::{DispatchEngine, FixedClock};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use dispatch_config::ConfigBuilder;
use dispatch_notification::implementations::log::LogNotifier;
use dispatch_notification::{NotificationInterface, NotificationService};
use dispatch_storage::implementations::memory::MemoryStorage;
use dispatch_storage::{StorageError, StorageInterface, StorageService};
use dispatch_types::{
	ConfigSchema, CreateBusinessRequest, CreateDriverRequest, CreateOrderRequest,
	CreateServiceAreaRequest, Order, OrderStatus,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) fn t0() -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub(crate) fn storage() -> Arc<StorageService> {
	Arc::new(StorageService::new(Box::new(MemoryStorage::new())))
}

pub(crate) fn sample_order(id: &str, at: DateTime<Utc>) -> Order {
	Order {
		id: id.to_string(),
		business_id: "b1".into(),
		customer_name: "Dana".into(),
		customer_phone: None,
		delivery_address: "12 Elm St".into(),
		customer_zip_code: "10001".into(),
		order_items: "2 bagels".into(),
		order_status: OrderStatus::Received,
		assigned_driver_id: None,
		min_delivery_time: at,
		max_delivery_time: at,
		expected_delivery_time: at,
		actual_delivery_time: None,
		created_at: at,
		updated_at: at,
	}
}

/// Engine on in-memory storage with a pinned clock.
pub(crate) struct Harness {
	pub engine: DispatchEngine,
	pub clock: Arc<FixedClock>,
}

pub(crate) fn harness() -> Harness {
	harness_with_notifier(Box::new(LogNotifier))
}

pub(crate) fn harness_with_notifier(notifier: Box<dyn NotificationInterface>) -> Harness {
	build_harness(storage(), notifier)
}

pub(crate) fn harness_with_storage(backend: Box<dyn StorageInterface>) -> Harness {
	build_harness(
		Arc::new(StorageService::new(backend)),
		Box::new(LogNotifier),
	)
}

fn build_harness(
	storage: Arc<StorageService>,
	notifier: Box<dyn NotificationInterface>,
) -> Harness {
	let clock = Arc::new(FixedClock::new(t0()));
	let engine = DispatchEngine::new(
		ConfigBuilder::new().build(),
		storage,
		Arc::new(NotificationService::new(notifier, 4)),
		clock.clone(),
	);
	Harness { engine, clock }
}

/// Memory storage whose compare-and-swap on keys under `prefix` reports a
/// lost race once the returned switch is turned on.
pub(crate) struct FailingSwap {
	inner: MemoryStorage,
	prefix: &'static str,
	failing: Arc<AtomicBool>,
}

impl FailingSwap {
	pub fn new(prefix: &'static str) -> (Self, Arc<AtomicBool>) {
		let failing = Arc::new(AtomicBool::new(false));
		let storage = Self {
			inner: MemoryStorage::new(),
			prefix,
			failing: Arc::clone(&failing),
		};
		(storage, failing)
	}
}

#[async_trait]
impl StorageInterface for FailingSwap {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.inner.get_bytes(key).await
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.inner.set_bytes(key, value).await
	}

	async fn scan(&self, prefix: &str) -> Result<Vec<Vec<u8>>, StorageError> {
		self.inner.scan(prefix).await
	}

	async fn compare_and_swap(
		&self,
		key: &str,
		expected: Option<Vec<u8>>,
		new_value: Vec<u8>,
	) -> Result<bool, StorageError> {
		if self.failing.load(Ordering::SeqCst) && key.starts_with(self.prefix) {
			return Ok(false);
		}
		self.inner.compare_and_swap(key, expected, new_value).await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		self.inner.config_schema()
	}
}

impl Harness {
	/// Registers zip 10001 (30/60/45) and a business, returns the business id.
	pub async fn setup(&self, email: Option<&str>) -> String {
		self.engine
			.service_areas()
			.upsert(CreateServiceAreaRequest {
				zip_code: "10001".into(),
				min_delivery_time: 30,
				max_delivery_time: 60,
				expected_delivery_time: 45,
			})
			.await
			.unwrap();
		self.engine
			.businesses()
			.create(CreateBusinessRequest {
				name: "Corner Deli".into(),
				email: email.map(str::to_string),
				phone: None,
				address: None,
			})
			.await
			.unwrap()
			.id
	}

	pub async fn driver(&self, name: &str) -> String {
		self.engine
			.drivers()
			.create(CreateDriverRequest {
				name: name.into(),
				phone: None,
				email: None,
				vehicle: None,
			})
			.await
			.unwrap()
			.id
	}

	pub fn order_request(&self, business_id: &str, zip: &str) -> CreateOrderRequest {
		CreateOrderRequest {
			business_id: business_id.to_string(),
			customer_name: "Dana".into(),
			customer_phone: Some("555-0199".into()),
			delivery_address: "12 Elm St".into(),
			customer_zip_code: zip.to_string(),
			order_items: "2 bagels".into(),
		}
	}

	pub async fn order(&self, business_id: &str) -> Order {
		self.engine
			.orders()
			.create(self.order_request(business_id, "10001"))
			.await
			.unwrap()
	}
}
