//! Read side for orders.
//!
//! Orders only store the ids of their business and driver. The query layer
//! resolves both at read time; a reference to a record that no longer exists
//! resolves to `None`.

use crate::directory::{BusinessDirectory, DriverRegistry};
use crate::handlers::OrderError;
use crate::state::OrderStateMachine;
use dispatch_types::{Business, Driver, Order, OrderFilter, OrderView};
use std::collections::HashMap;
use std::sync::Arc;

/// Joined order reads.
pub struct OrderQuery {
	state_machine: Arc<OrderStateMachine>,
	businesses: Arc<BusinessDirectory>,
	drivers: Arc<DriverRegistry>,
}

impl OrderQuery {
	pub fn new(
		state_machine: Arc<OrderStateMachine>,
		businesses: Arc<BusinessDirectory>,
		drivers: Arc<DriverRegistry>,
	) -> Self {
		Self {
			state_machine,
			businesses,
			drivers,
		}
	}

	/// Lists orders matching every set field of `filter`, oldest first.
	pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<OrderView>, OrderError> {
		let orders = self.state_machine.list_orders().await?;

		let mut businesses: HashMap<String, Option<Business>> = HashMap::new();
		let mut drivers: HashMap<String, Option<Driver>> = HashMap::new();
		let mut views = Vec::new();
		for order in orders.into_iter().filter(|o| matches_filter(o, filter)) {
			let business = match businesses.get(&order.business_id) {
				Some(cached) => cached.clone(),
				None => {
					let found = self.find_business(&order.business_id).await?;
					businesses.insert(order.business_id.clone(), found.clone());
					found
				},
			};
			let driver = match &order.assigned_driver_id {
				None => None,
				Some(id) => match drivers.get(id) {
					Some(cached) => cached.clone(),
					None => {
						let found = self.find_driver(id).await?;
						drivers.insert(id.clone(), found.clone());
						found
					},
				},
			};
			views.push(OrderView {
				order,
				business,
				driver,
			});
		}
		Ok(views)
	}

	/// Returns one order with its references resolved.
	pub async fn get(&self, order_id: &str) -> Result<OrderView, OrderError> {
		let order = self
			.state_machine
			.find_order(order_id)
			.await?
			.ok_or(OrderError::NotFound("Order"))?;
		let business = self.find_business(&order.business_id).await?;
		let driver = match &order.assigned_driver_id {
			Some(id) => self.find_driver(id).await?,
			None => None,
		};
		Ok(OrderView {
			order,
			business,
			driver,
		})
	}

	async fn find_business(&self, id: &str) -> Result<Option<Business>, OrderError> {
		self.businesses
			.find(id)
			.await
			.map_err(|e| OrderError::Storage(e.to_string()))
	}

	async fn find_driver(&self, id: &str) -> Result<Option<Driver>, OrderError> {
		self.drivers
			.find(id)
			.await
			.map_err(|e| OrderError::Storage(e.to_string()))
	}
}

fn matches_filter(order: &Order, filter: &OrderFilter) -> bool {
	let business_ok = filter
		.business_id
		.as_ref()
		.is_none_or(|id| *id == order.business_id);
	let driver_ok = filter
		.driver_id
		.as_ref()
		.is_none_or(|id| order.assigned_driver_id.as_ref() == Some(id));
	business_ok && driver_ok
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::harness;
	use chrono::Duration;
	use dispatch_types::AssignDriverRequest;

	#[tokio::test]
	async fn test_get_joins_business_and_driver() {
		let h = harness();
		let business_id = h.setup(Some("owner@corner-deli.test")).await;
		let driver_id = h.driver("Ana").await;
		let order = h.order(&business_id).await;

		let view = h.engine.order_query().get(&order.id).await.unwrap();
		assert_eq!(view.business.as_ref().map(|b| b.id.as_str()), Some(business_id.as_str()));
		assert!(view.driver.is_none());

		h.engine
			.orders()
			.assign(
				&order.id,
				AssignDriverRequest {
					auto_assign: true,
					driver_id: None,
				},
			)
			.await
			.unwrap();
		let view = h.engine.order_query().get(&order.id).await.unwrap();
		let driver = view.driver.unwrap();
		assert_eq!(driver.id, driver_id);
		assert!(!driver.is_available());
	}

	#[tokio::test]
	async fn test_get_missing_order() {
		let h = harness();
		let err = h.engine.order_query().get("ghost").await.unwrap_err();
		assert!(matches!(err, OrderError::NotFound("Order")));
		assert_eq!(err.to_string(), "Order not found");
	}

	#[tokio::test]
	async fn test_list_filters_are_combined() {
		let h = harness();
		let deli = h.setup(None).await;
		let bakery = h
			.engine
			.businesses()
			.create(dispatch_types::CreateBusinessRequest {
				name: "Bakery".into(),
				email: None,
				phone: None,
				address: None,
			})
			.await
			.unwrap()
			.id;
		let driver_id = h.driver("Ana").await;

		let first = h.order(&deli).await;
		h.clock.advance(Duration::seconds(1));
		let second = h.order(&deli).await;
		h.clock.advance(Duration::seconds(1));
		let third = h.order(&bakery).await;
		h.engine
			.orders()
			.assign(
				&second.id,
				AssignDriverRequest {
					auto_assign: false,
					driver_id: Some(driver_id.clone()),
				},
			)
			.await
			.unwrap();

		let ids = |views: Vec<OrderView>| -> Vec<String> {
			views.into_iter().map(|v| v.order.id).collect()
		};
		let query = h.engine.order_query();

		let all = query.list(&OrderFilter::default()).await.unwrap();
		assert_eq!(ids(all), vec![first.id.clone(), second.id.clone(), third.id.clone()]);

		let by_business = OrderFilter {
			business_id: Some(deli.clone()),
			driver_id: None,
		};
		assert_eq!(
			ids(query.list(&by_business).await.unwrap()),
			vec![first.id.clone(), second.id.clone()]
		);

		let both = OrderFilter {
			business_id: Some(deli),
			driver_id: Some(driver_id.clone()),
		};
		assert_eq!(ids(query.list(&both).await.unwrap()), vec![second.id.clone()]);

		let mismatch = OrderFilter {
			business_id: Some(bakery),
			driver_id: Some(driver_id),
		};
		assert!(query.list(&mismatch).await.unwrap().is_empty());
	}
}
