//! Order state machine implementation.
//!
//! Orders move `received -> assigned -> picked_up -> out_for_delivery ->
//! delivered`, with `cancelled` reachable from `received` only. Every write
//! goes through [`OrderStateMachine::update_order_with`], which re-reads the
//! order, re-runs the caller's guard and commits with compare-and-swap.

use crate::clock::Clock;
use crate::utils::truncate_id;
use dispatch_storage::StorageService;
use dispatch_types::{Order, OrderStatus, StorageKey};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Attempts made by a guarded update before reporting a conflict.
const MAX_UPDATE_ATTEMPTS: usize = 3;

/// Errors that can occur during order state management.
#[derive(Debug, Error)]
pub enum OrderStateError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Invalid status transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("Order not found: {0}")]
	OrderNotFound(String),
	#[error("Order {0} was modified concurrently")]
	ConcurrentModification(String),
}

/// Static transition table: each state maps to the states it may move to.
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	use OrderStatus::*;

	HashMap::from([
		(Received, HashSet::from([Assigned, Cancelled])),
		// Assigned -> Assigned is a re-assignment to another driver
		(
			Assigned,
			HashSet::from([Assigned, PickedUp, OutForDelivery, Delivered]),
		),
		(PickedUp, HashSet::from([OutForDelivery, Delivered])),
		(OutForDelivery, HashSet::from([Delivered])),
		(Delivered, HashSet::new()),
		(Cancelled, HashSet::new()),
	])
});

/// Manages order state transitions and persistence.
pub struct OrderStateMachine {
	storage: Arc<StorageService>,
	clock: Arc<dyn Clock>,
}

impl OrderStateMachine {
	pub fn new(storage: Arc<StorageService>, clock: Arc<dyn Clock>) -> Self {
		Self { storage, clock }
	}

	/// Checks if a state transition is valid.
	pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
		TRANSITIONS.get(&from).is_some_and(|set| set.contains(&to))
	}

	/// Like [`is_valid_transition`](Self::is_valid_transition), as an error.
	pub fn ensure_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderStateError> {
		if Self::is_valid_transition(from, to) {
			Ok(())
		} else {
			Err(OrderStateError::InvalidTransition { from, to })
		}
	}

	/// Applies `mutate` to the latest stored order and persists the result.
	///
	/// `mutate` may run more than once: when another writer commits between
	/// the read and the write, the order is re-read and `mutate` is applied
	/// again to the fresh copy. Returning `Ok(false)` leaves the order as it
	/// is and returns it unchanged. `updated_at` is refreshed on every write.
	pub async fn update_order_with<F, E>(&self, order_id: &str, mut mutate: F) -> Result<Order, E>
	where
		F: FnMut(&mut Order) -> Result<bool, E>,
		E: From<OrderStateError>,
	{
		for attempt in 1..=MAX_UPDATE_ATTEMPTS {
			let current = self.get_order(order_id).await?;
			let mut updated = current.clone();
			if !mutate(&mut updated)? {
				return Ok(current);
			}
			updated.updated_at = self.clock.now();

			let swapped = self
				.storage
				.compare_and_swap(StorageKey::Orders.as_str(), order_id, &current, &updated)
				.await
				.map_err(|e| OrderStateError::Storage(e.to_string()))?;
			if swapped {
				return Ok(updated);
			}
			tracing::debug!(
				order_id = %truncate_id(order_id),
				attempt,
				"Order changed while updating, retrying"
			);
		}

		tracing::warn!(order_id = %truncate_id(order_id), "Giving up on contended order");
		Err(OrderStateError::ConcurrentModification(order_id.to_string()).into())
	}

	/// Puts `previous` back if storage still holds `written`.
	///
	/// Used to undo a committed write whose follow-up step failed.
	pub async fn restore(&self, written: &Order, previous: &Order) -> Result<bool, OrderStateError> {
		self.storage
			.compare_and_swap(StorageKey::Orders.as_str(), &written.id, written, previous)
			.await
			.map_err(|e| OrderStateError::Storage(e.to_string()))
	}

	/// Gets an order by ID.
	pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderStateError> {
		self.find_order(order_id)
			.await?
			.ok_or_else(|| OrderStateError::OrderNotFound(order_id.to_string()))
	}

	/// Gets an order by ID, `None` when it does not exist.
	pub async fn find_order(&self, order_id: &str) -> Result<Option<Order>, OrderStateError> {
		self.storage
			.find(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|e| OrderStateError::Storage(e.to_string()))
	}

	/// Lists every order, oldest first.
	pub async fn list_orders(&self) -> Result<Vec<Order>, OrderStateError> {
		let mut orders: Vec<Order> = self
			.storage
			.retrieve_all(StorageKey::Orders.as_str())
			.await
			.map_err(|e| OrderStateError::Storage(e.to_string()))?;
		orders.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
		Ok(orders)
	}

	/// Stores a new order. Fails if an order with the same id exists.
	pub async fn store_order(&self, order: &Order) -> Result<(), OrderStateError> {
		let inserted = self
			.storage
			.insert_new(StorageKey::Orders.as_str(), &order.id, order)
			.await
			.map_err(|e| OrderStateError::Storage(e.to_string()))?;
		if inserted {
			Ok(())
		} else {
			Err(OrderStateError::Storage(format!(
				"Order {} already exists",
				order.id
			)))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{sample_order, storage, t0};
	use crate::FixedClock;
	use chrono::Duration;
	use OrderStatus::*;

	fn machine() -> (OrderStateMachine, Arc<FixedClock>) {
		let clock = Arc::new(FixedClock::new(t0()));
		(OrderStateMachine::new(storage(), clock.clone()), clock)
	}

	#[test]
	fn test_transition_table() {
		let allowed = [
			(Received, Assigned),
			(Received, Cancelled),
			(Assigned, Assigned),
			(Assigned, PickedUp),
			(Assigned, OutForDelivery),
			(Assigned, Delivered),
			(PickedUp, OutForDelivery),
			(PickedUp, Delivered),
			(OutForDelivery, Delivered),
		];
		let all = [Received, Assigned, PickedUp, OutForDelivery, Delivered, Cancelled];
		for from in all {
			for to in all {
				assert_eq!(
					OrderStateMachine::is_valid_transition(from, to),
					allowed.contains(&(from, to)),
					"{} -> {}",
					from,
					to
				);
			}
		}
	}

	#[test]
	fn test_transition_error_message() {
		let err = OrderStateMachine::ensure_transition(Delivered, PickedUp).unwrap_err();
		assert_eq!(
			err.to_string(),
			"Invalid status transition from delivered to picked_up"
		);
	}

	#[tokio::test]
	async fn test_update_refreshes_updated_at() {
		let (machine, clock) = machine();
		let order = sample_order("o1", t0());
		machine.store_order(&order).await.unwrap();

		clock.advance(Duration::minutes(3));
		let updated: Order = machine
			.update_order_with::<_, OrderStateError>("o1", |o| {
				o.order_items = "3 bagels".into();
				Ok(true)
			})
			.await
			.unwrap();
		assert_eq!(updated.updated_at, t0() + Duration::minutes(3));
		assert_eq!(machine.get_order("o1").await.unwrap(), updated);
	}

	#[tokio::test]
	async fn test_declined_update_writes_nothing() {
		let (machine, clock) = machine();
		let order = sample_order("o1", t0());
		machine.store_order(&order).await.unwrap();

		clock.advance(Duration::minutes(3));
		let returned = machine
			.update_order_with::<_, OrderStateError>("o1", |_| Ok(false))
			.await
			.unwrap();
		assert_eq!(returned, order);
		assert_eq!(machine.get_order("o1").await.unwrap().updated_at, t0());
	}

	#[tokio::test]
	async fn test_guard_error_aborts() {
		let (machine, _) = machine();
		machine.store_order(&sample_order("o1", t0())).await.unwrap();

		let result = machine
			.update_order_with::<_, OrderStateError>("o1", |o| {
				OrderStateMachine::ensure_transition(o.order_status, Delivered)?;
				o.order_status = Delivered;
				Ok(true)
			})
			.await;
		assert!(matches!(
			result,
			Err(OrderStateError::InvalidTransition {
				from: Received,
				to: Delivered
			})
		));
	}

	#[tokio::test]
	async fn test_missing_order() {
		let (machine, _) = machine();
		let result = machine
			.update_order_with::<_, OrderStateError>("ghost", |_| Ok(true))
			.await;
		assert!(matches!(result, Err(OrderStateError::OrderNotFound(_))));
	}

	#[tokio::test]
	async fn test_duplicate_store_rejected() {
		let (machine, _) = machine();
		let order = sample_order("o1", t0());
		machine.store_order(&order).await.unwrap();
		assert!(machine.store_order(&order).await.is_err());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_concurrent_updates_are_not_lost() {
		let (machine, _) = machine();
		let machine = Arc::new(machine);
		machine.store_order(&sample_order("o1", t0())).await.unwrap();

		// Each writer appends one marker; with retries no append is lost
		// unless a writer gives up with a conflict.
		let handles: Vec<_> = (0..4)
			.map(|i| {
				let machine = Arc::clone(&machine);
				tokio::spawn(async move {
					machine
						.update_order_with::<_, OrderStateError>("o1", |o| {
							o.order_items.push_str(&format!(",{}", i));
							Ok(true)
						})
						.await
				})
			})
			.collect();

		let mut committed = 0;
		for handle in handles {
			match handle.await.unwrap() {
				Ok(_) => committed += 1,
				Err(OrderStateError::ConcurrentModification(_)) => {},
				Err(e) => panic!("unexpected error: {}", e),
			}
		}
		let stored = machine.get_order("o1").await.unwrap();
		assert_eq!(stored.order_items.matches(',').count(), committed);
	}
}
