//! State management for orders.
//!
//! This module provides the state machine that owns the order transition
//! table and the guarded read-modify-write used by every order mutation.

pub mod order;

pub use order::{OrderStateError, OrderStateMachine};
