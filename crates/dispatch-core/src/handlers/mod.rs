//! Handlers for order lifecycle operations.
//!
//! The order handler is the only writer of orders and the only caller of
//! driver claim/release.

pub mod order;

pub use order::{OrderError, OrderHandler};
