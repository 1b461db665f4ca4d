//! Core of the order dispatch system.
//!
//! This crate holds the business logic of the service: the reference-data
//! directories (businesses, drivers, service areas), the order state machine,
//! the lifecycle handler that creates, assigns and advances orders, and the
//! read-side query layer. [`DispatchBuilder`] wires them to a storage backend
//! and a notification transport chosen by configuration.

pub mod builder;
pub mod clock;
pub mod directory;
pub mod engine;
pub mod handlers;
pub mod query;
pub mod state;
pub mod utils;

pub use builder::{BuilderError, DispatchBuilder, DispatchFactories};
pub use clock::{Clock, FixedClock, SystemClock};
pub use directory::{BusinessDirectory, DirectoryError, DriverRegistry, ServiceAreaDirectory};
pub use engine::{DispatchEngine, EngineError};
pub use handlers::{OrderError, OrderHandler};
pub use query::OrderQuery;
pub use state::{OrderStateError, OrderStateMachine};

#[cfg(test)]
pub(crate) mod test_support;
