//! Common types module for the order dispatch system.
//!
//! This module defines the records, API payloads and configuration validation
//! primitives shared by every dispatch crate, so that storage, the lifecycle
//! engine and the HTTP layer agree on a single wire format.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Business reference data.
pub mod business;
/// Driver records and availability.
pub mod driver;
/// Outbound notification messages.
pub mod notification;
/// Order records, status values and joined views.
pub mod order;
/// Self-registration trait for pluggable implementations.
pub mod registry;
/// Service area (zip code) reference data.
pub mod service_area;
/// Storage namespaces for persisted collections.
pub mod storage;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use business::*;
pub use driver::*;
pub use notification::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use service_area::*;
pub use storage::*;
pub use validation::*;
