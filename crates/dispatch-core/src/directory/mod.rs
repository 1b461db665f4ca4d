//! Reference data and the driver registry.
//!
//! Businesses and service areas are plain create/read collections. Drivers
//! additionally carry an availability flag that only changes through
//! [`DriverRegistry::claim`] and [`DriverRegistry::release`].

pub mod business;
pub mod driver;
pub mod service_area;

pub use business::BusinessDirectory;
pub use driver::DriverRegistry;
pub use service_area::ServiceAreaDirectory;

use thiserror::Error;

/// Errors that can occur in the directories.
#[derive(Debug, Error)]
pub enum DirectoryError {
	/// The request payload failed validation.
	#[error("{0}")]
	Validation(String),
	/// The referenced record does not exist.
	#[error("{0} not found")]
	NotFound(&'static str),
	/// A compare-and-swap kept losing to other writers.
	#[error("{0} was modified concurrently")]
	Conflict(String),
	/// The storage backend failed.
	#[error("Storage error: {0}")]
	Storage(String),
}

