//! Storage-related types for the dispatch system.

use std::str::FromStr;

/// Storage namespaces for the persisted collections.
///
/// Replaces string literals at call sites so that every component reads and
/// writes the same namespace names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Business records keyed by id.
	Businesses,
	/// Driver records keyed by id.
	Drivers,
	/// Service area entries keyed by zip code.
	ZipCodes,
	/// Order records keyed by id.
	Orders,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Businesses => "businesses",
			StorageKey::Drivers => "drivers",
			StorageKey::ZipCodes => "zip_codes",
			StorageKey::Orders => "orders",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Businesses, Self::Drivers, Self::ZipCodes, Self::Orders].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"businesses" => Ok(Self::Businesses),
			"drivers" => Ok(Self::Drivers),
			"zip_codes" => Ok(Self::ZipCodes),
			"orders" => Ok(Self::Orders),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
