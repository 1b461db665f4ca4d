//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each pluggable backend module (storage, notification) exposes a `Registry`
/// struct implementing this trait, pairing the name used under
/// `[<section>.implementations.<name>]` in the configuration with the factory
/// that builds it.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
