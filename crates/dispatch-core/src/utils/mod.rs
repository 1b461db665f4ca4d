//! Helpers shared by the core modules.

pub mod formatting;
pub mod validation;

pub use formatting::truncate_id;
pub use validation::validation_message;
