//! Flattening of `validator` errors into a single client-facing message.

use validator::ValidationErrors;

/// Joins the messages of every failed rule, sorted for a stable output.
///
/// Rules without a custom message fall back to `"<field> is invalid"`.
pub fn validation_message(errors: &ValidationErrors) -> String {
	let mut messages: Vec<String> = errors
		.field_errors()
		.iter()
		.flat_map(|(field, field_errors)| {
			field_errors.iter().map(move |error| match &error.message {
				Some(message) => message.to_string(),
				None => format!("{} is invalid", field),
			})
		})
		.collect();
	messages.sort();
	messages.dedup();
	messages.join("; ")
}
