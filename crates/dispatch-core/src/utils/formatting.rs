//! String formatting for log output.

/// Shortens an id for log fields.
///
/// Shows the first 8 characters followed by ".." for longer ids, which is
/// enough to tell UUIDs apart in practice.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((cut, _)) => format!("{}..", &id[..cut]),
		None => id.to_string(),
	}
}
