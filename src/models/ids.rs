//! Type aliases for entity IDs. Both are SQLite rowids; validation happens at parse boundaries.

pub type EventId = i64;
pub type BookingId = i64;

/// Parse a path or body value into a positive id, or return an error message. Use at API boundaries.
pub fn parse_positive_id(raw: &str, name: &str) -> Result<i64, String> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        Ok(_) => Err(format!("{} must be a positive integer", name)),
        Err(e) => Err(format!("Invalid {}: {}", name, e)),
    }
}
