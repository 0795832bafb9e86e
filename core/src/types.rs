//! Shared primitive types used across the entire pipeline.

/// The canonical run identifier.
pub type RunId = String;

/// Sequential complaint identifier, starting at 1 within a run.
pub type ComplaintId = i64;

/// Location sentinel for complaints with no governorate attached.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Round to 3 fractional digits, the precision of every persisted metric.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Round to 2 fractional digits (display precision for percentages).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
