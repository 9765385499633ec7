//! Cuekit Core Type Definitions
//!
//! Defines fundamental types used throughout the project.

// =============================================================================
// ID Types
// =============================================================================

/// Caption unique identifier (ULID)
pub type CaptionId = String;

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

/// Time in whole milliseconds
pub type Millis = i64;

/// Converts seconds to whole milliseconds, rounding half away from zero.
///
/// This is the resolution of the exported cue format; the timeline store
/// evaluates its ordering and overlap rules at this resolution too, so the
/// two can never disagree about a boundary.
pub fn to_millis(seconds: TimeSec) -> Millis {
    (seconds * 1000.0).round() as Millis
}

/// Converts whole milliseconds back to seconds.
pub fn from_millis(millis: Millis) -> TimeSec {
    millis as TimeSec / 1000.0
}

/// Returns true if the value is a usable media time (finite and non-negative)
pub fn is_valid_time_sec(value: TimeSec) -> bool {
    value.is_finite() && value >= 0.0
}

/// Rounds a time to the given number of decimal places.
pub fn round_to_decimals(seconds: TimeSec, decimals: u32) -> TimeSec {
    let factor = 10f64.powi(decimals as i32);
    (seconds * factor).round() / factor
}
