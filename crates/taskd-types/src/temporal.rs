use chrono::{DateTime, Duration, Utc};

/// UTC wall-clock instant used for every record timestamp.
///
/// Serialized as RFC 3339 with full sub-second precision, so a value read
/// back from a snapshot compares equal to the one that was written.
pub type Timestamp = DateTime<Utc>;

/// Current wall-clock time.
pub fn now() -> Timestamp {
    Utc::now()
}

/// A timestamp strictly after `previous`.
///
/// Uses the wall clock when it has moved past `previous`; otherwise (clock
/// resolution, or the clock stepped backwards) returns `previous` plus one
/// nanosecond.
pub fn advance(previous: &Timestamp) -> Timestamp {
    let current = now();
    if current > *previous {
        current
    } else {
        *previous + Duration::nanoseconds(1)
    }
}
