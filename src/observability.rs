//! Metric name constants. The crate records through the `metrics` facade;
//! installing an exporter is the embedding binary's job.

/// Counter: meetings successfully booked.
pub const BOOKINGS_TOTAL: &str = "huddle_bookings_total";

/// Counter: booking attempts rejected by the conflict resolver.
pub const BOOKING_CONFLICTS_TOTAL: &str = "huddle_booking_conflicts_total";

/// Counter: token verifications and logins that failed.
pub const AUTH_FAILURES_TOTAL: &str = "huddle_auth_failures_total";

/// Counter: requests denied by the capability matrix.
pub const FORBIDDEN_TOTAL: &str = "huddle_forbidden_total";

/// Histogram: snapshot flush duration in seconds.
pub const SNAPSHOT_FLUSH_DURATION_SECONDS: &str = "huddle_snapshot_flush_duration_seconds";

/// Histogram: snapshot group-commit batch size (deltas per flush).
pub const SNAPSHOT_FLUSH_BATCH_SIZE: &str = "huddle_snapshot_flush_batch_size";

/// Counter: snapshot writes that failed.
pub const SNAPSHOT_FLUSH_FAILURES_TOTAL: &str = "huddle_snapshot_flush_failures_total";
