use chrono::NaiveDate;
use uuid::Uuid;

use crate::model::{RoomState, TimeRange};

use super::EngineError;

/// Zero or negative duration is never admissible, occupied room or not.
pub(crate) fn validate_range(range: &TimeRange) -> Result<(), EngineError> {
    if range.start >= range.end {
        return Err(EngineError::InvalidInterval);
    }
    Ok(())
}

/// Scan the room's active meetings on `date` for overlaps with `range`,
/// skipping `exclude` (the meeting being rescheduled, validated against
/// everything but its own prior slot). Collects EVERY colliding meeting so
/// the caller can report all of them at once.
///
/// Caller must hold the room's write lock: the decision is only as good as
/// the snapshot it reads.
pub(crate) fn check_no_conflict(
    rs: &RoomState,
    date: NaiveDate,
    range: &TimeRange,
    exclude: Option<Uuid>,
) -> Result<(), EngineError> {
    let conflicts: Vec<Uuid> = rs
        .active_on(date)
        .filter(|m| Some(m.id) != exclude)
        .filter(|m| m.range().overlaps(range))
        .map(|m| m.id)
        .collect();
    if conflicts.is_empty() {
        Ok(())
    } else {
        metrics::counter!(crate::observability::BOOKING_CONFLICTS_TOTAL).increment(1);
        Err(EngineError::Conflict(conflicts))
    }
}
