use chrono::NaiveTime;

/// Signed same-day difference between two times of day, in hours.
///
/// Both times are taken to fall on the same calendar day, so a slot that
/// ends before it starts yields a negative value. Callers that persist
/// the result are expected to clamp and round it themselves.
pub fn hours_between(start: NaiveTime, end: NaiveTime) -> f64 {
    (end - start).num_seconds() as f64 / 3600.0
}

/// Rounds an hour value to two decimal places, the resolution every
/// persisted duration is stored at.
pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}
