use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roster::TeacherId;

#[derive(Error, Debug)]
pub enum LeaveRequestError {
    #[error("Invalid leave dates: end {end} is before start {start}.")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

/// A teacher's leave request over a closed date range. Rejected before
/// any mutation when the range is inverted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub teacher: TeacherId,
    pub reason: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub requested_on: NaiveDate,
}

impl LeaveRequest {
    pub fn new(
        teacher: TeacherId,
        reason: String,
        start: NaiveDate,
        end: NaiveDate,
        requested_on: NaiveDate,
    ) -> Result<LeaveRequest, LeaveRequestError> {
        if end < start {
            return Err(LeaveRequestError::EndBeforeStart { start, end });
        }

        Ok(LeaveRequest {
            teacher,
            reason,
            start,
            end,
            requested_on,
        })
    }
}
