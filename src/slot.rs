use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::{
    duration::hours_between,
    roster::{SlotId, StudentId, TeacherId},
};

/// Completion state of a scheduled slot. Transitions are operator
/// triggered saves; there is no timer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotState {
    #[default]
    NotDone,
    Done,
}

/// One scheduled teaching assignment: a teacher meets a student's class
/// on a fixed weekday between two wall-clock times.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub teacher: TeacherId,
    pub student: StudentId,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub state: SlotState,
}

impl Slot {
    pub fn new(
        id: SlotId,
        teacher: TeacherId,
        student: StudentId,
        weekday: Weekday,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Slot {
        Slot {
            id,
            teacher,
            student,
            weekday,
            start,
            end,
            state: SlotState::default(),
        }
    }

    /// Scheduled length of the slot in hours, same-day difference.
    pub fn scheduled_hours(&self) -> f64 {
        hours_between(self.start, self.end)
    }

    /// No teacher may hold two slots on the same weekday with the same
    /// time boundaries; this tuple is the uniqueness key.
    pub fn uniqueness_key(&self) -> (TeacherId, Weekday, NaiveTime, NaiveTime) {
        (self.teacher, self.weekday, self.start, self.end)
    }

    pub fn collides_with(&self, other: &Slot) -> bool {
        self.uniqueness_key() == other.uniqueness_key()
    }
}
