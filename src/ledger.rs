use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::roster::SlotId;

/// Per-slot accrual record: hours the teacher owes against the slot,
/// hours actually completed, and the overtime derived from the two.
///
/// `hours_done` never goes below zero and `hours_overtime` is always
/// `max(0, hours_done - hours_due)`; every mutator re-derives it before
/// returning, so the two fields can never drift apart.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HourLedger {
    pub slot: SlotId,
    hours_due: f64,
    hours_done: f64,
    hours_overtime: f64,
    last_change: Option<NaiveDate>,
}

impl HourLedger {
    pub fn new(slot: SlotId, hours_due: f64, created_on: NaiveDate) -> HourLedger {
        let mut ledger = HourLedger {
            slot,
            hours_due: hours_due.max(0.0),
            hours_done: 0.0,
            hours_overtime: 0.0,
            last_change: Some(created_on),
        };
        ledger.recompute_overtime();
        ledger
    }

    pub fn hours_due(&self) -> f64 {
        self.hours_due
    }

    pub fn hours_done(&self) -> f64 {
        self.hours_done
    }

    pub fn hours_overtime(&self) -> f64 {
        self.hours_overtime
    }

    pub fn last_change(&self) -> Option<NaiveDate> {
        self.last_change
    }

    /// Accrues a completed slot's duration.
    pub fn record_completion(&mut self, duration_hours: f64, changed_on: NaiveDate) {
        self.hours_done += duration_hours;
        self.recompute_overtime();
        self.last_change = Some(changed_on);
    }

    /// Takes back a previously accrued duration. Reversing a completion
    /// never drives the ledger negative, even when the duration exceeds
    /// what was accrued.
    pub fn revert_completion(&mut self, duration_hours: f64, changed_on: NaiveDate) {
        self.hours_done = (self.hours_done - duration_hours).max(0.0);
        self.recompute_overtime();
        self.last_change = Some(changed_on);
    }

    /// Re-syncs the due hours from the teacher's live quota. Does not
    /// stamp the change date; only genuine transitions do that.
    pub fn refresh_due(&mut self, quota_hours: f64) {
        self.hours_due = quota_hours.max(0.0);
        self.recompute_overtime();
    }

    fn recompute_overtime(&mut self) {
        self.hours_overtime = (self.hours_done - self.hours_due).max(0.0);
    }
}
