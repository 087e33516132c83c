use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    leave::LeaveRequest,
    ledger::HourLedger,
    roster::{RosterError, SlotId, Student, StudentId, Teacher, TeacherId},
    slot::Slot,
};

#[derive(Error, Debug)]
pub enum SchoolRegistryError {
    #[error("Teacher {0} already holds a slot on {1} from {2} to {3}.")]
    DuplicateSlot(TeacherId, Weekday, NaiveTime, NaiveTime),
    #[error("Error in roster data: {0}")]
    RosterError(RosterError),
}

/// The record store behind the reconciliation engine: id-keyed tables
/// for teachers, students, slots and ledgers, serialized wholesale as
/// the service snapshot. Ledgers are keyed by their owning slot, so one
/// row per slot holds by construction.
#[derive(Serialize, Deserialize)]
pub struct SchoolRegistry {
    teachers: BTreeMap<TeacherId, Teacher>,
    students: BTreeMap<StudentId, Student>,
    slots: BTreeMap<SlotId, Slot>,
    ledgers: BTreeMap<SlotId, HourLedger>,
    leave_requests: Vec<LeaveRequest>,
    next_teacher_id: u64,
    next_student_id: u64,
    next_slot_id: u64,
}

impl SchoolRegistry {
    pub fn new() -> SchoolRegistry {
        SchoolRegistry {
            teachers: BTreeMap::new(),
            students: BTreeMap::new(),
            slots: BTreeMap::new(),
            ledgers: BTreeMap::new(),
            leave_requests: Vec::new(),
            next_teacher_id: 1,
            next_student_id: 1,
            next_slot_id: 1,
        }
    }

    pub fn add_teacher(
        &mut self,
        name: String,
        quota_hours: f64,
    ) -> Result<TeacherId, SchoolRegistryError> {
        let id = TeacherId(self.next_teacher_id);
        let teacher =
            Teacher::new(id, name, quota_hours).map_err(SchoolRegistryError::RosterError)?;

        self.next_teacher_id += 1;
        self.teachers.insert(id, teacher);
        Ok(id)
    }

    pub fn add_student(
        &mut self,
        name: String,
        level: u8,
        group: Option<String>,
    ) -> Result<StudentId, SchoolRegistryError> {
        let id = StudentId(self.next_student_id);
        let student =
            Student::new(id, name, level, group).map_err(SchoolRegistryError::RosterError)?;

        self.next_student_id += 1;
        self.students.insert(id, student);
        Ok(id)
    }

    pub fn teacher(&self, id: TeacherId) -> Option<&Teacher> {
        self.teachers.get(&id)
    }

    pub fn teacher_mut(&mut self, id: TeacherId) -> Option<&mut Teacher> {
        self.teachers.get_mut(&id)
    }

    pub fn student(&self, id: StudentId) -> Option<&Student> {
        self.students.get(&id)
    }

    /// Inserts a new slot, enforcing the (teacher, weekday, start, end)
    /// uniqueness tuple.
    pub fn insert_slot(
        &mut self,
        teacher: TeacherId,
        student: StudentId,
        weekday: Weekday,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<SlotId, SchoolRegistryError> {
        let id = SlotId(self.next_slot_id);
        let candidate = Slot::new(id, teacher, student, weekday, start, end);

        if self
            .slots
            .values()
            .any(|existing| existing.collides_with(&candidate))
        {
            return Err(SchoolRegistryError::DuplicateSlot(
                teacher, weekday, start, end,
            ));
        }

        self.next_slot_id += 1;
        self.slots.insert(id, candidate);
        Ok(id)
    }

    pub fn slot(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(&id)
    }

    pub fn slot_mut(&mut self, id: SlotId) -> Option<&mut Slot> {
        self.slots.get_mut(&id)
    }

    pub fn ledger(&self, slot: SlotId) -> Option<&HourLedger> {
        self.ledgers.get(&slot)
    }

    /// Atomic get-or-create of the ledger row for a slot. There are no
    /// separate lookup and insert steps for callers to interleave; a
    /// second creation attempt resolves to the existing row.
    pub fn get_or_create_ledger(
        &mut self,
        slot: SlotId,
        default_due: f64,
        today: NaiveDate,
    ) -> (&mut HourLedger, bool) {
        let mut created = false;
        let ledger = self.ledgers.entry(slot).or_insert_with(|| {
            created = true;
            HourLedger::new(slot, default_due, today)
        });
        (ledger, created)
    }

    /// Removes a slot and cascades to its ledger; the slot owns the row.
    pub fn remove_slot(&mut self, id: SlotId) -> Option<Slot> {
        let removed = self.slots.remove(&id);
        if removed.is_some() {
            self.ledgers.remove(&id);
        }
        removed
    }

    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    pub fn ledgers(&self) -> impl Iterator<Item = &HourLedger> {
        self.ledgers.values()
    }

    pub fn push_leave_request(&mut self, request: LeaveRequest) {
        self.leave_requests.push(request);
    }

    pub fn leave_requests(&self) -> &[LeaveRequest] {
        &self.leave_requests
    }
}

impl Default for SchoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, Weekday};

    use super::SchoolRegistry;

    fn at(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
    }

    fn a_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn duplicate_slot_tuple_is_rejected() {
        let mut registry = SchoolRegistry::new();
        let teacher = registry.add_teacher("Diallo".to_string(), 10.0).unwrap();
        let student = registry
            .add_student("Awa".to_string(), 6, Some("A".to_string()))
            .unwrap();

        registry
            .insert_slot(teacher, student, Weekday::Mon, at(8), at(10))
            .unwrap();
        let second = registry.insert_slot(teacher, student, Weekday::Mon, at(8), at(10));
        assert!(second.is_err());

        let shifted = registry.insert_slot(teacher, student, Weekday::Mon, at(10), at(12));
        assert!(shifted.is_ok());
    }

    #[test]
    fn get_or_create_ledger_is_idempotent() {
        let mut registry = SchoolRegistry::new();
        let teacher = registry.add_teacher("Diallo".to_string(), 10.0).unwrap();
        let student = registry.add_student("Awa".to_string(), 6, None).unwrap();
        let slot = registry
            .insert_slot(teacher, student, Weekday::Mon, at(8), at(10))
            .unwrap();

        let (_, created_first) = registry.get_or_create_ledger(slot, 10.0, a_day());
        assert!(created_first);

        let (ledger, created_again) = registry.get_or_create_ledger(slot, 99.0, a_day());
        assert!(!created_again);
        assert_eq!(10.0, ledger.hours_due());
    }

    #[test]
    fn removing_a_slot_cascades_to_its_ledger() {
        let mut registry = SchoolRegistry::new();
        let teacher = registry.add_teacher("Diallo".to_string(), 10.0).unwrap();
        let student = registry.add_student("Awa".to_string(), 6, None).unwrap();
        let slot = registry
            .insert_slot(teacher, student, Weekday::Mon, at(8), at(10))
            .unwrap();
        registry.get_or_create_ledger(slot, 10.0, a_day());

        assert!(registry.remove_slot(slot).is_some());
        assert!(registry.ledger(slot).is_none());
        assert!(registry.remove_slot(slot).is_none());
    }
}
