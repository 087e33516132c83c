use std::{
    fs::OpenOptions,
    io::{Read, Write},
};

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SCHOOL_REGISTRY_STATE_FILE_NAME: &str = "school_registry_state.json";

use crate::{
    duration::round_hours,
    leave::{LeaveRequest, LeaveRequestError},
    ledger::HourLedger,
    roster::{RosterError, SlotId, StudentId, TeacherId},
    school_registry::{SchoolRegistry, SchoolRegistryError},
    slot::{Slot, SlotState},
};

#[derive(Error, Debug)]
pub enum HoursServiceError {
    #[error("No teacher registered under id {0}.")]
    TeacherNotFound(TeacherId),
    #[error("No student registered under id {0}.")]
    StudentNotFound(StudentId),
    #[error("No slot registered under id {0}.")]
    SlotNotFound(SlotId),
    #[error("No ledger recorded for slot {0}.")]
    LedgerNotFound(SlotId),
    #[error("Scheduling conflict: {0}")]
    SchedulingConflict(SchoolRegistryError),
    #[error("Invalid value: {0}")]
    ValidationError(RosterError),
    #[error("Invalid leave request: {0}")]
    LeaveValidationError(LeaveRequestError),
    #[error("Error during serialization for general state.")]
    SerializationError,
    #[error("Error during opening of registry state file.")]
    RegistryOpenError,
}

/// The reconciliation engine and its external interface.
///
/// Every state-changing method is one `&mut self` call, so the
/// read-previous-state / get-or-create-ledger / arithmetic / write
/// sequence of a reconciliation is a single critical section per
/// service instance; two callers can never interleave inside it and
/// apply their deltas against the same starting value.
#[derive(Serialize, Deserialize)]
pub struct HoursService {
    registry: SchoolRegistry,
}

impl HoursService {
    pub fn new() -> HoursService {
        HoursService {
            registry: SchoolRegistry::new(),
        }
    }

    pub fn registry(&self) -> &SchoolRegistry {
        &self.registry
    }

    pub fn add_teacher(
        &mut self,
        name: String,
        quota_hours: f64,
    ) -> Result<TeacherId, HoursServiceError> {
        self.registry
            .add_teacher(name, quota_hours)
            .map_err(map_registry_error)
    }

    pub fn add_student(
        &mut self,
        name: String,
        level: u8,
        group: Option<String>,
    ) -> Result<StudentId, HoursServiceError> {
        self.registry
            .add_student(name, level, group)
            .map_err(map_registry_error)
    }

    /// External collaborator write; the engine reads the new quota
    /// lazily on the next save of each of the teacher's slots.
    pub fn set_teacher_quota(
        &mut self,
        teacher: TeacherId,
        quota_hours: f64,
    ) -> Result<(), HoursServiceError> {
        let teacher = self
            .registry
            .teacher_mut(teacher)
            .ok_or(HoursServiceError::TeacherNotFound(teacher))?;

        teacher
            .set_quota_hours(quota_hours)
            .map_err(HoursServiceError::ValidationError)
    }

    /// Schedules a new slot and lazily creates its ledger. Both
    /// references are resolved before anything is written.
    pub fn create_slot(
        &mut self,
        teacher: TeacherId,
        student: StudentId,
        weekday: Weekday,
        start: NaiveTime,
        end: NaiveTime,
        today: NaiveDate,
    ) -> Result<SlotId, HoursServiceError> {
        if self.registry.teacher(teacher).is_none() {
            return Err(HoursServiceError::TeacherNotFound(teacher));
        }
        if self.registry.student(student).is_none() {
            return Err(HoursServiceError::StudentNotFound(student));
        }

        let slot_id = self
            .registry
            .insert_slot(teacher, student, weekday, start, end)
            .map_err(map_registry_error)?;

        self.on_slot_saved(slot_id, None, today)?;
        Ok(slot_id)
    }

    /// Applies an operator's completion-state change and reconciles the
    /// slot's ledger in the same call.
    pub fn set_slot_state(
        &mut self,
        slot_id: SlotId,
        new_state: SlotState,
        today: NaiveDate,
    ) -> Result<&HourLedger, HoursServiceError> {
        let slot = self
            .registry
            .slot(slot_id)
            .ok_or(HoursServiceError::SlotNotFound(slot_id))?;
        let teacher = slot.teacher;
        let previous_state = slot.state;

        // Resolve the teacher before touching the slot, so a dangling
        // reference fails without any partial mutation.
        if self.registry.teacher(teacher).is_none() {
            return Err(HoursServiceError::TeacherNotFound(teacher));
        }

        if let Some(slot) = self.registry.slot_mut(slot_id) {
            slot.state = new_state;
        }

        self.on_slot_saved(slot_id, Some(previous_state), today)?;

        self.registry
            .ledger(slot_id)
            .ok_or(HoursServiceError::LedgerNotFound(slot_id))
    }

    /// The reconciliation rule set, run after every slot save.
    ///
    /// `previous` is the persisted completion state before this save,
    /// or `None` when the slot was just created. On creation the ledger
    /// is initialized from the teacher's quota and nothing else happens.
    /// On updates the due hours are re-synced from the live quota; only
    /// a genuine state transition then moves `hours_done` by the slot's
    /// duration and stamps the change date.
    pub fn on_slot_saved(
        &mut self,
        slot_id: SlotId,
        previous: Option<SlotState>,
        today: NaiveDate,
    ) -> Result<(), HoursServiceError> {
        let slot = self
            .registry
            .slot(slot_id)
            .ok_or(HoursServiceError::SlotNotFound(slot_id))?;
        let current_state = slot.state;
        let raw_duration = slot.scheduled_hours();
        let teacher = slot.teacher;

        let quota_hours = self
            .registry
            .teacher(teacher)
            .ok_or(HoursServiceError::TeacherNotFound(teacher))?
            .quota_hours();

        let (ledger, created) = self
            .registry
            .get_or_create_ledger(slot_id, quota_hours, today);
        if created {
            return Ok(());
        }

        let Some(previous) = previous else {
            return Ok(());
        };

        // The quota may have changed since the last save; re-sync even
        // when no transition happened.
        ledger.refresh_due(quota_hours);

        if previous == current_state {
            return Ok(());
        }

        // Slot times are validated upstream; a misordered pair counts
        // as zero hours rather than failing the reconciliation.
        if raw_duration < 0.0 {
            println!(
                "Slot {} has a negative scheduled duration; counting 0 hours.",
                slot_id
            );
        }
        let duration = round_hours(raw_duration.max(0.0));

        match (previous, current_state) {
            (SlotState::NotDone, SlotState::Done) => ledger.record_completion(duration, today),
            (SlotState::Done, SlotState::NotDone) => ledger.revert_completion(duration, today),
            _ => (),
        }

        Ok(())
    }

    pub fn get_ledger(&self, slot_id: SlotId) -> Result<&HourLedger, HoursServiceError> {
        if self.registry.slot(slot_id).is_none() {
            return Err(HoursServiceError::SlotNotFound(slot_id));
        }

        self.registry
            .ledger(slot_id)
            .ok_or(HoursServiceError::LedgerNotFound(slot_id))
    }

    /// Deletes a slot together with its ledger. Deletion is an operator
    /// action; the engine itself never removes slots.
    pub fn remove_slot(&mut self, slot_id: SlotId) -> Result<Slot, HoursServiceError> {
        self.registry
            .remove_slot(slot_id)
            .ok_or(HoursServiceError::SlotNotFound(slot_id))
    }

    pub fn request_leave(
        &mut self,
        teacher: TeacherId,
        reason: String,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<(), HoursServiceError> {
        if self.registry.teacher(teacher).is_none() {
            return Err(HoursServiceError::TeacherNotFound(teacher));
        }

        let request = LeaveRequest::new(teacher, reason, start, end, today)
            .map_err(HoursServiceError::LeaveValidationError)?;

        self.registry.push_leave_request(request);
        Ok(())
    }

    fn serialize_to_json(&self) -> Result<String, HoursServiceError> {
        serde_json::to_string(&self).map_err(|_err| HoursServiceError::SerializationError)
    }

    fn deserialize_from_json(serialized: String) -> Result<Self, HoursServiceError> {
        serde_json::from_str(&serialized).map_err(|_err| HoursServiceError::SerializationError)
    }

    pub fn save_state(&self) -> Result<(), HoursServiceError> {
        let mut file = open_or_create_registry_file_to_write()?;

        let _ = file.write_all(self.serialize_to_json()?.as_bytes());
        Ok(())
    }

    pub fn read_state() -> Result<HoursService, HoursServiceError> {
        let mut file = match open_registry_file_to_read() {
            Ok(file) => file,
            Err(_err) => open_or_create_registry_file_to_write()?,
        };

        let mut serialized_state = String::new();
        let _ = file.read_to_string(&mut serialized_state);

        HoursService::deserialize_from_json(serialized_state)
    }
}

impl Default for HoursService {
    fn default() -> Self {
        Self::new()
    }
}

fn map_registry_error(err: SchoolRegistryError) -> HoursServiceError {
    match err {
        conflict @ SchoolRegistryError::DuplicateSlot(..) => {
            HoursServiceError::SchedulingConflict(conflict)
        }
        SchoolRegistryError::RosterError(roster) => HoursServiceError::ValidationError(roster),
    }
}

fn open_or_create_registry_file_to_write() -> Result<std::fs::File, HoursServiceError> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(SCHOOL_REGISTRY_STATE_FILE_NAME)
        .map_err(|_| HoursServiceError::RegistryOpenError)?;
    Ok(file)
}

fn open_registry_file_to_read() -> Result<std::fs::File, HoursServiceError> {
    let file = OpenOptions::new()
        .read(true)
        .open(SCHOOL_REGISTRY_STATE_FILE_NAME)
        .map_err(|_| HoursServiceError::RegistryOpenError)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, Weekday};

    use crate::{
        roster::{SlotId, TeacherId},
        slot::SlotState,
    };

    use super::{HoursService, HoursServiceError};

    fn at(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
    }

    fn a_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn a_later_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
    }

    fn initialize_mock_service() -> (HoursService, TeacherId, SlotId) {
        let mut service = HoursService::new();
        let teacher = service.add_teacher("Diallo".to_string(), 10.0).unwrap();
        let student = service
            .add_student("Awa".to_string(), 6, Some("A".to_string()))
            .unwrap();
        let slot = service
            .create_slot(teacher, student, Weekday::Mon, at(8), at(10), a_day())
            .unwrap();
        (service, teacher, slot)
    }

    #[test]
    fn slot_creation_initializes_ledger_from_quota() {
        let (service, _teacher, slot) = initialize_mock_service();

        let ledger = service.get_ledger(slot).unwrap();
        assert_eq!(10.0, ledger.hours_due());
        assert_eq!(0.0, ledger.hours_done());
        assert_eq!(0.0, ledger.hours_overtime());
        assert_eq!(Some(a_day()), ledger.last_change());
    }

    #[test]
    fn completion_accrues_the_slot_duration() {
        let (mut service, _teacher, slot) = initialize_mock_service();

        let ledger = service
            .set_slot_state(slot, SlotState::Done, a_later_day())
            .unwrap();
        assert_eq!(2.0, ledger.hours_done());
        assert_eq!(0.0, ledger.hours_overtime());
        assert_eq!(Some(a_later_day()), ledger.last_change());
    }

    #[test]
    fn same_state_save_is_idempotent() {
        let (mut service, _teacher, slot) = initialize_mock_service();

        service
            .set_slot_state(slot, SlotState::Done, a_day())
            .unwrap();
        let ledger = service
            .set_slot_state(slot, SlotState::Done, a_later_day())
            .unwrap();

        assert_eq!(2.0, ledger.hours_done());
        assert_eq!(Some(a_day()), ledger.last_change());
    }

    #[test]
    fn completion_round_trip_returns_to_zero() {
        let (mut service, _teacher, slot) = initialize_mock_service();

        service
            .set_slot_state(slot, SlotState::Done, a_day())
            .unwrap();
        let ledger = service
            .set_slot_state(slot, SlotState::NotDone, a_later_day())
            .unwrap();

        assert_eq!(0.0, ledger.hours_done());
        assert_eq!(0.0, ledger.hours_overtime());
    }

    #[test]
    fn quota_change_is_read_lazily_on_next_save() {
        let (mut service, teacher, slot) = initialize_mock_service();

        service
            .set_slot_state(slot, SlotState::Done, a_day())
            .unwrap();
        service.set_teacher_quota(teacher, 1.0).unwrap();

        // The ledger still carries the quota read at its last save.
        assert_eq!(10.0, service.get_ledger(slot).unwrap().hours_due());

        let ledger = service
            .set_slot_state(slot, SlotState::NotDone, a_later_day())
            .unwrap();
        assert_eq!(1.0, ledger.hours_due());
        assert_eq!(0.0, ledger.hours_done());
        assert_eq!(0.0, ledger.hours_overtime());
    }

    #[test]
    fn same_state_save_still_refreshes_the_quota() {
        let (mut service, teacher, slot) = initialize_mock_service();

        service.set_teacher_quota(teacher, 12.0).unwrap();
        let ledger = service
            .set_slot_state(slot, SlotState::NotDone, a_later_day())
            .unwrap();

        assert_eq!(12.0, ledger.hours_due());
        assert_eq!(0.0, ledger.hours_done());
    }

    #[test]
    fn zero_width_slot_accrues_nothing() {
        let mut service = HoursService::new();
        let teacher = service.add_teacher("Diallo".to_string(), 10.0).unwrap();
        let student = service.add_student("Awa".to_string(), 6, None).unwrap();
        let slot = service
            .create_slot(teacher, student, Weekday::Tue, at(14), at(14), a_day())
            .unwrap();

        let ledger = service
            .set_slot_state(slot, SlotState::Done, a_day())
            .unwrap();
        assert_eq!(0.0, ledger.hours_done());
    }

    #[test]
    fn misordered_slot_times_clamp_to_zero_hours() {
        let mut service = HoursService::new();
        let teacher = service.add_teacher("Diallo".to_string(), 10.0).unwrap();
        let student = service.add_student("Awa".to_string(), 6, None).unwrap();
        let slot = service
            .create_slot(teacher, student, Weekday::Tue, at(10), at(8), a_day())
            .unwrap();

        let ledger = service
            .set_slot_state(slot, SlotState::Done, a_day())
            .unwrap();
        assert_eq!(0.0, ledger.hours_done());
        assert_eq!(0.0, ledger.hours_overtime());
    }

    #[test]
    fn duplicate_slot_is_a_conflict() {
        let (mut service, teacher, _slot) = initialize_mock_service();
        let student = service.add_student("Moussa".to_string(), 6, None).unwrap();

        let duplicate = service.create_slot(teacher, student, Weekday::Mon, at(8), at(10), a_day());
        assert!(matches!(
            duplicate,
            Err(HoursServiceError::SchedulingConflict(_))
        ));
    }

    #[test]
    fn unknown_references_are_not_found() {
        let (mut service, teacher, _slot) = initialize_mock_service();

        assert!(matches!(
            service.set_slot_state(SlotId(99), SlotState::Done, a_day()),
            Err(HoursServiceError::SlotNotFound(_))
        ));
        assert!(matches!(
            service.get_ledger(SlotId(99)),
            Err(HoursServiceError::SlotNotFound(_))
        ));
        assert!(matches!(
            service.set_teacher_quota(TeacherId(99), 5.0),
            Err(HoursServiceError::TeacherNotFound(_))
        ));
        assert!(service.set_teacher_quota(teacher, 5.0).is_ok());
    }

    #[test]
    fn removing_a_slot_drops_its_ledger() {
        let (mut service, _teacher, slot) = initialize_mock_service();

        service.remove_slot(slot).unwrap();
        assert!(matches!(
            service.get_ledger(slot),
            Err(HoursServiceError::SlotNotFound(_))
        ));
    }

    #[test]
    fn state_round_trips_through_json() {
        let (mut service, _teacher, slot) = initialize_mock_service();
        service
            .set_slot_state(slot, SlotState::Done, a_day())
            .unwrap();

        let serialized = service.serialize_to_json().unwrap();
        let mut restored = HoursService::deserialize_from_json(serialized).unwrap();

        let ledger = restored.get_ledger(slot).unwrap();
        assert_eq!(2.0, ledger.hours_done());
        assert_eq!(10.0, ledger.hours_due());

        // Id allocation continues where the snapshot left off.
        let next_teacher = restored.add_teacher("Touré".to_string(), 8.0).unwrap();
        assert_eq!(TeacherId(2), next_teacher);
    }

    #[test]
    fn leave_request_dates_are_validated() {
        let (mut service, teacher, _slot) = initialize_mock_service();

        let inverted = service.request_leave(
            teacher,
            "Maternity".to_string(),
            a_later_day(),
            a_day(),
            a_day(),
        );
        assert!(matches!(
            inverted,
            Err(HoursServiceError::LeaveValidationError(_))
        ));
        assert!(service.registry().leave_requests().is_empty());

        service
            .request_leave(
                teacher,
                "Maternity".to_string(),
                a_day(),
                a_later_day(),
                a_day(),
            )
            .unwrap();
        assert_eq!(1, service.registry().leave_requests().len());
    }
}
