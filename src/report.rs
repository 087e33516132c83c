use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveTime, Weekday};
use serde::Serialize;

use crate::{
    duration::round_hours,
    hours_service::HoursService,
    roster::{SlotId, TeacherId},
    slot::SlotState,
};

/// Scope of a section report: every level, or a single one. Operator
/// input that is not a number means "all".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionFilter {
    All,
    Level(u8),
}

impl SectionFilter {
    pub fn parse(raw: &str) -> SectionFilter {
        match raw.trim().parse::<u8>() {
            Ok(level) => SectionFilter::Level(level),
            Err(_) => SectionFilter::All,
        }
    }

    fn matches(&self, level: u8) -> bool {
        match self {
            SectionFilter::All => true,
            SectionFilter::Level(wanted) => level == *wanted,
        }
    }
}

/// Rolled-up hours for one (level, class group) pair.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassHours {
    pub level: u8,
    pub group: Option<String>,
    pub class_count: usize,
    pub hours_due: f64,
    pub hours_done: f64,
    pub hours_overtime: f64,
    pub ratio: f64,
}

/// Rolled-up hours for one level, ignoring class groups.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LevelHours {
    pub level: u8,
    pub hours_due: f64,
    pub hours_done: f64,
    pub hours_overtime: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SectionReport {
    pub rows: Vec<ClassHours>,
    pub level_totals: Vec<LevelHours>,
}

#[derive(Default)]
struct HourSums {
    groups: BTreeSet<String>,
    due: f64,
    done: f64,
    overtime: f64,
}

/// Groups every ledger by the level and class of its slot's student and
/// sums the hour columns, plus level-only totals over the same filter.
/// Pure read; an empty registry yields an empty report.
pub fn report_by_section(service: &HoursService, filter: SectionFilter) -> SectionReport {
    let registry = service.registry();
    let mut by_class: BTreeMap<(u8, Option<String>), HourSums> = BTreeMap::new();
    let mut by_level: BTreeMap<u8, HourSums> = BTreeMap::new();

    for ledger in registry.ledgers() {
        let Some(slot) = registry.slot(ledger.slot) else {
            continue;
        };
        let Some(student) = registry.student(slot.student) else {
            continue;
        };
        if !filter.matches(student.level) {
            continue;
        }

        let class_sums = by_class
            .entry((student.level, student.group.clone()))
            .or_default();
        if let Some(group) = &student.group {
            class_sums.groups.insert(group.clone());
        }
        class_sums.due += ledger.hours_due();
        class_sums.done += ledger.hours_done();
        class_sums.overtime += ledger.hours_overtime();

        let level_sums = by_level.entry(student.level).or_default();
        level_sums.due += ledger.hours_due();
        level_sums.done += ledger.hours_done();
        level_sums.overtime += ledger.hours_overtime();
    }

    let rows = by_class
        .into_iter()
        .map(|((level, group), sums)| ClassHours {
            level,
            group,
            class_count: sums.groups.len(),
            hours_due: sums.due,
            hours_done: sums.done,
            hours_overtime: sums.overtime,
            ratio: safe_ratio(sums.done, sums.due),
        })
        .collect();

    let level_totals = by_level
        .into_iter()
        .map(|(level, sums)| LevelHours {
            level,
            hours_due: sums.due,
            hours_done: sums.done,
            hours_overtime: sums.overtime,
        })
        .collect();

    SectionReport { rows, level_totals }
}

/// One teacher's hours across all of their slots, with overtime derived
/// against the single weekly quota rather than per ledger.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TeacherHours {
    pub teacher: TeacherId,
    pub quota_hours: f64,
    pub hours_done: f64,
    pub hours_overtime: f64,
}

pub fn teacher_hours(service: &HoursService, teacher: TeacherId) -> Option<TeacherHours> {
    let registry = service.registry();
    let quota_hours = registry.teacher(teacher)?.quota_hours();

    let hours_done = registry
        .ledgers()
        .filter(|ledger| {
            registry
                .slot(ledger.slot)
                .is_some_and(|slot| slot.teacher == teacher)
        })
        .fold(0.0, |acc, ledger| acc + ledger.hours_done());

    Some(TeacherHours {
        teacher,
        quota_hours,
        hours_done,
        hours_overtime: (hours_done - quota_hours).max(0.0),
    })
}

/// One row of the per-day schedule view: a slot joined to its ledger,
/// with zeros when no ledger exists yet.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DayScheduleRow {
    pub slot: SlotId,
    pub teacher_name: String,
    pub student_name: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub state: SlotState,
    pub hours_due: f64,
    pub hours_done: f64,
    pub hours_overtime: f64,
    pub ratio: f64,
}

/// The slots of one level on one weekday, each with its ledger figures.
/// The weekday is an explicit parameter; defaulting to "today" is the
/// caller's concern, resolved once at the boundary.
pub fn day_schedule(service: &HoursService, level: u8, weekday: Weekday) -> Vec<DayScheduleRow> {
    let registry = service.registry();
    let mut rows: Vec<DayScheduleRow> = Vec::new();

    for slot in registry.slots() {
        if slot.weekday != weekday {
            continue;
        }
        let Some(student) = registry.student(slot.student) else {
            continue;
        };
        if student.level != level {
            continue;
        }
        let Some(teacher) = registry.teacher(slot.teacher) else {
            continue;
        };

        let (due, done, overtime) = match registry.ledger(slot.id) {
            Some(ledger) => (
                ledger.hours_due(),
                ledger.hours_done(),
                ledger.hours_overtime(),
            ),
            None => (0.0, 0.0, 0.0),
        };

        rows.push(DayScheduleRow {
            slot: slot.id,
            teacher_name: teacher.name.clone(),
            student_name: student.name.clone(),
            start: slot.start,
            end: slot.end,
            state: slot.state,
            hours_due: due,
            hours_done: done,
            hours_overtime: overtime,
            ratio: round_hours(safe_ratio(done, due)),
        });
    }

    rows
}

fn safe_ratio(done: f64, due: f64) -> f64 {
    if due == 0.0 {
        0.0
    } else {
        100.0 * done / due
    }
}
