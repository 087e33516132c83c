use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_LEVEL: u8 = 3;
pub const MAX_LEVEL: u8 = 6;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Invalid quota_hours: {0}, must be a finite non-negative number.")]
    InvalidQuota(f64),
    #[error("Invalid level: {0}, must be between 3 and 6.")]
    InvalidLevel(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeacherId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u64);

impl Display for TeacherId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A teacher with a contracted weekly hour quota. The quota is the
/// baseline every ledger's overtime is computed against.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    quota_hours: f64,
}

impl Teacher {
    pub fn new(id: TeacherId, name: String, quota_hours: f64) -> Result<Teacher, RosterError> {
        validate_quota(quota_hours)?;

        Ok(Teacher {
            id,
            name,
            quota_hours,
        })
    }

    pub fn quota_hours(&self) -> f64 {
        self.quota_hours
    }

    pub fn set_quota_hours(&mut self, quota_hours: f64) -> Result<(), RosterError> {
        validate_quota(quota_hours)?;
        self.quota_hours = quota_hours;
        Ok(())
    }
}

/// A student, placed in a school level (3 to 6) and optionally a class
/// group within that level ("A", "B", ...).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub level: u8,
    pub group: Option<String>,
}

impl Student {
    pub fn new(
        id: StudentId,
        name: String,
        level: u8,
        group: Option<String>,
    ) -> Result<Student, RosterError> {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            return Err(RosterError::InvalidLevel(level));
        }

        Ok(Student {
            id,
            name,
            level,
            group,
        })
    }
}

fn validate_quota(quota_hours: f64) -> Result<(), RosterError> {
    if !quota_hours.is_finite() || quota_hours < 0.0 {
        return Err(RosterError::InvalidQuota(quota_hours));
    }
    Ok(())
}
