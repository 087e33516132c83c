pub mod duration;
pub mod hours_service;
pub mod leave;
pub mod ledger;
pub mod report;
pub mod roster;
pub mod school_registry;
pub mod slot;
