//! # Record Model
//!
//! Clean DTOs that define the record/attribute model entity resolution
//! operates on. These types cross every boundary: storage ↔ blocking ↔
//! planner ↔ execution ↔ caller.
//!
//! Design rule: no database types, no table-origin tagging beyond
//! `RecordId`, no I/O, no state, no async.

pub mod record;
pub mod settings;

pub use record::{Attributes, Record, RecordId, TableSide};
pub use settings::Settings;
