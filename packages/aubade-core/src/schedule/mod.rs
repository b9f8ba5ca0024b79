//! Playback window scheduling.
//!
//! - `model` - Day and holiday schedule types plus eligibility rules
//! - `resolver` - Next-start resolution and the re-entrant wait loop

pub mod model;
pub mod resolver;

pub use model::{DaySchedule, DayResolution, HolidaySchedule, ResolvedSchedule};
pub use resolver::{
    determine_next_start, resolve_day, sleep_or_cancel, wait_until_start_time, NextStart,
};
