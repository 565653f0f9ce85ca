//! Environment-driven settings, attendance policy and shared constants.

mod constants;
mod settings;

pub use constants::*;
pub use settings::{AttendancePolicy, Config, MatchSettings};
