//! Attendance Engine - check-in/check-out sessions and attendance reporting
//!
//! A kiosk event (face image, badge code or user ID) is resolved to an
//! employee, checked against that employee's open session and written to
//! the attendance ledger as a check-in or check-out. Reports aggregate the
//! ledger into daily, weekly and monthly summaries, trends, payroll and
//! overtime figures.
//!
//! Requests flow `api` -> `services` -> `infra`, with the rules that decide
//! a transition or a summary living in `domain` and free of I/O.
//!
//! ```bash
//! attendance-engine migrate up
//! attendance-engine serve --port 3000
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;

pub use api::AppState;
pub use config::Config;
pub use domain::{AttendanceRecord, AttendanceStatus, MatchOutcome};
pub use errors::{AppError, AppResult};
