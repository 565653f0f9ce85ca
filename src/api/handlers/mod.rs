//! HTTP request handlers.

pub mod admin_handler;
pub mod attendance_handler;
pub mod report_handler;

pub use admin_handler::admin_routes;
pub use attendance_handler::{attendance_routes, self_service_routes};
pub use report_handler::report_routes;
