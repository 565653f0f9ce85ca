//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{admin_handler, attendance_handler, report_handler};
use crate::domain::{
    AttendanceRecord, AttendanceStatus, CheckMethod, ConflictReason, DateRange, EventIntent,
    LeaderboardEntry, MatchOutcome, OvertimeEntry, PayrollEntry, Period, PeriodSummary, SortBy,
    SortOrder, StatusBreakdown, TrendPoint,
};
use crate::services::EventOutcome;

/// OpenAPI documentation for the attendance engine
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Engine",
        version = "0.1.0",
        description = "Face-matched check-in/check-out sessions, admin ledger maintenance and attendance reporting",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // Event endpoints
        attendance_handler::scan,
        attendance_handler::mark,
        attendance_handler::my_records,
        attendance_handler::my_summary,
        // Admin ledger endpoints
        admin_handler::create_record,
        admin_handler::update_record,
        admin_handler::delete_record,
        admin_handler::list_user_records,
        admin_handler::summary,
        admin_handler::payroll,
        // Analytics endpoints
        report_handler::attendance_trend,
        report_handler::status_breakdown,
        report_handler::leaderboard,
        report_handler::overtime,
    ),
    components(
        schemas(
            // Domain types
            AttendanceRecord,
            AttendanceStatus,
            CheckMethod,
            EventIntent,
            ConflictReason,
            MatchOutcome,
            SortBy,
            SortOrder,
            Period,
            DateRange,
            // Reports
            PeriodSummary,
            TrendPoint,
            PayrollEntry,
            StatusBreakdown,
            LeaderboardEntry,
            OvertimeEntry,
            // Request and response types
            EventOutcome,
            attendance_handler::MarkRequest,
            admin_handler::CreateRecordRequest,
            admin_handler::UpdateRecordRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in/check-out events and self-service"),
        (name = "Admin", description = "Manual ledger maintenance"),
        (name = "Analytics", description = "Attendance reports")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT issued by the user directory"))
                        .build(),
                ),
            );
        }
    }
}
