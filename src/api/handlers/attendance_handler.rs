//! Attendance event and self-service handlers.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::report_handler::SummaryParams;
use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::config::MAX_SCAN_IMAGE_BYTES;
use crate::domain::{
    AttendanceRecord, AttendanceStatus, CheckMethod, EventIntent, MatchOutcome, PeriodSummary,
    RecordFilter, SortBy, SortOrder,
};
use crate::errors::{AppError, AppResult, ErrorResponse};
use crate::services::{AttendanceEvent, EventOutcome, EventSubject};

/// Scan query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScanParams {
    /// face, rfid, nfc or manual (default face)
    pub method: Option<String>,
    /// Free-text capture location, e.g. "Lobby kiosk"
    pub location: Option<String>,
    /// auto, check_in or check_out (default auto)
    pub intent: Option<String>,
}

/// Device-originated check event
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    /// Internal user ID; give this or `employeeId`
    pub user_id: Option<Uuid>,
    /// Organisation-issued employee code
    #[validate(length(min = 1, max = 64, message = "employeeId must be 1-64 characters"))]
    #[schema(example = "EMP-0042")]
    pub employee_id: Option<String>,
    /// rfid, nfc, manual or face (default manual)
    #[schema(example = "rfid")]
    pub method: Option<String>,
    #[validate(length(max = 255, message = "location must be at most 255 characters"))]
    pub location: Option<String>,
    #[schema(example = "auto")]
    pub intent: Option<String>,
}

/// Record listing query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RecordQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// present, late, absent or on_leave
    pub status: Option<String>,
    #[param(inline)]
    pub sort_by: Option<SortBy>,
    #[param(inline)]
    pub sort_order: Option<SortOrder>,
}

impl RecordQuery {
    pub fn into_filter(self) -> AppResult<RecordFilter> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<AttendanceStatus>)
            .transpose()?;

        Ok(RecordFilter {
            start: self.start_date,
            end: self.end_date,
            status,
            sort_by: self.sort_by.unwrap_or_default(),
            sort_order: self.sort_order.unwrap_or_default(),
        })
    }
}

/// Public event routes used by kiosks and badge readers
pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/scan",
            post(scan).layer(DefaultBodyLimit::max(MAX_SCAN_IMAGE_BYTES)),
        )
        .route("/mark", post(mark))
}

/// Routes bound to the caller's own records
pub fn self_service_routes() -> Router<AppState> {
    Router::new()
        .route("/me/records", get(my_records))
        .route("/me/summary", get(my_summary))
}

fn parse_or<T>(value: Option<&str>, default: T) -> AppResult<T>
where
    T: std::str::FromStr<Err = AppError>,
{
    value.map(str::parse::<T>).transpose().map(|v| v.unwrap_or(default))
}

/// Render an event outcome; unrecognised faces become a 404.
fn outcome_response(outcome: EventOutcome) -> Response {
    match outcome {
        EventOutcome::CheckedIn { .. } => (StatusCode::CREATED, Json(outcome)).into_response(),
        EventOutcome::CheckedOut { .. } => (StatusCode::OK, Json(outcome)).into_response(),
        EventOutcome::NotRecognized { identity } => {
            let (code, message) = match &identity {
                MatchOutcome::Ambiguous { .. } => (
                    "FACE_AMBIGUOUS",
                    "Face matches more than one enrolled user",
                ),
                _ => ("FACE_NOT_RECOGNIZED", "Face not recognized"),
            };
            let body = ErrorResponse::new(code, message).with_identity(identity);
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
    }
}

/// Check in or out by face
#[utoipa::path(
    post,
    path = "/attendance/scan",
    tag = "Attendance",
    params(ScanParams),
    request_body(
        content = Vec<u8>,
        content_type = "application/octet-stream",
        description = "Captured face image"
    ),
    responses(
        (status = 201, description = "Checked in", body = EventOutcome),
        (status = 200, description = "Checked out", body = EventOutcome),
        (status = 403, description = "User may not record attendance"),
        (status = 404, description = "Face not recognized or ambiguous"),
        (status = 409, description = "Session conflict"),
        (status = 502, description = "Embedding extraction failed")
    )
)]
pub async fn scan(
    State(state): State<AppState>,
    Query(params): Query<ScanParams>,
    body: Bytes,
) -> AppResult<Response> {
    if body.is_empty() {
        return Err(AppError::validation("Request body must contain an image"));
    }

    let mut event = AttendanceEvent::new(EventSubject::Image(body.to_vec()));
    event.method = parse_or(params.method.as_deref(), CheckMethod::Face)?;
    event.intent = parse_or(params.intent.as_deref(), EventIntent::Auto)?;
    event.location = params.location.filter(|l| !l.trim().is_empty());

    let outcome = state.services.sessions().record_event(event).await?;
    Ok(outcome_response(outcome))
}

/// Check in or out by user ID or employee code
#[utoipa::path(
    post,
    path = "/attendance/mark",
    tag = "Attendance",
    request_body = MarkRequest,
    responses(
        (status = 201, description = "Checked in", body = EventOutcome),
        (status = 200, description = "Checked out", body = EventOutcome),
        (status = 400, description = "Validation error"),
        (status = 403, description = "User may not record attendance"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Session conflict")
    )
)]
pub async fn mark(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<MarkRequest>,
) -> AppResult<Response> {
    let subject = match (payload.user_id, payload.employee_id) {
        (Some(id), None) => EventSubject::UserId(id),
        (None, Some(code)) => EventSubject::EmployeeId(code),
        _ => {
            return Err(AppError::validation(
                "Exactly one of userId or employeeId is required",
            ))
        }
    };

    let mut event = AttendanceEvent::new(subject);
    event.method = parse_or(payload.method.as_deref(), CheckMethod::Manual)?;
    event.intent = parse_or(payload.intent.as_deref(), EventIntent::Auto)?;
    event.location = payload.location;

    let outcome = state.services.sessions().record_event(event).await?;
    Ok(outcome_response(outcome))
}

/// List the caller's own records
#[utoipa::path(
    get,
    path = "/attendance/me/records",
    tag = "Attendance",
    params(RecordQuery),
    responses(
        (status = 200, description = "Caller's records", body = Vec<AttendanceRecord>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_records(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<RecordQuery>,
) -> AppResult<Json<Vec<AttendanceRecord>>> {
    let filter = query.into_filter()?;
    let records = state
        .services
        .ledger()
        .list_for_user(current_user.id, filter)
        .await?;
    Ok(Json(records))
}

/// Summarise the caller's own attendance
#[utoipa::path(
    get,
    path = "/attendance/me/summary",
    tag = "Attendance",
    params(SummaryParams),
    responses(
        (status = 200, description = "Caller's summaries", body = Vec<PeriodSummary>),
        (status = 400, description = "Unknown period or bad range"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_summary(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(params): Query<SummaryParams>,
) -> AppResult<Json<Vec<PeriodSummary>>> {
    let mut query = params.into_query()?;
    query.user_id = Some(current_user.id);

    let summaries = state.services.reports().summary(query).await?;
    Ok(Json(summaries))
}
