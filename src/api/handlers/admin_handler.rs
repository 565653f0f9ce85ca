//! Admin ledger handlers.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::attendance_handler::RecordQuery;
use super::report_handler::SummaryParams;
use crate::api::extractors::ValidatedJson;
use crate::api::AppState;
use crate::domain::{
    AttendanceRecord, AttendanceStatus, CheckMethod, PayrollEntry, PeriodSummary, RecordPatch,
};
use crate::errors::{AppError, AppResult};
use crate::services::{ManualRecord, Window};
use crate::types::{Created, NoContent};

/// Manual record request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    pub user_id: Uuid,
    #[schema(example = "2024-01-10")]
    pub date: NaiveDate,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    /// present, late, absent or on_leave
    #[schema(example = "on_leave")]
    pub status: String,
    /// Defaults to manual
    pub method: Option<String>,
    #[validate(length(max = 255, message = "location must be at most 255 characters"))]
    pub location: Option<String>,
    /// Overrides hours derived from the check times
    #[validate(range(min = 0.0, max = 24.0, message = "totalHours must be between 0 and 24"))]
    pub total_hours: Option<f64>,
    #[validate(range(min = 0.0, max = 24.0, message = "overtimeHours must be between 0 and 24"))]
    pub overtime_hours: Option<f64>,
}

impl CreateRecordRequest {
    fn into_manual(self) -> AppResult<ManualRecord> {
        let status = self.status.parse::<AttendanceStatus>()?;
        let method = match self.method.as_deref() {
            Some(m) => m.parse::<CheckMethod>()?,
            None => CheckMethod::Manual,
        };

        Ok(ManualRecord {
            user_id: self.user_id,
            date: self.date,
            check_in_time: self.check_in_time,
            check_out_time: self.check_out_time,
            status,
            method,
            location: self.location,
            total_hours: self.total_hours,
            overtime_hours: self.overtime_hours,
        })
    }
}

/// Distinguishes an explicit `null` (clear) from an absent field (keep).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Record edit request; omitted fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordRequest {
    pub date: Option<NaiveDate>,
    /// `null` clears the check-in
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub check_in_time: Option<Option<DateTime<Utc>>>,
    /// `null` clears the check-out
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub check_out_time: Option<Option<DateTime<Utc>>>,
    pub status: Option<String>,
    pub method: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
}

impl UpdateRecordRequest {
    fn into_patch(self) -> AppResult<RecordPatch> {
        if let Some(Some(location)) = &self.location {
            if location.len() > 255 {
                return Err(AppError::validation(
                    "location must be at most 255 characters",
                ));
            }
        }

        Ok(RecordPatch {
            date: self.date,
            check_in_time: self.check_in_time,
            check_out_time: self.check_out_time,
            status: self
                .status
                .as_deref()
                .map(str::parse::<AttendanceStatus>)
                .transpose()?,
            method: self
                .method
                .as_deref()
                .map(str::parse::<CheckMethod>)
                .transpose()?,
            location: self.location,
        })
    }
}

/// Payroll query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PayrollParams {
    /// Restrict to one user
    pub user_id: Option<Uuid>,
    /// Defaults to the first day of the current month
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Create admin ledger routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_record))
        .route("/:id", put(update_record).delete(delete_record))
        .route("/users/:user_id", get(list_user_records))
        .route("/summary", get(summary))
        .route("/payroll", get(payroll))
}

/// Insert a record by hand
#[utoipa::path(
    post,
    path = "/admin/attendance",
    tag = "Admin",
    request_body = CreateRecordRequest,
    responses(
        (status = 201, description = "Record created", body = AttendanceRecord),
        (status = 400, description = "Validation error"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Duplicate record or open session")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_record(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateRecordRequest>,
) -> AppResult<Created<AttendanceRecord>> {
    let manual = payload.into_manual()?;
    let record = state.services.ledger().insert_manual(manual).await?;
    Ok(Created(record))
}

/// Edit a record
#[utoipa::path(
    put,
    path = "/admin/attendance/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Record ID")),
    request_body = UpdateRecordRequest,
    responses(
        (status = 200, description = "Record updated", body = AttendanceRecord),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Record not found"),
        (status = 409, description = "Duplicate record or open session")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateRecordRequest>,
) -> AppResult<Json<AttendanceRecord>> {
    let patch = payload.into_patch()?;
    let record = state.services.ledger().update(id, patch).await?;
    Ok(Json(record))
}

/// Delete a record
#[utoipa::path(
    delete,
    path = "/admin/attendance/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Record ID")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.ledger().delete(id).await?;
    Ok(NoContent)
}

/// List one user's records
#[utoipa::path(
    get,
    path = "/admin/attendance/users/{user_id}",
    tag = "Admin",
    params(("user_id" = Uuid, Path, description = "User ID"), RecordQuery),
    responses(
        (status = 200, description = "User's records", body = Vec<AttendanceRecord>),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_user_records(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<RecordQuery>,
) -> AppResult<Json<Vec<AttendanceRecord>>> {
    let filter = query.into_filter()?;
    let records = state.services.ledger().list_for_user(user_id, filter).await?;
    Ok(Json(records))
}

/// Period summaries for one or all users
#[utoipa::path(
    get,
    path = "/admin/attendance/summary",
    tag = "Admin",
    params(SummaryParams),
    responses(
        (status = 200, description = "Summaries", body = Vec<PeriodSummary>),
        (status = 400, description = "Unknown period or bad range")
    ),
    security(("bearer_auth" = []))
)]
pub async fn summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> AppResult<Json<Vec<PeriodSummary>>> {
    let query = params.into_query()?;
    let summaries = state.services.reports().summary(query).await?;
    Ok(Json(summaries))
}

/// Hours and overtime per user
#[utoipa::path(
    get,
    path = "/admin/attendance/payroll",
    tag = "Admin",
    params(PayrollParams),
    responses(
        (status = 200, description = "Payroll entries", body = Vec<PayrollEntry>),
        (status = 400, description = "Bad date range")
    ),
    security(("bearer_auth" = []))
)]
pub async fn payroll(
    State(state): State<AppState>,
    Query(params): Query<PayrollParams>,
) -> AppResult<Json<Vec<PayrollEntry>>> {
    let window = Window {
        start: params.start_date,
        end: params.end_date,
    };
    let entries = state
        .services
        .reports()
        .payroll(params.user_id, window)
        .await?;
    Ok(Json(entries))
}
