//! Analytics handlers.

use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::api::AppState;
use crate::config::DEFAULT_LEADERBOARD_LIMIT;
use crate::domain::{LeaderboardEntry, OvertimeEntry, Period, StatusBreakdown, TrendPoint};
use crate::errors::AppResult;
use crate::services::{SummaryQuery, Window};

/// Optional reporting window
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RangeParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl RangeParams {
    pub fn window(&self) -> Window {
        Window {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

/// Summary query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SummaryParams {
    /// daily, weekly or monthly (default daily)
    pub period: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Restrict to one user (admin only)
    pub user_id: Option<Uuid>,
}

impl SummaryParams {
    /// Parse the period before any work is done.
    pub fn into_query(self) -> AppResult<SummaryQuery> {
        let period = match self.period.as_deref() {
            Some(p) => p.parse::<Period>()?,
            None => Period::default(),
        };

        Ok(SummaryQuery {
            user_id: self.user_id,
            period,
            window: Window {
                start: self.start_date,
                end: self.end_date,
            },
        })
    }
}

/// Leaderboard query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeaderboardParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Number of entries, 1-100 (default 10)
    pub limit: Option<u64>,
}

/// Create analytics routes (admin only)
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/attendance-trend", get(attendance_trend))
        .route("/status-breakdown", get(status_breakdown))
        .route("/leaderboard", get(leaderboard))
        .route("/overtime", get(overtime))
}

/// Daily attendance counts across all users
#[utoipa::path(
    get,
    path = "/analytics/attendance-trend",
    tag = "Analytics",
    params(RangeParams),
    responses(
        (status = 200, description = "One point per day with records", body = Vec<TrendPoint>),
        (status = 400, description = "Bad date range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn attendance_trend(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> AppResult<Json<Vec<TrendPoint>>> {
    let points = state.services.reports().trend(params.window()).await?;
    Ok(Json(points))
}

/// Status counts over the rolling window
#[utoipa::path(
    get,
    path = "/analytics/status-breakdown",
    tag = "Analytics",
    responses(
        (status = 200, description = "Status counts", body = StatusBreakdown),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn status_breakdown(State(state): State<AppState>) -> AppResult<Json<StatusBreakdown>> {
    let breakdown = state.services.reports().status_breakdown().await?;
    Ok(Json(breakdown))
}

/// Users ranked by attendance rate
#[utoipa::path(
    get,
    path = "/analytics/leaderboard",
    tag = "Analytics",
    params(LeaderboardParams),
    responses(
        (status = 200, description = "Ranked users", body = Vec<LeaderboardEntry>),
        (status = 400, description = "Bad limit or date range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> AppResult<Json<Vec<LeaderboardEntry>>> {
    let window = Window {
        start: params.start_date,
        end: params.end_date,
    };
    let entries = state
        .services
        .reports()
        .leaderboard(window, params.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT))
        .await?;
    Ok(Json(entries))
}

/// Overtime per user, most first
#[utoipa::path(
    get,
    path = "/analytics/overtime",
    tag = "Analytics",
    params(RangeParams),
    responses(
        (status = 200, description = "Users with overtime", body = Vec<OvertimeEntry>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn overtime(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> AppResult<Json<Vec<OvertimeEntry>>> {
    let entries = state.services.reports().overtime(params.window()).await?;
    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_params_default_to_daily() {
        let query = SummaryParams::default().into_query().unwrap();
        assert_eq!(query.period, Period::Daily);
        assert_eq!(query.window, Window::default());
    }

    #[test]
    fn test_summary_params_reject_unknown_period() {
        let params = SummaryParams {
            period: Some("fortnightly".to_string()),
            ..Default::default()
        };
        assert_eq!(params.into_query().unwrap_err().code(), "VALIDATION_ERROR");
    }
}
