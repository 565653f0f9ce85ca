//! Report service - Read-only aggregation over the ledger.
//!
//! Every view loads the records for its window and hands them to the pure
//! reducers in `domain::summary`.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{AttendancePolicy, MAX_LEADERBOARD_LIMIT};
use crate::domain::summary::{self, LeaderboardEntry, OvertimeEntry, PayrollEntry, TrendPoint};
use crate::domain::{AttendanceRecord, DateRange, Period, PeriodSummary, StatusBreakdown};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Optional bounds of a report window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Window {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Window {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryQuery {
    pub user_id: Option<Uuid>,
    pub period: Period,
    pub window: Window,
}

/// Report service trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ReportService: Send + Sync {
    /// Per-user summaries grouped by period
    async fn summary(&self, query: SummaryQuery) -> AppResult<Vec<PeriodSummary>>;

    /// Daily counts across all users
    async fn trend(&self, window: Window) -> AppResult<Vec<TrendPoint>>;

    /// Hours per user; defaults to the current month
    async fn payroll(&self, user_id: Option<Uuid>, window: Window)
        -> AppResult<Vec<PayrollEntry>>;

    /// Status counts over the rolling window
    async fn status_breakdown(&self) -> AppResult<StatusBreakdown>;

    /// Users ranked by attendance rate
    async fn leaderboard(&self, window: Window, limit: u64) -> AppResult<Vec<LeaderboardEntry>>;

    /// Users with overtime, most first
    async fn overtime(&self, window: Window) -> AppResult<Vec<OvertimeEntry>>;
}

/// Concrete implementation of ReportService using Unit of Work.
pub struct ReportManager<U: UnitOfWork> {
    uow: Arc<U>,
    policy: AttendancePolicy,
}

impl<U: UnitOfWork> ReportManager<U> {
    pub fn new(uow: Arc<U>, policy: AttendancePolicy) -> Self {
        Self { uow, policy }
    }

    fn rolling(&self, window: Window) -> AppResult<DateRange> {
        DateRange::resolve(
            window.start,
            window.end,
            self.policy.today(),
            self.policy.summary_window_days,
        )
    }

    async fn load(
        &self,
        user_id: Option<Uuid>,
        range: DateRange,
    ) -> AppResult<Vec<AttendanceRecord>> {
        let records = self.uow.attendance().list_in_range(user_id, range).await?;
        tracing::debug!(
            start = %range.start,
            end = %range.end,
            count = records.len(),
            "Loaded records for report"
        );
        Ok(records)
    }
}

#[async_trait]
impl<U: UnitOfWork> ReportService for ReportManager<U> {
    async fn summary(&self, query: SummaryQuery) -> AppResult<Vec<PeriodSummary>> {
        let range = self.rolling(query.window)?;
        let records = self.load(query.user_id, range).await?;
        Ok(summary::summarize(&records, query.period))
    }

    async fn trend(&self, window: Window) -> AppResult<Vec<TrendPoint>> {
        let range = self.rolling(window)?;
        let records = self.load(None, range).await?;
        Ok(summary::trend(&records))
    }

    async fn payroll(
        &self,
        user_id: Option<Uuid>,
        window: Window,
    ) -> AppResult<Vec<PayrollEntry>> {
        let range = if window.is_open() {
            DateRange::month_of(self.policy.today())
        } else {
            self.rolling(window)?
        };
        let records = self.load(user_id, range).await?;
        Ok(summary::payroll(&records))
    }

    async fn status_breakdown(&self) -> AppResult<StatusBreakdown> {
        let range = self.rolling(Window::default())?;
        let records = self.load(None, range).await?;
        Ok(summary::status_breakdown(&records))
    }

    async fn leaderboard(&self, window: Window, limit: u64) -> AppResult<Vec<LeaderboardEntry>> {
        if limit == 0 || limit > MAX_LEADERBOARD_LIMIT {
            return Err(AppError::validation(format!(
                "limit must be between 1 and {}",
                MAX_LEADERBOARD_LIMIT
            )));
        }
        let range = self.rolling(window)?;
        let records = self.load(None, range).await?;
        Ok(summary::leaderboard(&records, limit as usize))
    }

    async fn overtime(&self, window: Window) -> AppResult<Vec<OvertimeEntry>> {
        let range = self.rolling(window)?;
        let records = self.load(None, range).await?;
        Ok(summary::overtime(&records))
    }
}
