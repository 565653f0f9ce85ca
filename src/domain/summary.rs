//! Aggregation over attendance history.
//!
//! Every report is one pass of [`group_reduce`] with a different key
//! function. All derived numbers come from [`AttendanceTally`], so daily,
//! weekly and monthly views can never disagree on a formula.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::attendance::{AttendanceRecord, AttendanceStatus};
use super::period::Period;

/// Group records by `key` and fold each group into a tally.
///
/// The map is ordered by key, which fixes report ordering.
pub fn group_reduce<'a, K, I, F>(records: I, key: F) -> BTreeMap<K, AttendanceTally>
where
    K: Ord,
    I: IntoIterator<Item = &'a AttendanceRecord>,
    F: Fn(&AttendanceRecord) -> K,
{
    let mut groups: BTreeMap<K, AttendanceTally> = BTreeMap::new();
    for record in records {
        groups.entry(key(record)).or_default().add(record);
    }
    groups
}

/// Running totals for a group of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceTally {
    pub present: u64,
    pub late: u64,
    pub absent: u64,
    pub on_leave: u64,
    pub hours_worked: f64,
    pub overtime_hours: f64,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl AttendanceTally {
    pub fn add(&mut self, record: &AttendanceRecord) {
        match record.status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::OnLeave => self.on_leave += 1,
        }
        self.hours_worked += record.total_hours;
        self.overtime_hours += record.overtime_hours;
        self.first_date = Some(self.first_date.map_or(record.date, |d| d.min(record.date)));
        self.last_date = Some(self.last_date.map_or(record.date, |d| d.max(record.date)));
    }

    pub fn total(&self) -> u64 {
        self.present + self.late + self.absent + self.on_leave
    }

    /// Days counted as attended (present or late).
    pub fn attended(&self) -> u64 {
        self.present + self.late
    }

    /// Hours per attended day; zero when nothing was attended.
    pub fn average_hours_per_day(&self) -> f64 {
        match self.attended() {
            0 => 0.0,
            days => self.hours_worked / days as f64,
        }
    }

    /// Attended share of all records as a percentage in `[0, 100]`.
    pub fn attendance_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => (self.attended() as f64 / total as f64 * 100.0).clamp(0.0, 100.0),
        }
    }
}

/// Ordering key for period summaries: year, unit within the year, day, user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PeriodKey {
    year: i32,
    unit: u32,
    date: Option<NaiveDate>,
    user_id: Uuid,
}

fn period_key(period: Period) -> impl Fn(&AttendanceRecord) -> PeriodKey {
    move |record: &AttendanceRecord| match period {
        Period::Daily => PeriodKey {
            year: record.date.year(),
            unit: record.date.ordinal(),
            date: Some(record.date),
            user_id: record.user_id,
        },
        Period::Weekly => {
            let week = record.date.iso_week();
            PeriodKey {
                year: week.year(),
                unit: week.week(),
                date: None,
                user_id: record.user_id,
            }
        }
        Period::Monthly => PeriodKey {
            year: record.date.year(),
            unit: record.date.month(),
            date: None,
            user_id: record.user_id,
        },
    }
}

/// Per-user summary for one day, ISO week or month.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub user_id: Uuid,
    pub period: Period,
    /// Calendar year, or ISO week-year for weekly summaries
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
    #[schema(value_type = String, format = Date)]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date)]
    pub end_date: NaiveDate,
    pub total_present: u64,
    pub total_late: u64,
    pub total_absent: u64,
    pub total_on_leave: u64,
    pub total_records: u64,
    pub total_hours_worked: f64,
    pub overtime_hours: f64,
    pub average_hours_per_day: f64,
    pub attendance_rate: f64,
}

/// Summaries for every (user, period) group in `records`.
pub fn summarize(records: &[AttendanceRecord], period: Period) -> Vec<PeriodSummary> {
    group_reduce(records, period_key(period))
        .into_iter()
        .filter_map(|(key, tally)| {
            let (start_date, end_date) = (tally.first_date?, tally.last_date?);
            Some(PeriodSummary {
                user_id: key.user_id,
                period,
                year: key.year,
                month: (period == Period::Monthly).then_some(key.unit),
                week: (period == Period::Weekly).then_some(key.unit),
                date: key.date,
                start_date,
                end_date,
                total_present: tally.present,
                total_late: tally.late,
                total_absent: tally.absent,
                total_on_leave: tally.on_leave,
                total_records: tally.total(),
                total_hours_worked: tally.hours_worked,
                overtime_hours: tally.overtime_hours,
                average_hours_per_day: tally.average_hours_per_day(),
                attendance_rate: tally.attendance_rate(),
            })
        })
        .collect()
}

/// Organisation-wide attendance for one day.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub present: u64,
    pub late: u64,
    pub absent: u64,
    pub on_leave: u64,
    pub total: u64,
    pub attendance_rate: f64,
}

pub fn trend(records: &[AttendanceRecord]) -> Vec<TrendPoint> {
    group_reduce(records, |r| r.date)
        .into_iter()
        .map(|(date, tally)| TrendPoint {
            date,
            present: tally.present,
            late: tally.late,
            absent: tally.absent,
            on_leave: tally.on_leave,
            total: tally.total(),
            attendance_rate: tally.attendance_rate(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayrollEntry {
    pub user_id: Uuid,
    pub total_hours_worked: f64,
    pub overtime_hours: f64,
    /// Days attended (present or late)
    pub present_days: u64,
}

pub fn payroll(records: &[AttendanceRecord]) -> Vec<PayrollEntry> {
    group_reduce(records, |r| r.user_id)
        .into_iter()
        .map(|(user_id, tally)| PayrollEntry {
            user_id,
            total_hours_worked: tally.hours_worked,
            overtime_hours: tally.overtime_hours,
            present_days: tally.attended(),
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub present: u64,
    pub late: u64,
    pub absent: u64,
    pub on_leave: u64,
    pub total: u64,
}

pub fn status_breakdown(records: &[AttendanceRecord]) -> StatusBreakdown {
    let tally = group_reduce(records, |_| ())
        .remove(&())
        .unwrap_or_default();
    StatusBreakdown {
        present: tally.present,
        late: tally.late,
        absent: tally.absent,
        on_leave: tally.on_leave,
        total: tally.total(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u64,
    pub user_id: Uuid,
    pub attendance_rate: f64,
    pub days_attended: u64,
    pub total_hours_worked: f64,
}

/// Users ranked by attendance rate, then days attended, then hours.
pub fn leaderboard(records: &[AttendanceRecord], limit: usize) -> Vec<LeaderboardEntry> {
    let mut rows: Vec<(Uuid, AttendanceTally)> =
        group_reduce(records, |r| r.user_id).into_iter().collect();

    rows.sort_by(|(a_id, a), (b_id, b)| {
        b.attendance_rate()
            .total_cmp(&a.attendance_rate())
            .then_with(|| b.attended().cmp(&a.attended()))
            .then_with(|| b.hours_worked.total_cmp(&a.hours_worked))
            .then_with(|| a_id.cmp(b_id))
    });

    rows.into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (user_id, tally))| LeaderboardEntry {
            rank: i as u64 + 1,
            user_id,
            attendance_rate: tally.attendance_rate(),
            days_attended: tally.attended(),
            total_hours_worked: tally.hours_worked,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OvertimeEntry {
    pub user_id: Uuid,
    pub overtime_hours: f64,
    /// Records that carried any overtime
    pub overtime_days: u64,
}

/// Users with overtime, largest first.
pub fn overtime(records: &[AttendanceRecord]) -> Vec<OvertimeEntry> {
    let with_overtime = records.iter().filter(|r| r.overtime_hours > 0.0);
    let mut rows: Vec<OvertimeEntry> = group_reduce(with_overtime, |r| r.user_id)
        .into_iter()
        .map(|(user_id, tally)| OvertimeEntry {
            user_id,
            overtime_hours: tally.overtime_hours,
            overtime_days: tally.total(),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.overtime_hours
            .total_cmp(&a.overtime_hours)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    rows
}
