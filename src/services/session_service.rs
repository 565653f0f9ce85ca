//! Session service - Turns check events into ledger writes.
//!
//! Flow per event: resolve who it is, check they may record attendance,
//! take the user's writer lock, then inside one transaction read the open
//! record, decide the transition and write it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::IdentityService;
use crate::config::AttendancePolicy;
use crate::domain::{
    decide, AttendanceRecord, AttendanceStatus, CheckMethod, ConflictReason, Employee,
    EventIntent, MatchOutcome, NewAttendanceRecord, Transition,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{TxAttendanceRepository, UnitOfWork, UserLocks};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Who an event claims to be.
#[derive(Debug, Clone, PartialEq)]
pub enum EventSubject {
    /// Captured face image, resolved by the identity service
    Image(Vec<u8>),
    UserId(Uuid),
    /// Organisation-issued code from a badge or keypad
    EmployeeId(String),
}

/// A single check-in or check-out attempt.
#[derive(Debug, Clone)]
pub struct AttendanceEvent {
    pub subject: EventSubject,
    pub method: CheckMethod,
    pub location: Option<String>,
    pub intent: EventIntent,
    pub occurred_at: DateTime<Utc>,
}

impl AttendanceEvent {
    pub fn new(subject: EventSubject) -> Self {
        Self {
            subject,
            method: CheckMethod::default(),
            location: None,
            intent: EventIntent::default(),
            occurred_at: Utc::now(),
        }
    }
}

/// Result of a processed event.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EventOutcome {
    CheckedIn {
        record: AttendanceRecord,
        /// Match confidence for face events
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
    },
    CheckedOut {
        record: AttendanceRecord,
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
    },
    /// The face matched nobody, or more than one person
    NotRecognized { identity: MatchOutcome },
}

impl EventOutcome {
    pub fn record(&self) -> Option<&AttendanceRecord> {
        match self {
            EventOutcome::CheckedIn { record, .. } | EventOutcome::CheckedOut { record, .. } => {
                Some(record)
            }
            EventOutcome::NotRecognized { .. } => None,
        }
    }
}

/// Session service trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Process one event end to end
    async fn record_event(&self, event: AttendanceEvent) -> AppResult<EventOutcome>;
}

/// Concrete implementation of SessionService using Unit of Work.
pub struct SessionManager<U: UnitOfWork> {
    uow: Arc<U>,
    identity: Arc<dyn IdentityService>,
    locks: Arc<dyn UserLocks>,
    policy: AttendancePolicy,
}

impl<U: UnitOfWork> SessionManager<U> {
    pub fn new(
        uow: Arc<U>,
        identity: Arc<dyn IdentityService>,
        locks: Arc<dyn UserLocks>,
        policy: AttendancePolicy,
    ) -> Self {
        Self {
            uow,
            identity,
            locks,
            policy,
        }
    }

    async fn find_subject(&self, subject: EventSubject) -> AppResult<Resolved> {
        let directory = self.uow.directory();
        let resolved = match subject {
            EventSubject::Image(image) => {
                let outcome = self.identity.resolve_image(image).await?;
                let (user_id, confidence) = match outcome {
                    MatchOutcome::Matched {
                        user_id,
                        confidence,
                        ..
                    } => (user_id, confidence),
                    other => return Ok(Resolved::Unrecognized(other)),
                };
                let employee = directory.find_user(user_id).await?.ok_or_not_found("User")?;
                Resolved::Known(employee, Some(confidence))
            }
            EventSubject::UserId(id) => {
                let employee = directory.find_user(id).await?.ok_or_not_found("User")?;
                Resolved::Known(employee, None)
            }
            EventSubject::EmployeeId(code) => {
                let employee = directory
                    .find_by_employee_id(&code)
                    .await?
                    .ok_or_not_found("User")?;
                Resolved::Known(employee, None)
            }
        };
        Ok(resolved)
    }
}

enum Resolved {
    Known(Employee, Option<f64>),
    Unrecognized(MatchOutcome),
}

fn ensure_eligible(employee: &Employee) -> AppResult<()> {
    if employee.is_admin() {
        return Err(AppError::forbidden("Admin accounts do not record attendance"));
    }
    if employee.has_departed() {
        return Err(AppError::forbidden("User is no longer active"));
    }
    Ok(())
}

#[async_trait]
impl<U: UnitOfWork> SessionService for SessionManager<U> {
    async fn record_event(&self, event: AttendanceEvent) -> AppResult<EventOutcome> {
        let AttendanceEvent {
            subject,
            method,
            location,
            intent,
            occurred_at,
        } = event;

        let (employee, confidence) = match self.find_subject(subject).await? {
            Resolved::Known(employee, confidence) => (employee, confidence),
            Resolved::Unrecognized(identity) => {
                return Ok(EventOutcome::NotRecognized { identity })
            }
        };
        ensure_eligible(&employee)?;

        let user_id = employee.id;
        let policy = self.policy.clone();
        let write = PendingWrite {
            user_id,
            method,
            location,
            intent,
            occurred_at,
        };

        let guard = self.locks.lock(user_id).await?;
        let result = crate::with_transaction!(self.uow, |ctx| {
            apply_event(&ctx.attendance(), &policy, write).await
        });
        if let Err(e) = guard.release().await {
            tracing::warn!(%user_id, error = %e, "Failed to release user lock");
        }

        let (transition, record) = result?;
        tracing::info!(
            %user_id,
            record_id = %record.id,
            ?transition,
            method = method.as_str(),
            "Attendance event recorded"
        );

        Ok(match transition {
            Transition::CheckIn => EventOutcome::CheckedIn { record, confidence },
            Transition::CheckOut => EventOutcome::CheckedOut { record, confidence },
        })
    }
}

struct PendingWrite {
    user_id: Uuid,
    method: CheckMethod,
    location: Option<String>,
    intent: EventIntent,
    occurred_at: DateTime<Utc>,
}

async fn apply_event(
    ledger: &TxAttendanceRepository<'_>,
    policy: &AttendancePolicy,
    write: PendingWrite,
) -> AppResult<(Transition, AttendanceRecord)> {
    let date = policy.local_date(write.occurred_at);
    let open = ledger.find_open_for_user(write.user_id).await?;
    let today = ledger.find_for_user_on(write.user_id, date).await?;

    let transition =
        decide(write.intent, open.as_ref(), today.as_ref()).map_err(AppError::Conflict)?;

    let record = match (transition, open) {
        (Transition::CheckOut, Some(mut record)) => {
            // Hours clamp at zero if clocks disagree
            record.check_out_time = Some(write.occurred_at);
            record.method = write.method;
            if write.location.is_some() {
                record.location = write.location;
            }
            record.recompute_hours();
            ledger.close(&record).await?
        }
        (Transition::CheckOut, None) => {
            return Err(AppError::Conflict(ConflictReason::AlreadyCheckedOut))
        }
        (Transition::CheckIn, _) => {
            let new = NewAttendanceRecord {
                user_id: write.user_id,
                date,
                check_in_time: Some(write.occurred_at),
                check_out_time: None,
                status: AttendanceStatus::Present,
                method: write.method,
                location: write.location,
                total_hours: 0.0,
                overtime_hours: 0.0,
                is_late: policy.is_late(write.occurred_at),
            };
            ledger.insert(new).await.map_err(lost_check_in_race)?
        }
    };

    Ok((transition, record))
}

/// A writer on another instance won the race to the unique indexes; report
/// it the way `decide` would have had it seen that writer's row.
fn lost_check_in_race(e: AppError) -> AppError {
    match e {
        AppError::Conflict(ConflictReason::DuplicateRecord) => {
            AppError::Conflict(ConflictReason::DayAlreadyRecorded)
        }
        AppError::Conflict(ConflictReason::OpenSessionExists) => {
            AppError::Conflict(ConflictReason::AlreadyCheckedIn)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_conflicts_read_as_session_conflicts() {
        let day = lost_check_in_race(AppError::Conflict(ConflictReason::DuplicateRecord));
        assert_eq!(day.code(), "DAY_ALREADY_RECORDED");

        let open = lost_check_in_race(AppError::Conflict(ConflictReason::OpenSessionExists));
        assert_eq!(open.code(), "ALREADY_CHECKED_IN");
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err = lost_check_in_race(AppError::internal("pool closed"));
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}
