//! Integration tests for check-in/check-out sessions against a real ledger.

mod common;

use std::sync::Arc;

use attendance_engine::domain::{
    AttendanceStatus, CheckMethod, ConflictReason, Embedding, EventIntent, MatchOutcome,
    NewAttendanceRecord, RecordFilter,
};
use attendance_engine::errors::AppError;
use attendance_engine::infra::{
    AttendanceRepository, LocalUserLocks, MockEmbeddingExtractor, UnitOfWork,
};
use attendance_engine::services::{
    AttendanceEvent, EventOutcome, EventSubject, LedgerService, MockIdentityService,
    SessionManager, SessionService,
};
use attendance_engine::with_transaction;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use common::{approx, at, day, TestLedger};

fn event(user_id: Uuid, occurred_at: DateTime<Utc>) -> AttendanceEvent {
    AttendanceEvent {
        occurred_at,
        ..AttendanceEvent::new(EventSubject::UserId(user_id))
    }
}

fn extractor_returning(values: Vec<f32>) -> Arc<MockEmbeddingExtractor> {
    let mut extractor = MockEmbeddingExtractor::new();
    extractor
        .expect_extract()
        .returning(move |_| Embedding::new(values.clone()));
    Arc::new(extractor)
}

#[tokio::test]
async fn test_check_in_then_check_out_computes_hours() {
    let ledger = TestLedger::new().await;
    let user = ledger.seed_user("E-100").await;
    let sessions = ledger.sessions();

    let checked_in = sessions
        .record_event(event(user, at(2024, 1, 10, 9, 0)))
        .await
        .unwrap();
    let EventOutcome::CheckedIn { record, confidence } = checked_in else {
        panic!("expected check-in, got {:?}", checked_in);
    };
    assert_eq!(record.date, day(2024, 1, 10));
    assert_eq!(record.status, AttendanceStatus::Present);
    assert!(record.is_open());
    assert!(confidence.is_none());

    let checked_out = sessions
        .record_event(event(user, at(2024, 1, 10, 17, 30)))
        .await
        .unwrap();
    let EventOutcome::CheckedOut { record: closed, .. } = checked_out else {
        panic!("expected check-out, got {:?}", checked_out);
    };
    assert_eq!(closed.id, record.id);
    assert_eq!(closed.check_out_time, Some(at(2024, 1, 10, 17, 30)));
    assert!(approx(closed.total_hours, 8.5));
    assert!(approx(closed.overtime_hours, 0.5));
}

#[tokio::test]
async fn test_auto_event_after_closed_day_is_already_checked_out() {
    let ledger = TestLedger::new().await;
    let user = ledger.seed_user("E-101").await;
    let sessions = ledger.sessions();

    sessions.record_event(event(user, at(2024, 1, 10, 9, 0))).await.unwrap();
    sessions.record_event(event(user, at(2024, 1, 10, 17, 0))).await.unwrap();

    let err = sessions
        .record_event(event(user, at(2024, 1, 10, 18, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictReason::AlreadyCheckedOut)));
}

#[tokio::test]
async fn test_explicit_intents_reject_wrong_direction() {
    let ledger = TestLedger::new().await;
    let user = ledger.seed_user("E-102").await;
    let sessions = ledger.sessions();

    let mut check_out = event(user, at(2024, 1, 10, 8, 0));
    check_out.intent = EventIntent::CheckOut;
    let err = sessions.record_event(check_out).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictReason::AlreadyCheckedOut)));

    sessions.record_event(event(user, at(2024, 1, 10, 9, 0))).await.unwrap();

    let mut check_in = event(user, at(2024, 1, 10, 9, 5));
    check_in.intent = EventIntent::CheckIn;
    let err = sessions.record_event(check_in).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictReason::AlreadyCheckedIn)));
    assert_eq!(err.code(), "ALREADY_CHECKED_IN");
}

#[tokio::test]
async fn test_overnight_session_closes_next_day() {
    let ledger = TestLedger::new().await;
    let user = ledger.seed_user("E-103").await;
    let sessions = ledger.sessions();

    sessions.record_event(event(user, at(2024, 1, 10, 22, 0))).await.unwrap();
    let outcome = sessions
        .record_event(event(user, at(2024, 1, 11, 6, 0)))
        .await
        .unwrap();

    let EventOutcome::CheckedOut { record, .. } = outcome else {
        panic!("expected check-out, got {:?}", outcome);
    };
    assert_eq!(record.date, day(2024, 1, 10));
    assert!(approx(record.total_hours, 8.0));
    assert!(approx(record.overtime_hours, 0.0));
}

#[tokio::test]
async fn test_check_out_keeps_location_unless_given() {
    let ledger = TestLedger::new().await;
    let user = ledger.seed_user("E-104").await;
    let sessions = ledger.sessions();

    let mut check_in = event(user, at(2024, 1, 10, 9, 0));
    check_in.location = Some("Lobby".to_string());
    sessions.record_event(check_in).await.unwrap();

    let mut check_out = event(user, at(2024, 1, 10, 12, 0));
    check_out.method = CheckMethod::Manual;
    let outcome = sessions.record_event(check_out).await.unwrap();

    let record = outcome.record().expect("record written");
    assert_eq!(record.location.as_deref(), Some("Lobby"));
    assert_eq!(record.method, CheckMethod::Manual);
}

#[tokio::test]
async fn test_admins_and_departed_users_are_rejected() {
    let ledger = TestLedger::new().await;
    let admin = ledger.seed_admin("A-001").await;
    let departed = ledger.seed_departed("E-105").await;
    let sessions = ledger.sessions();

    let err = sessions
        .record_event(event(admin, at(2024, 1, 10, 9, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = sessions
        .record_event(event(departed, at(2024, 1, 10, 9, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = sessions
        .record_event(event(Uuid::new_v4(), at(2024, 1, 10, 9, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("User")));
}

#[tokio::test]
async fn test_event_by_employee_code() {
    let ledger = TestLedger::new().await;
    let user = ledger.seed_user("BADGE-7").await;
    let sessions = ledger.sessions();

    let mut badge = AttendanceEvent::new(EventSubject::EmployeeId("BADGE-7".to_string()));
    badge.method = CheckMethod::Manual;
    let outcome = sessions.record_event(badge).await.unwrap();

    assert!(matches!(outcome, EventOutcome::CheckedIn { .. }));
    assert_eq!(outcome.record().map(|r| r.user_id), Some(user));
}

#[tokio::test]
async fn test_recognized_face_checks_in_with_confidence() {
    let ledger = TestLedger::new().await;
    let user = ledger.seed_user("E-106").await;
    let other = ledger.seed_user("E-107").await;
    ledger.enroll(user, vec![0.1, 0.2, 0.3]).await;
    ledger.enroll(other, vec![0.9, 0.9, 0.9]).await;

    let identity = ledger.identity(extractor_returning(vec![0.1, 0.2, 0.35]));
    let sessions = ledger.sessions_with(identity);

    let outcome = sessions
        .record_event(AttendanceEvent::new(EventSubject::Image(vec![1, 2, 3])))
        .await
        .unwrap();

    let EventOutcome::CheckedIn { record, confidence } = outcome else {
        panic!("expected check-in, got {:?}", outcome);
    };
    assert_eq!(record.user_id, user);
    assert_eq!(record.method, CheckMethod::Face);
    let confidence = confidence.expect("face events carry confidence");
    assert!((confidence - 0.95).abs() < 1e-6);
}

#[tokio::test]
async fn test_unknown_face_writes_nothing() {
    let ledger = TestLedger::new().await;
    let user = ledger.seed_user("E-108").await;
    ledger.enroll(user, vec![0.1, 0.2, 0.3]).await;

    let identity = ledger.identity(extractor_returning(vec![5.0, 5.0, 5.0]));
    let sessions = ledger.sessions_with(identity);

    let outcome = sessions
        .record_event(AttendanceEvent::new(EventSubject::Image(vec![1, 2, 3])))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        EventOutcome::NotRecognized {
            identity: MatchOutcome::NoMatch { .. }
        }
    ));
    let records = ledger
        .ledger()
        .list_for_user(user, RecordFilter::default())
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_concurrent_check_ins_leave_one_open_record() {
    let ledger = TestLedger::new().await;
    let user = ledger.seed_user("E-109").await;
    let sessions = Arc::new(ledger.sessions());

    let attempts = (0..5).map(|i| {
        let sessions = sessions.clone();
        let mut check_in = event(user, at(2024, 1, 10, 9, i));
        check_in.intent = EventIntent::CheckIn;
        tokio::spawn(async move { sessions.record_event(check_in).await })
    });
    let results = futures::future::join_all(attempts).await;

    let mut checked_in = 0;
    for result in results {
        match result.expect("task completes") {
            Ok(EventOutcome::CheckedIn { .. }) => checked_in += 1,
            Err(AppError::Conflict(ConflictReason::AlreadyCheckedIn)) => {}
            other => panic!("unexpected outcome {:?}", other),
        }
    }
    assert_eq!(checked_in, 1);

    let records = ledger
        .ledger()
        .list_for_user(user, RecordFilter::default())
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_open());
}

// =============================================================================
// Storage guards behind the per-user lock
// =============================================================================

fn open_session(user_id: Uuid, check_in: DateTime<Utc>) -> NewAttendanceRecord {
    NewAttendanceRecord {
        user_id,
        date: check_in.date_naive(),
        check_in_time: Some(check_in),
        check_out_time: None,
        status: AttendanceStatus::Present,
        method: CheckMethod::Rfid,
        location: None,
        total_hours: 0.0,
        overtime_hours: 0.0,
        is_late: false,
    }
}

#[tokio::test]
async fn test_stale_copy_cannot_close_a_finished_session() {
    let ledger = TestLedger::new().await;
    let user = ledger.seed_user("E-130").await;

    let opened = with_transaction!(ledger.uow, |ctx| {
        ctx.attendance()
            .insert(open_session(user, at(2024, 1, 10, 9, 0)))
            .await
    })
    .unwrap();

    // Two writers each read the open record before either closed it
    let mut first = opened.clone();
    first.check_out_time = Some(at(2024, 1, 10, 17, 0));
    first.recompute_hours();
    let mut stale = opened.clone();
    stale.check_out_time = Some(at(2024, 1, 10, 12, 0));
    stale.recompute_hours();

    let closed = with_transaction!(ledger.uow, |ctx| {
        ctx.attendance().close(&first).await
    })
    .unwrap();
    assert!(approx(closed.total_hours, 8.0));

    let err = with_transaction!(ledger.uow, |ctx| {
        ctx.attendance().close(&stale).await
    })
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Conflict(ConflictReason::AlreadyCheckedOut)
    ));

    let stored = ledger
        .uow
        .attendance()
        .find_by_id(opened.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.check_out_time, Some(at(2024, 1, 10, 17, 0)));
    assert!(approx(stored.total_hours, 8.0));
}

#[tokio::test]
async fn test_unique_indexes_reject_unlocked_writers() {
    let ledger = TestLedger::new().await;
    let user = ledger.seed_user("E-131").await;

    with_transaction!(ledger.uow, |ctx| {
        ctx.attendance()
            .insert(open_session(user, at(2024, 1, 10, 9, 0)))
            .await
    })
    .unwrap();

    // A second open session on another day hits the open-session index
    let err = with_transaction!(ledger.uow, |ctx| {
        ctx.attendance()
            .insert(open_session(user, at(2024, 1, 11, 9, 0)))
            .await
    })
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Conflict(ConflictReason::OpenSessionExists)
    ));

    // A closed record on the same day hits the (user, date) index
    let mut same_day = open_session(user, at(2024, 1, 10, 8, 0));
    same_day.check_out_time = Some(at(2024, 1, 10, 10, 0));
    let err = with_transaction!(ledger.uow, |ctx| {
        ctx.attendance().insert(same_day).await
    })
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Conflict(ConflictReason::DuplicateRecord)
    ));

    let records = ledger
        .ledger()
        .list_for_user(user, RecordFilter::default())
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_separate_instances_share_one_open_session() {
    let ledger = TestLedger::new().await;
    let user = ledger.seed_user("E-132").await;

    // Each instance has its own in-process locks
    let first = ledger.sessions();
    let second = SessionManager::new(
        ledger.uow.clone(),
        Arc::new(MockIdentityService::new()),
        Arc::new(LocalUserLocks::new()),
        ledger.policy.clone(),
    );

    let check_in = |at_time| AttendanceEvent {
        intent: EventIntent::CheckIn,
        ..event(user, at_time)
    };
    first
        .record_event(check_in(at(2024, 1, 10, 9, 0)))
        .await
        .unwrap();
    let err = second
        .record_event(check_in(at(2024, 1, 10, 9, 1)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Conflict(ConflictReason::AlreadyCheckedIn)
    ));

    let closed = second
        .record_event(event(user, at(2024, 1, 10, 17, 0)))
        .await
        .unwrap();
    assert!(matches!(closed, EventOutcome::CheckedOut { .. }));
    let err = first
        .record_event(AttendanceEvent {
            intent: EventIntent::CheckOut,
            ..event(user, at(2024, 1, 10, 17, 5))
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Conflict(ConflictReason::AlreadyCheckedOut)
    ));
}
