//! Integration tests for API endpoints.
//!
//! These tests drive the router with mock services, so no database,
//! Redis or extractor is needed.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use attendance_engine::api::create_router;
use attendance_engine::domain::{
    AttendanceRecord, AttendanceStatus, CheckMethod, MatchOutcome, StatusBreakdown,
};
use attendance_engine::services::{
    AuthService, Claims, EventOutcome, EventSubject, LedgerService, MockLedgerService,
    MockReportService, MockServiceContainer, MockSessionService, ReportService, SessionService,
    TokenVerifier,
};
use attendance_engine::AppState;

const SECRET: &[u8] = b"test-secret-key-for-testing-only-32chars";

// =============================================================================
// Test Helpers
// =============================================================================

fn token(user_id: Uuid, role: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        exp: now + 3600,
        iat: now,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

/// Container whose auth verifies tokens signed with `SECRET`.
fn container() -> MockServiceContainer {
    let auth: Arc<dyn AuthService> = Arc::new(TokenVerifier::new(SECRET));
    let mut container = MockServiceContainer::new();
    container.expect_auth().returning(move || auth.clone());
    container
}

fn app(container: MockServiceContainer) -> Router {
    create_router(AppState::new(Arc::new(container)))
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(t) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn open_record(user_id: Uuid) -> AttendanceRecord {
    let now = Utc::now();
    AttendanceRecord {
        id: Uuid::new_v4(),
        user_id,
        date: now.date_naive(),
        check_in_time: Some(now),
        check_out_time: None,
        status: AttendanceStatus::Present,
        method: CheckMethod::Rfid,
        location: None,
        total_hours: 0.0,
        overtime_hours: 0.0,
        is_late: false,
        created_at: now,
        updated_at: now,
    }
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_without_infrastructure() {
    let response = app(container()).oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["database"]["status"], "disabled");
    assert_eq!(body["services"]["redis"]["status"], "disabled");
}

// =============================================================================
// Authentication & Authorization
// =============================================================================

#[tokio::test]
async fn test_self_service_requires_token() {
    let response = app(container())
        .oneshot(get("/attendance/me/records", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let response = app(container())
        .oneshot(get("/attendance/me/records", Some("not-a-jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn test_admin_routes_forbid_employees() {
    let employee = token(Uuid::new_v4(), "employee");

    for uri in ["/admin/attendance/summary", "/analytics/status-breakdown"] {
        let response = app(container())
            .oneshot(get(uri, Some(&employee)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
    }
}

#[tokio::test]
async fn test_admin_can_read_analytics() {
    let mut reports = MockReportService::new();
    reports.expect_status_breakdown().times(1).returning(|| {
        Ok(StatusBreakdown {
            present: 3,
            total: 3,
            ..Default::default()
        })
    });
    let reports: Arc<dyn ReportService> = Arc::new(reports);

    let mut container = container();
    container
        .expect_reports()
        .returning(move || reports.clone());

    let admin = token(Uuid::new_v4(), "admin");
    let response = app(container)
        .oneshot(get("/analytics/status-breakdown", Some(&admin)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["present"], 3);
    assert_eq!(body["onLeave"], 0);
}

// =============================================================================
// Events
// =============================================================================

#[tokio::test]
async fn test_unrecognized_face_is_not_found() {
    let mut sessions = MockSessionService::new();
    sessions
        .expect_record_event()
        .withf(|event| {
            matches!(event.subject, EventSubject::Image(ref bytes) if bytes == &[1, 2, 3])
        })
        .returning(|_| {
            Ok(EventOutcome::NotRecognized {
                identity: MatchOutcome::NoMatch {
                    nearest_distance: Some(0.9),
                },
            })
        });
    let sessions: Arc<dyn SessionService> = Arc::new(sessions);

    let mut container = container();
    container
        .expect_sessions()
        .returning(move || sessions.clone());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/attendance/scan?location=Lobby")
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(vec![1u8, 2, 3]))
        .unwrap();
    let response = app(container).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "FACE_NOT_RECOGNIZED");
    assert_eq!(body["identity"]["outcome"], "no_match");
}

#[tokio::test]
async fn test_scan_rejects_unknown_method() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/attendance/scan?method=telepathy")
        .body(Body::from(vec![1u8]))
        .unwrap();
    let response = app(container()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mark_checks_in_by_user_id() {
    let user_id = Uuid::new_v4();
    let mut sessions = MockSessionService::new();
    sessions
        .expect_record_event()
        .withf(move |event| {
            event.subject == EventSubject::UserId(user_id) && event.method == CheckMethod::Rfid
        })
        .returning(move |_| {
            Ok(EventOutcome::CheckedIn {
                record: open_record(user_id),
                confidence: None,
            })
        });
    let sessions: Arc<dyn SessionService> = Arc::new(sessions);

    let mut container = container();
    container
        .expect_sessions()
        .returning(move || sessions.clone());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/attendance/mark")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "userId": user_id, "method": "rfid" }).to_string(),
        ))
        .unwrap();
    let response = app(container).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["action"], "checked_in");
    assert_eq!(body["record"]["userId"], user_id.to_string());
}

#[tokio::test]
async fn test_mark_stamps_events_with_server_clock() {
    let user_id = Uuid::new_v4();
    let before = Utc::now();
    let mut sessions = MockSessionService::new();
    sessions
        .expect_record_event()
        .withf(move |event| event.occurred_at >= before)
        .times(1)
        .returning(move |_| {
            Ok(EventOutcome::CheckedIn {
                record: open_record(user_id),
                confidence: None,
            })
        });
    let sessions: Arc<dyn SessionService> = Arc::new(sessions);

    let mut container = container();
    container
        .expect_sessions()
        .returning(move || sessions.clone());

    // A client-supplied timestamp is ignored
    let request = Request::builder()
        .method(Method::POST)
        .uri("/attendance/mark")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({
                "userId": user_id,
                "occurredAt": "2020-01-01T00:00:00Z"
            })
            .to_string(),
        ))
        .unwrap();
    let response = app(container).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_mark_requires_exactly_one_subject() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/attendance/mark")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "userId": Uuid::new_v4(), "employeeId": "E-1" }).to_string(),
        ))
        .unwrap();
    let response = app(container()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

// =============================================================================
// Self-service & Admin
// =============================================================================

#[tokio::test]
async fn test_my_records_are_scoped_to_caller() {
    let caller = Uuid::new_v4();
    let mut ledger = MockLedgerService::new();
    ledger
        .expect_list_for_user()
        .withf(move |user_id, filter| {
            *user_id == caller && filter.status == Some(AttendanceStatus::Late)
        })
        .times(1)
        .returning(|_, _| Ok(vec![]));
    let ledger: Arc<dyn LedgerService> = Arc::new(ledger);

    let mut container = container();
    container.expect_ledger().returning(move || ledger.clone());

    let response = app(container)
        .oneshot(get(
            "/attendance/me/records?status=late",
            Some(&token(caller, "employee")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_unknown_period_is_bad_request() {
    let admin = token(Uuid::new_v4(), "admin");
    let response = app(container())
        .oneshot(get("/admin/attendance/summary?period=yearly", Some(&admin)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_admin_listing_rejects_unknown_status() {
    let admin = token(Uuid::new_v4(), "admin");
    let uri = format!("/admin/attendance/users/{}?status=sleeping", Uuid::new_v4());
    let response = app(container())
        .oneshot(get(&uri, Some(&admin)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_my_summary_rejects_unknown_period() {
    let response = app(container())
        .oneshot(get(
            "/attendance/me/summary?period=hourly",
            Some(&token(Uuid::new_v4(), "employee")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_delete_returns_no_content() {
    let id = Uuid::new_v4();
    let mut ledger = MockLedgerService::new();
    ledger
        .expect_delete()
        .withf(move |record_id| *record_id == id)
        .times(1)
        .returning(|_| Ok(()));
    let ledger: Arc<dyn LedgerService> = Arc::new(ledger);

    let mut container = container();
    container.expect_ledger().returning(move || ledger.clone());

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/admin/attendance/{}", id))
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", token(Uuid::new_v4(), "admin")),
        )
        .body(Body::empty())
        .unwrap();
    let response = app(container).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
