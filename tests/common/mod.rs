//! Shared fixtures for integration tests.
//!
//! Every test gets its own in-memory SQLite ledger with the real
//! migrations applied, so the unique indexes behave as in production.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use attendance_engine::config::{AttendancePolicy, MatchSettings, ROLE_ADMIN, ROLE_EMPLOYEE};
use attendance_engine::domain::Embedding;
use attendance_engine::infra::repositories::entities::face_embedding::encode_vector;
use attendance_engine::infra::repositories::entities::{FaceEmbeddingActiveModel, UserActiveModel};
use attendance_engine::infra::{
    EmbeddingExtractor, LocalUserLocks, Migrator, Persistence, UnitOfWork, UserLocks,
};
use attendance_engine::services::{
    IdentityResolver, IdentityService, LedgerManager, MockIdentityService, ReportManager,
    SessionManager,
};

/// One isolated database plus the pieces services are built from.
pub struct TestLedger {
    pub db: DatabaseConnection,
    pub uow: Arc<Persistence>,
    pub locks: Arc<dyn UserLocks>,
    pub policy: AttendancePolicy,
}

impl TestLedger {
    pub async fn new() -> Self {
        // A single pooled connection keeps the in-memory database alive
        let mut options = ConnectOptions::new("sqlite::memory:");
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let db = sea_orm::Database::connect(options)
            .await
            .expect("in-memory sqlite");
        Migrator::up(&db, None).await.expect("migrations apply");

        Self {
            uow: Arc::new(Persistence::new(db.clone())),
            db,
            locks: Arc::new(LocalUserLocks::new()),
            policy: AttendancePolicy::default(),
        }
    }

    pub async fn seed_user(&self, employee_id: &str) -> Uuid {
        self.insert_user(employee_id, ROLE_EMPLOYEE, None).await
    }

    pub async fn seed_admin(&self, employee_id: &str) -> Uuid {
        self.insert_user(employee_id, ROLE_ADMIN, None).await
    }

    pub async fn seed_departed(&self, employee_id: &str) -> Uuid {
        self.insert_user(employee_id, ROLE_EMPLOYEE, Some(Utc::now()))
            .await
    }

    async fn insert_user(
        &self,
        employee_id: &str,
        role: &str,
        departed_at: Option<DateTime<Utc>>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        UserActiveModel {
            id: Set(id),
            employee_id: Set(employee_id.to_string()),
            name: Set(format!("Employee {}", employee_id)),
            role: Set(role.to_string()),
            departed_at: Set(departed_at),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
        .expect("seed user");
        id
    }

    pub async fn enroll(&self, user_id: Uuid, values: Vec<f32>) {
        let embedding = Embedding::new(values).expect("valid embedding");
        FaceEmbeddingActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            vector: Set(encode_vector(&embedding).expect("encodable")),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
        .expect("seed embedding");
    }

    /// Session manager for events that name the user directly.
    pub fn sessions(&self) -> SessionManager<Persistence> {
        self.sessions_with(Arc::new(MockIdentityService::new()))
    }

    pub fn sessions_with(&self, identity: Arc<dyn IdentityService>) -> SessionManager<Persistence> {
        SessionManager::new(
            self.uow.clone(),
            identity,
            self.locks.clone(),
            self.policy.clone(),
        )
    }

    /// Identity resolver over this ledger's directory with 3-dimensional probes.
    pub fn identity(&self, extractor: Arc<dyn EmbeddingExtractor>) -> Arc<dyn IdentityService> {
        Arc::new(IdentityResolver::new(
            self.uow.directory(),
            extractor,
            match_settings(),
        ))
    }

    pub fn ledger(&self) -> LedgerManager<Persistence> {
        LedgerManager::new(self.uow.clone(), self.locks.clone(), self.policy.clone())
    }

    pub fn reports(&self) -> ReportManager<Persistence> {
        ReportManager::new(self.uow.clone(), self.policy.clone())
    }
}

pub fn match_settings() -> MatchSettings {
    MatchSettings {
        dimension: 3,
        ..Default::default()
    }
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .expect("valid instant")
}

/// Float comparison for derived hours.
pub fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}
