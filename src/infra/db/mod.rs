//! Database connection and schema management.
//!
//! PostgreSQL in production; the same entities and migrations also run on
//! SQLite, which the integration tests use in memory.

use std::collections::HashSet;
use std::time::Duration;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection, DbErr,
    EntityTrait,
};
use sea_orm_migration::{seaql_migrations, MigratorTrait};

use crate::config::{Config, DEFAULT_DB_ACQUIRE_TIMEOUT_SECS, DEFAULT_DB_MAX_CONNECTIONS};

pub mod migrations;

pub use migrations::Migrator;

/// Pooled connection to the ledger database.
#[derive(Clone)]
pub struct Database {
    connection: DatabaseConnection,
}

fn connect_options(config: &Config) -> ConnectOptions {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(DEFAULT_DB_MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(DEFAULT_DB_ACQUIRE_TIMEOUT_SECS))
        .sqlx_logging(false);
    options
}

impl Database {
    /// Connect and bring the schema up to date.
    pub async fn connect(config: &Config) -> Result<Self, DbErr> {
        let db = Self::connect_without_migrations(config).await?;
        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to apply migrations");
            e
        })?;
        tracing::info!(
            backend = ?db.connection.get_database_backend(),
            "Database connected and migrations applied"
        );
        Ok(db)
    }

    /// Connect only; used by the `migrate` command.
    pub async fn connect_without_migrations(config: &Config) -> Result<Self, DbErr> {
        let connection = SeaDatabase::connect(connect_options(config)).await?;
        Ok(Self { connection })
    }

    /// Handle for repositories; clones share the pool.
    pub fn get_connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    pub async fn run_migrations(&self) -> Result<(), DbErr> {
        Migrator::up(&self.connection, None).await
    }

    /// Undo the most recent migration.
    pub async fn rollback_migration(&self) -> Result<(), DbErr> {
        Migrator::down(&self.connection, Some(1)).await
    }

    /// Every known migration, in order, with whether it has been applied.
    pub async fn migration_status(&self) -> Result<Vec<(String, bool)>, DbErr> {
        let applied: HashSet<String> = seaql_migrations::Entity::find()
            .all(&self.connection)
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect();

        Ok(Migrator::migrations()
            .iter()
            .map(|m| (m.name().to_string(), applied.contains(m.name())))
            .collect())
    }

    /// Drop all tables and re-run every migration.
    pub async fn fresh_migrations(&self) -> Result<(), DbErr> {
        Migrator::fresh(&self.connection).await
    }

    /// Round-trip to the database for the health check.
    pub async fn ping(&self) -> Result<(), DbErr> {
        self.connection.ping().await
    }
}
