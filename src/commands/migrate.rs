//! Migrate command - Applies or inspects the ledger schema.

use sea_orm::DbErr;

use crate::cli::args::{MigrateAction, MigrateArgs};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::Database;

fn migration_failed(action: &MigrateAction) -> impl Fn(DbErr) -> AppError + '_ {
    move |e| AppError::internal(format!("migrate {:?} failed: {}", action, e))
}

/// Execute the migrate command
pub async fn execute(args: MigrateArgs, config: Config) -> AppResult<()> {
    let action = args.action;

    // Pending migrations must not run implicitly here
    let db = Database::connect_without_migrations(&config)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await.map_err(migration_failed(&action))?;
            tracing::info!("Ledger schema is up to date");
        }
        MigrateAction::Down => {
            db.rollback_migration()
                .await
                .map_err(migration_failed(&action))?;
            tracing::info!("Rolled back the latest migration");
        }
        MigrateAction::Status => {
            let status = db
                .migration_status()
                .await
                .map_err(migration_failed(&action))?;
            let pending = status.iter().filter(|(_, applied)| !applied).count();
            for (name, applied) in &status {
                println!("{:<8} {}", if *applied { "applied" } else { "pending" }, name);
            }
            tracing::info!(total = status.len(), pending, "Migration status");
        }
        MigrateAction::Fresh => {
            tracing::warn!("Dropping every table, attendance history included");
            db.fresh_migrations()
                .await
                .map_err(migration_failed(&action))?;
            tracing::info!("Schema recreated from scratch");
        }
    }

    Ok(())
}
