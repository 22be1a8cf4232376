//! Database migration runners, one per logical store.

use sqlx::PgPool;
use tracing::info;

use idguard_core::error::{AppError, ErrorKind};

/// Run all pending identity store migrations.
pub async fn run_identity_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Running identity store migrations...");

    sqlx::migrate!("../../migrations/identity")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to run identity migrations: {e}"),
                e,
            )
        })?;

    info!("Identity store migrations completed");
    Ok(())
}

/// Run all pending audit store migrations.
pub async fn run_audit_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Running audit store migrations...");

    sqlx::migrate!("../../migrations/audit")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to run audit migrations: {e}"),
                e,
            )
        })?;

    info!("Audit store migrations completed");
    Ok(())
}
