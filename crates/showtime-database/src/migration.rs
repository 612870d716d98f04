//! Seat store schema migrations.

use sqlx::PgPool;
use sqlx::migrate::{MigrateError, Migrator};
use tracing::info;

use showtime_core::error::{AppError, ErrorKind};
use showtime_core::result::AppResult;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Applies pending migrations. Returns the schema version now in place.
pub async fn run_migrations(pool: &PgPool) -> AppResult<i64> {
    let version = schema_version();
    MIGRATOR.run(pool).await.map_err(migration_error)?;
    info!(schema_version = version, "Seat store schema up to date");
    Ok(version)
}

/// Newest migration version shipped with this build.
pub fn schema_version() -> i64 {
    MIGRATOR.iter().map(|m| m.version).max().unwrap_or(0)
}

/// A database that disagrees with the shipped migrations needs an operator,
/// anything else is a store failure.
fn migration_error(err: MigrateError) -> AppError {
    let kind = match err {
        MigrateError::VersionMissing(_)
        | MigrateError::VersionMismatch(_)
        | MigrateError::Dirty(_) => ErrorKind::Configuration,
        _ => ErrorKind::Database,
    };
    AppError::with_source(kind, format!("Seat store migration failed: {err}"), err)
}
