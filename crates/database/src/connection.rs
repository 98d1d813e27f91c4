use crate::error::DbError;
use configuration::DatabaseSettings;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::time::Duration;

/// Opens the SQLite store described by `settings`, creating the file if needed.
///
/// The batch runs its stages one after another, so a single connection is
/// enough; it also keeps the publish transaction the only writer.
pub async fn connect(settings: &DatabaseSettings) -> Result<SqlitePool, DbError> {
    if let Some(parent) = settings.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbError::ConnectionConfigError(format!("{}: {e}", parent.display())))?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(&settings.path)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(settings.busy_timeout_secs))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    tracing::debug!(path = %settings.path.display(), "Connected to the record store.");
    Ok(pool)
}

/// Opens a private in-memory store. Used by tests and dry runs.
pub async fn connect_in_memory() -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::new()
        .filename(":memory:")
        .create_if_missing(true);

    // Every connection to ":memory:" is a separate database, so the pool must
    // never open a second one.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Applies the embedded migrations that create the raw input relations.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
    // Use a relative path from the crate root
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
