use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database location: {0}")]
    ConnectionConfigError(String),

    #[error("Database operation failed: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("The vendor summary has not been published yet; run `summarize` first.")]
    SummaryNotPublished,
}
