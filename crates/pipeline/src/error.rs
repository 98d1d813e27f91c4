use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Input error: {0}")]
    Ingest(#[from] ingestion::IngestError),

    #[error("Aggregation error: {0}")]
    Aggregate(#[from] aggregator::AggregateError),

    #[error("Database error occurred during the batch: {0}")]
    Database(#[from] database::DbError),

    #[error("Progress bar template error: {0}")]
    ProgressBarTemplate(String),

    #[error("Input reader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<indicatif::style::TemplateError> for PipelineError {
    fn from(error: indicatif::style::TemplateError) -> Self {
        PipelineError::ProgressBarTemplate(error.to_string())
    }
}
