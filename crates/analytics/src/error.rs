use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid analysis parameter: {0}")]
    InvalidParameter(String),

    #[error("Distribution error: {0}")]
    Distribution(String),
}
