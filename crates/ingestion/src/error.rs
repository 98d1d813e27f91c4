use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Input file for relation '{relation}' not found at {path}")]
    MissingFile { relation: String, path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path} line {line}: column '{column}' holds the non-finite value {value}")]
    NonFinite {
        path: PathBuf,
        line: u64,
        column: &'static str,
        value: f64,
    },

    #[error("Malformed row in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
