use core_types::SummaryKey;
use database::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Aggregation query failed: {0}")]
    Database(#[from] DbError),

    #[error(
        "{key} appears in {rows} aggregated rows ({conflicting_keys} conflicting keys in total); \
         set `aggregation.key_conflict = \"merge\"` to combine them"
    )]
    DuplicateKey {
        key: SummaryKey,
        rows: usize,
        conflicting_keys: usize,
    },
}
