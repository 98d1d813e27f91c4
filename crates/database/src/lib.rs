//! # Vendorlens Database Crate
//!
//! This crate acts as a high-level, application-specific interface to the
//! SQLite record store. It holds the four raw input relations and the
//! published `vendor_summary` relation.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** This crate encapsulates all database-specific logic. It
//!   provides a clean API to the rest of the application, hiding the underlying
//!   SQL and database implementation details.
//! - **Explicit Handle:** Nothing here is global. The entry point opens one pool
//!   and hands a `DbRepository` to every stage that needs the store.
//! - **Replace, Never Merge:** Raw relations and the summary are replaced as a
//!   whole, each inside a single transaction.
//!
//! ## Public API
//!
//! - `connect` / `connect_in_memory`: open the store.
//! - `run_migrations`: create the raw relations if they do not exist.
//! - `DbRepository`: loading, aggregation, publishing and reading.
//! - `AggregationQuery`: the parameters of the grouped aggregation.
//! - `DbError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod aggregation;
pub mod connection;
pub mod error;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use aggregation::AggregationQuery;
pub use connection::{connect, connect_in_memory, run_migrations};
pub use error::DbError;
pub use repository::{DbRepository, RelationCount, SUMMARY_TABLE, SummaryFilter};
