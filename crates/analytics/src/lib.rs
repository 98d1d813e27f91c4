//! # Vendorlens Analytics Engine
//!
//! This crate provides the statistical analysis of the published vendor
//! summary: distributions, correlations, rankings, and the profit-margin
//! comparison between top- and low-performing vendors.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** This crate has no knowledge of the store. It takes
//!   `VendorSummary` rows as input and produces an `AnalysisReport`.
//! - **Stateless Calculation:** The `AnalyticsEngine` holds only its
//!   configuration, which makes it reliable and easy to test.
//! - **No NaN:** Empty groups, single observations and zero variance yield
//!   `None`, never a NaN or an infinity.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: The main struct that contains the analysis logic.
//! - `AnalysisReport`: Every section of the analysis in one serializable struct.
//! - `stats`: The statistical primitives the engine is built from.
//! - `AnalyticsError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod report;
pub mod stats;

// Re-export the key components to create a clean, public-facing API.
pub use engine::{AnalyticsEngine, NUMERIC_COLUMNS};
pub use error::AnalyticsError;
pub use report::{
    AnalysisReport, BrandPerformance, ColumnSummary, CorrelationMatrix, MarginComparison, OrderSize,
    OrderSizeBucket, PromotionCandidates, PurchaseContribution, Ranked, UnsoldInventory,
    VendorContribution,
};
pub use stats::{ConfidenceInterval, WelchTest};
