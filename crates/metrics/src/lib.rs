//! # Vendorlens Metric Enricher
//!
//! Turns joined aggregation rows into published `VendorSummary` rows: absent
//! values become zeros, text is trimmed, `Volume` becomes a number, and four
//! derived metrics are computed.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** No I/O. Each output row depends on its input row only.
//! - **No Infinities:** A ratio with a zero denominator follows the configured
//!   `ZeroDenominatorPolicy`; inf and NaN never leave this crate.

pub mod enricher;

pub use enricher::{EnrichmentStats, MetricEnricher, coerce_volume};
