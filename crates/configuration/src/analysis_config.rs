use serde::{Deserialize, Serialize};

/// Configuration of the statistical analysis over the published summary.
/// This is the `[analysis]` section of `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Length of every "top N" ranking (vendors, brands, contribution, ...).
    pub top_n: usize,
    /// Confidence level of the profit-margin intervals, e.g. 0.95.
    pub confidence: f64,
    /// Significance level of the margin comparison t-test.
    pub alpha: f64,
    /// Brands selling more than this are not considered promotion candidates.
    pub brand_sales_ceiling: f64,
    /// Quantile thresholds used to pick promotion candidates.
    pub thresholds: Thresholds,
}

/// Quantile cut-offs used by the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Brands at or below this sales quantile count as low sellers.
    pub low_sales_quantile: f64,
    /// Brands at or above this margin quantile count as high margin.
    pub high_margin_quantile: f64,
    /// Rows at or above this sales quantile are "top" performers.
    pub top_performer_quantile: f64,
    /// Rows at or below this sales quantile are "low" performers.
    pub low_performer_quantile: f64,
}

// --- Default Implementations ---
// This allows a user to omit the `[analysis]` section from their toml
// and still have it work with sensible defaults.

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            confidence: 0.95,
            alpha: 0.05,
            brand_sales_ceiling: 10_000.0,
            thresholds: Thresholds::default(),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low_sales_quantile: 0.15,
            high_margin_quantile: 0.85,
            top_performer_quantile: 0.75,
            low_performer_quantile: 0.25,
        }
    }
}
