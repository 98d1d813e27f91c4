use crate::stats::{ConfidenceInterval, WelchTest};
use serde::{Deserialize, Serialize};

/// The complete analysis of a set of vendor summary rows.
///
/// This struct is the final output of the `AnalyticsEngine`; the CLI renders
/// it as tables or as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Number of summary rows analysed.
    pub rows: usize,

    // I. Distributions
    pub describe: Vec<ColumnSummary>,
    pub correlations: CorrelationMatrix,

    // II. Rankings
    /// Vendors by summed `TotalSalesDollars`, largest first.
    pub top_vendors: Vec<Ranked>,
    /// Brands (by description) by summed `TotalSalesDollars`, largest first.
    pub top_brands: Vec<Ranked>,
    pub purchase_contribution: PurchaseContribution,

    // III. Inventory
    pub order_size_unit_price: Vec<OrderSizeBucket>,
    /// Vendors by mean `StockTurnover` over their rows turning less than once,
    /// lowest first.
    pub low_turnover_vendors: Vec<Ranked>,
    pub unsold_inventory: UnsoldInventory,

    // IV. Pricing and significance
    pub promotion_candidates: PromotionCandidates,
    pub margin_comparison: MarginComparison,
}

/// Descriptive statistics of one numeric column. Absent values are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Pearson correlations between the numeric columns, row-major in `columns`
/// order. `None` where a pair has too few observations or zero variance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// A named value in a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranked {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorContribution {
    pub vendor_name: String,
    pub total_purchase_dollars: f64,
    pub gross_profit: f64,
    pub total_sales_dollars: f64,
    /// Share of all purchase dollars, in percent.
    pub contribution_pct: f64,
    pub cumulative_pct: f64,
}

/// Pareto view of procurement spend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PurchaseContribution {
    /// The top vendors by purchase dollars, largest first.
    pub vendors: Vec<VendorContribution>,
    /// Combined share of the listed vendors, in percent.
    pub top_share_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSize {
    Small,
    Medium,
    Large,
}

/// Mean unit price of the rows in one purchase-quantity tertile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSizeBucket {
    pub size: OrderSize,
    /// Largest `TotalPurchaseQuantity` in this bucket's range.
    pub upper_bound: Option<f64>,
    pub rows: usize,
    pub mean_unit_price: Option<f64>,
}

/// Capital tied up in purchased but unsold stock, valued at purchase price.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnsoldInventory {
    pub total_value: f64,
    pub top_vendors: Vec<Ranked>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandPerformance {
    pub description: String,
    pub total_sales_dollars: f64,
    pub mean_profit_margin: f64,
}

/// Brands selling little at a high margin.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PromotionCandidates {
    pub low_sales_threshold: Option<f64>,
    pub high_margin_threshold: Option<f64>,
    pub brands: Vec<BrandPerformance>,
}

/// Profit margins of top- versus low-selling rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginComparison {
    /// `TotalSalesDollars` at or above which a row counts as top.
    pub top_threshold: Option<f64>,
    /// `TotalSalesDollars` at or below which a row counts as low.
    pub low_threshold: Option<f64>,
    pub top_count: usize,
    pub low_count: usize,
    pub top: Option<ConfidenceInterval>,
    pub low: Option<ConfidenceInterval>,
    pub test: Option<WelchTest>,
    pub alpha: f64,
    /// Whether equal mean margins are rejected at `alpha`.
    pub significant: Option<bool>,
}
