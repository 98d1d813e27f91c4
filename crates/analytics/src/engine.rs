use crate::error::AnalyticsError;
use crate::report::{
    AnalysisReport, BrandPerformance, ColumnSummary, CorrelationMatrix, MarginComparison, OrderSize,
    OrderSizeBucket, PromotionCandidates, PurchaseContribution, Ranked, UnsoldInventory,
    VendorContribution,
};
use crate::stats;
use configuration::AnalysisConfig;
use core_types::VendorSummary;
use std::collections::BTreeMap;

/// Names of the numeric summary columns, in `describe` and correlation order.
pub const NUMERIC_COLUMNS: [&str; 14] = [
    "PurchasePrice",
    "ActualPrice",
    "Volume",
    "TotalPurchaseQuantity",
    "TotalPurchaseDollars",
    "TotalSalesQuantity",
    "TotalSalesDollars",
    "TotalSalesPrice",
    "TotalExciseTax",
    "FreightCost",
    "GrossProfit",
    "ProfitMargin",
    "StockTurnover",
    "SalesToPurchaseRatio",
];

fn numeric_values(row: &VendorSummary) -> [Option<f64>; 14] {
    [
        Some(row.purchase_price),
        Some(row.actual_price),
        Some(row.volume),
        Some(row.total_purchase_quantity as f64),
        Some(row.total_purchase_dollars),
        Some(row.total_sales_quantity as f64),
        Some(row.total_sales_dollars),
        Some(row.total_sales_price),
        Some(row.total_excise_tax),
        Some(row.freight_cost),
        Some(row.gross_profit),
        row.profit_margin,
        row.stock_turnover,
        row.sales_to_purchase_ratio,
    ]
}

/// A stateless calculator for the analysis of published summary rows.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    config: AnalysisConfig,
}

impl AnalyticsEngine {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// The main entry point: runs every analysis over `rows`.
    ///
    /// Callers normally pass the profitable rows only; loss-making and
    /// never-sold pairs distort the margin statistics.
    pub fn analyze(&self, rows: &[VendorSummary]) -> Result<AnalysisReport, AnalyticsError> {
        self.check_parameters()?;

        let report = AnalysisReport {
            rows: rows.len(),
            describe: self.describe(rows),
            correlations: self.correlations(rows),
            top_vendors: rank_descending(sum_by(rows, |r| &r.vendor_name, |r| r.total_sales_dollars), self.config.top_n),
            top_brands: rank_descending(sum_by(rows, |r| &r.description, |r| r.total_sales_dollars), self.config.top_n),
            purchase_contribution: self.purchase_contribution(rows),
            order_size_unit_price: self.order_size_unit_price(rows),
            low_turnover_vendors: self.low_turnover_vendors(rows),
            unsold_inventory: self.unsold_inventory(rows),
            promotion_candidates: self.promotion_candidates(rows),
            margin_comparison: self.margin_comparison(rows)?,
        };

        tracing::info!(
            rows = report.rows,
            promotion_candidates = report.promotion_candidates.brands.len(),
            significant = ?report.margin_comparison.significant,
            "Analysis finished."
        );
        Ok(report)
    }

    fn check_parameters(&self) -> Result<(), AnalyticsError> {
        let c = &self.config;
        if !(c.confidence > 0.0 && c.confidence < 1.0) {
            return Err(AnalyticsError::InvalidParameter(format!(
                "confidence must lie in (0, 1), got {}",
                c.confidence
            )));
        }
        if !(c.alpha > 0.0 && c.alpha < 1.0) {
            return Err(AnalyticsError::InvalidParameter(format!(
                "alpha must lie in (0, 1), got {}",
                c.alpha
            )));
        }
        let t = &c.thresholds;
        for (name, q) in [
            ("low_sales_quantile", t.low_sales_quantile),
            ("high_margin_quantile", t.high_margin_quantile),
            ("top_performer_quantile", t.top_performer_quantile),
            ("low_performer_quantile", t.low_performer_quantile),
        ] {
            if !(0.0..=1.0).contains(&q) {
                return Err(AnalyticsError::InvalidParameter(format!(
                    "{name} must lie in [0, 1], got {q}"
                )));
            }
        }
        Ok(())
    }

    fn describe(&self, rows: &[VendorSummary]) -> Vec<ColumnSummary> {
        let columns = columns_of(rows);
        NUMERIC_COLUMNS
            .iter()
            .zip(columns)
            .map(|(name, mut values)| {
                values.sort_by(f64::total_cmp);
                ColumnSummary {
                    column: name.to_string(),
                    count: values.len(),
                    mean: stats::mean(&values),
                    std: stats::sample_std(&values),
                    min: values.first().copied(),
                    q25: stats::quantile_sorted(&values, 0.25),
                    median: stats::quantile_sorted(&values, 0.5),
                    q75: stats::quantile_sorted(&values, 0.75),
                    max: values.last().copied(),
                }
            })
            .collect()
    }

    /// Pairwise-complete Pearson correlations.
    fn correlations(&self, rows: &[VendorSummary]) -> CorrelationMatrix {
        let per_row: Vec<[Option<f64>; 14]> = rows.iter().map(numeric_values).collect();
        let n = NUMERIC_COLUMNS.len();
        let mut values = vec![vec![None; n]; n];

        for i in 0..n {
            for j in i..n {
                let (xs, ys): (Vec<f64>, Vec<f64>) = per_row
                    .iter()
                    .filter_map(|v| Some((v[i]?, v[j]?)))
                    .unzip();
                let r = stats::pearson(&xs, &ys);
                values[i][j] = r;
                values[j][i] = r;
            }
        }

        CorrelationMatrix {
            columns: NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
            values,
        }
    }

    fn purchase_contribution(&self, rows: &[VendorSummary]) -> PurchaseContribution {
        let mut per_vendor: BTreeMap<&str, [f64; 3]> = BTreeMap::new();
        for row in rows {
            let entry = per_vendor.entry(row.vendor_name.as_str()).or_default();
            entry[0] += row.total_purchase_dollars;
            entry[1] += row.gross_profit;
            entry[2] += row.total_sales_dollars;
        }
        let total: f64 = per_vendor.values().map(|v| v[0]).sum();
        let share = |dollars: f64| if total == 0.0 { 0.0 } else { dollars / total * 100.0 };

        let mut ranked: Vec<_> = per_vendor.into_iter().collect();
        ranked.sort_by(|a, b| b.1[0].total_cmp(&a.1[0]).then_with(|| a.0.cmp(b.0)));

        let mut cumulative = 0.0;
        let vendors: Vec<VendorContribution> = ranked
            .into_iter()
            .take(self.config.top_n)
            .map(|(name, [purchase, profit, sales])| {
                let contribution_pct = share(purchase);
                cumulative += contribution_pct;
                VendorContribution {
                    vendor_name: name.to_string(),
                    total_purchase_dollars: purchase,
                    gross_profit: profit,
                    total_sales_dollars: sales,
                    contribution_pct,
                    cumulative_pct: cumulative,
                }
            })
            .collect();

        PurchaseContribution {
            top_share_pct: cumulative,
            vendors,
        }
    }

    /// Mean unit price per tertile of `TotalPurchaseQuantity`.
    fn order_size_unit_price(&self, rows: &[VendorSummary]) -> Vec<OrderSizeBucket> {
        let quantities: Vec<f64> = rows.iter().map(|r| r.total_purchase_quantity as f64).collect();
        let small_max = stats::quantile(&quantities, 1.0 / 3.0);
        let medium_max = stats::quantile(&quantities, 2.0 / 3.0);
        let large_max = stats::quantile(&quantities, 1.0);

        let mut unit_prices: [Vec<f64>; 3] = Default::default();
        let mut counts = [0usize; 3];
        if let (Some(small_max), Some(medium_max)) = (small_max, medium_max) {
            for row in rows {
                let quantity = row.total_purchase_quantity as f64;
                let bucket = if quantity <= small_max {
                    0
                } else if quantity <= medium_max {
                    1
                } else {
                    2
                };
                counts[bucket] += 1;
                if row.total_purchase_quantity > 0 {
                    unit_prices[bucket].push(row.total_purchase_dollars / quantity);
                }
            }
        }

        [
            (OrderSize::Small, small_max),
            (OrderSize::Medium, medium_max),
            (OrderSize::Large, large_max),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (size, upper_bound))| OrderSizeBucket {
            size,
            upper_bound,
            rows: counts[i],
            mean_unit_price: stats::mean(&unit_prices[i]),
        })
        .collect()
    }

    fn low_turnover_vendors(&self, rows: &[VendorSummary]) -> Vec<Ranked> {
        let mut per_vendor: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for row in rows {
            if let Some(turnover) = row.stock_turnover.filter(|t| *t < 1.0) {
                let entry = per_vendor.entry(row.vendor_name.as_str()).or_default();
                entry.0 += turnover;
                entry.1 += 1;
            }
        }

        let mut ranked: Vec<Ranked> = per_vendor
            .into_iter()
            .map(|(name, (sum, count))| Ranked {
                name: name.to_string(),
                value: sum / count as f64,
            })
            .collect();
        ranked.sort_by(|a, b| a.value.total_cmp(&b.value).then_with(|| a.name.cmp(&b.name)));
        ranked.truncate(self.config.top_n);
        ranked
    }

    fn unsold_inventory(&self, rows: &[VendorSummary]) -> UnsoldInventory {
        let unsold_value =
            |r: &VendorSummary| (r.total_purchase_quantity - r.total_sales_quantity) as f64 * r.purchase_price;
        UnsoldInventory {
            total_value: rows.iter().map(unsold_value).sum(),
            top_vendors: rank_descending(sum_by(rows, |r| &r.vendor_name, unsold_value), self.config.top_n),
        }
    }

    /// Brands under the sales ceiling whose sales are in the low tail and
    /// whose mean margin is in the high tail.
    fn promotion_candidates(&self, rows: &[VendorSummary]) -> PromotionCandidates {
        let mut per_brand: BTreeMap<&str, (f64, f64, usize)> = BTreeMap::new();
        for row in rows {
            let entry = per_brand.entry(row.description.as_str()).or_default();
            entry.0 += row.total_sales_dollars;
            if let Some(margin) = row.profit_margin {
                entry.1 += margin;
                entry.2 += 1;
            }
        }

        let brands: Vec<(&str, f64, Option<f64>)> = per_brand
            .into_iter()
            .filter(|(_, (sales, _, _))| *sales < self.config.brand_sales_ceiling)
            .map(|(name, (sales, margin_sum, margins))| {
                let mean_margin = (margins > 0).then(|| margin_sum / margins as f64);
                (name, sales, mean_margin)
            })
            .collect();

        let sales: Vec<f64> = brands.iter().map(|b| b.1).collect();
        let margins: Vec<f64> = brands.iter().filter_map(|b| b.2).collect();
        let thresholds = &self.config.thresholds;
        let low_sales_threshold = stats::quantile(&sales, thresholds.low_sales_quantile);
        let high_margin_threshold = stats::quantile(&margins, thresholds.high_margin_quantile);

        let brands = match (low_sales_threshold, high_margin_threshold) {
            (Some(low), Some(high)) => brands
                .into_iter()
                .filter_map(|(name, sales, margin)| {
                    let margin = margin?;
                    (sales <= low && margin >= high).then(|| BrandPerformance {
                        description: name.to_string(),
                        total_sales_dollars: sales,
                        mean_profit_margin: margin,
                    })
                })
                .collect(),
            _ => Vec::new(),
        };

        PromotionCandidates {
            low_sales_threshold,
            high_margin_threshold,
            brands,
        }
    }

    fn margin_comparison(&self, rows: &[VendorSummary]) -> Result<MarginComparison, AnalyticsError> {
        let sales: Vec<f64> = rows.iter().map(|r| r.total_sales_dollars).collect();
        let thresholds = &self.config.thresholds;
        let top_threshold = stats::quantile(&sales, thresholds.top_performer_quantile);
        let low_threshold = stats::quantile(&sales, thresholds.low_performer_quantile);

        let margins_where = |keep: &dyn Fn(f64) -> bool| -> Vec<f64> {
            rows.iter()
                .filter(|r| keep(r.total_sales_dollars))
                .filter_map(|r| r.profit_margin)
                .collect()
        };
        let top = top_threshold.map_or_else(Vec::new, |t| margins_where(&|s: f64| s >= t));
        let low = low_threshold.map_or_else(Vec::new, |t| margins_where(&|s: f64| s <= t));

        let test = stats::welch_t_test(&top, &low)?;
        Ok(MarginComparison {
            top_threshold,
            low_threshold,
            top_count: top.len(),
            low_count: low.len(),
            top: stats::confidence_interval(&top, self.config.confidence)?,
            low: stats::confidence_interval(&low, self.config.confidence)?,
            alpha: self.config.alpha,
            significant: test.map(|t| t.p_value < self.config.alpha),
            test,
        })
    }
}

/// Present values of each numeric column.
fn columns_of(rows: &[VendorSummary]) -> Vec<Vec<f64>> {
    let mut columns = vec![Vec::with_capacity(rows.len()); NUMERIC_COLUMNS.len()];
    for row in rows {
        for (column, value) in columns.iter_mut().zip(numeric_values(row)) {
            if let Some(v) = value {
                column.push(v);
            }
        }
    }
    columns
}

fn sum_by<'a, K, V>(rows: &'a [VendorSummary], key: K, value: V) -> BTreeMap<&'a str, f64>
where
    K: Fn(&'a VendorSummary) -> &'a String,
    V: Fn(&VendorSummary) -> f64,
{
    let mut sums = BTreeMap::new();
    for row in rows {
        *sums.entry(key(row).as_str()).or_insert(0.0) += value(row);
    }
    sums
}

/// Largest values first; equal values by name.
fn rank_descending(sums: BTreeMap<&str, f64>, n: usize) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = sums
        .into_iter()
        .map(|(name, value)| Ranked {
            name: name.to_string(),
            value,
        })
        .collect();
    ranked.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(n);
    ranked
}
