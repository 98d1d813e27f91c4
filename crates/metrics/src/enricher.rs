use core_types::{CombinedSummaryRow, VendorSummary, ZeroDenominatorPolicy};
use serde::Serialize;

/// Counts of the degenerate cases met while enriching one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentStats {
    pub rows: usize,
    /// `Volume` values that were present but not numeric.
    pub unparsable_volumes: usize,
    /// Rows whose `ProfitMargin` had a zero denominator.
    pub undefined_margins: usize,
    /// Rows whose `StockTurnover` had a zero denominator.
    pub undefined_turnovers: usize,
    /// Rows whose `SalesToPurchaseRatio` had a zero denominator.
    pub undefined_sales_ratios: usize,
}

/// A stateless calculator for the derived summary metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricEnricher {
    policy: ZeroDenominatorPolicy,
}

impl MetricEnricher {
    pub fn new(policy: ZeroDenominatorPolicy) -> Self {
        Self { policy }
    }

    /// Enriches a single joined row.
    pub fn enrich(&self, row: CombinedSummaryRow) -> VendorSummary {
        let total_purchase_quantity = row.total_purchase_quantity.unwrap_or(0);
        let total_purchase_dollars = row.total_purchase_dollars.unwrap_or(0.0);
        let total_sales_quantity = row.total_sales_quantity.unwrap_or(0);
        let total_sales_dollars = row.total_sales_dollars.unwrap_or(0.0);

        let gross_profit = total_sales_dollars - total_purchase_dollars;

        VendorSummary {
            vendor_number: row.vendor_number,
            vendor_name: trimmed(row.vendor_name),
            brand: row.brand,
            description: trimmed(row.description),
            purchase_price: row.purchase_price.unwrap_or(0.0),
            actual_price: row.actual_price.unwrap_or(0.0),
            volume: coerce_volume(row.volume.as_deref()),
            total_purchase_quantity,
            total_purchase_dollars,
            total_sales_quantity,
            total_sales_dollars,
            total_sales_price: row.total_sales_price.unwrap_or(0.0),
            total_excise_tax: row.total_excise_tax.unwrap_or(0.0),
            freight_cost: row.freight_cost.unwrap_or(0.0),
            gross_profit,
            profit_margin: self.ratio(gross_profit, total_sales_dollars).map(|m| m * 100.0),
            stock_turnover: self.ratio(total_sales_quantity as f64, total_purchase_quantity as f64),
            sales_to_purchase_ratio: self.ratio(total_sales_dollars, total_purchase_dollars),
        }
    }

    /// Enriches a batch, preserving row order.
    pub fn enrich_all(&self, rows: Vec<CombinedSummaryRow>) -> (Vec<VendorSummary>, EnrichmentStats) {
        let mut stats = EnrichmentStats {
            rows: rows.len(),
            ..Default::default()
        };

        let enriched = rows
            .into_iter()
            .map(|row| {
                if row
                    .volume
                    .as_deref()
                    .is_some_and(|v| parse_volume(v).is_none())
                {
                    stats.unparsable_volumes += 1;
                }
                if row.total_sales_dollars.unwrap_or(0.0) == 0.0 {
                    stats.undefined_margins += 1;
                }
                if row.total_purchase_quantity.unwrap_or(0) == 0 {
                    stats.undefined_turnovers += 1;
                }
                if row.total_purchase_dollars.unwrap_or(0.0) == 0.0 {
                    stats.undefined_sales_ratios += 1;
                }
                self.enrich(row)
            })
            .collect();

        tracing::debug!(?stats, policy = ?self.policy, "Enrichment finished.");
        (enriched, stats)
    }

    /// `numerator / denominator`, or the policy value when the denominator is
    /// zero or the quotient is not finite.
    fn ratio(&self, numerator: f64, denominator: f64) -> Option<f64> {
        let quotient = numerator / denominator;
        if denominator == 0.0 || !quotient.is_finite() {
            return match self.policy {
                ZeroDenominatorPolicy::Null => None,
                ZeroDenominatorPolicy::Zero => Some(0.0),
            };
        }
        Some(quotient)
    }
}

/// Interprets a raw `Volume` value as a number. Absent or non-numeric values
/// become 0.
pub fn coerce_volume(raw: Option<&str>) -> f64 {
    raw.and_then(parse_volume).unwrap_or(0.0)
}

fn parse_volume(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn trimmed(text: Option<String>) -> String {
    text.map(|t| t.trim().to_string()).unwrap_or_default()
}
