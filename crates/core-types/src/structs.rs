use crate::enums::Relation;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

// ==============================================================================
// Raw input relations
// ==============================================================================
// Field names follow the column headers of the source files, so the same
// structs deserialize from CSV and bind into the raw tables.

/// A single purchase line: what was bought from a vendor, at what price.
///
/// Empty numeric cells are kept as `None` and stored as NULL; the grouped
/// sums skip them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PurchaseRecord {
    pub vendor_number: i64,
    pub vendor_name: String,
    pub brand: i64,
    pub description: String,
    pub purchase_price: Option<f64>,
    pub quantity: Option<i64>,
    pub dollars: Option<f64>,
}

/// A price-list entry for a (vendor, brand).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PurchasePriceRecord {
    pub vendor_number: i64,
    pub brand: i64,
    /// The actual (shelf) price of the product.
    pub price: Option<f64>,
    /// Kept as text: the source mixes numeric and free-form values.
    pub volume: Option<String>,
}

/// A vendor invoice, one per purchase order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VendorInvoiceRecord {
    pub vendor_number: i64,
    #[serde(rename = "PONumber")]
    pub po_number: i64,
    pub freight: Option<f64>,
}

/// A sales line for a (vendor, brand).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SalesRecord {
    pub vendor_no: i64,
    pub brand: i64,
    pub sales_quantity: Option<i64>,
    pub sales_dollars: Option<f64>,
    pub sales_price: Option<f64>,
    pub excise_tax: Option<f64>,
}

/// A complete snapshot of the four raw relations, as loaded for one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSnapshot {
    pub purchases: Vec<PurchaseRecord>,
    pub purchase_prices: Vec<PurchasePriceRecord>,
    pub vendor_invoices: Vec<VendorInvoiceRecord>,
    pub sales: Vec<SalesRecord>,
}

impl RawSnapshot {
    /// Number of rows loaded for `relation`.
    pub fn len_of(&self, relation: Relation) -> usize {
        match relation {
            Relation::Purchases => self.purchases.len(),
            Relation::PurchasePrices => self.purchase_prices.len(),
            Relation::VendorInvoice => self.vendor_invoices.len(),
            Relation::Sales => self.sales.len(),
        }
    }
}

// ==============================================================================
// Derived relations
// ==============================================================================

/// The primary key of the vendor summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SummaryKey {
    pub vendor_number: i64,
    pub brand: i64,
}

impl fmt::Display for SummaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vendor {} / brand {}", self.vendor_number, self.brand)
    }
}

/// One row of the joined purchase/sales/freight aggregation, before enrichment.
///
/// Everything that can come out of an outer join (or a `SUM` over only NULLs)
/// is optional here; the metric enricher turns absent values into zeros.
#[derive(Debug, Clone, PartialEq, Default, FromRow, Serialize, Deserialize)]
#[sqlx(rename_all = "PascalCase")]
#[serde(rename_all = "PascalCase")]
pub struct CombinedSummaryRow {
    pub vendor_number: i64,
    pub vendor_name: Option<String>,
    pub brand: i64,
    pub description: Option<String>,
    pub purchase_price: Option<f64>,
    pub actual_price: Option<f64>,
    pub volume: Option<String>,
    pub total_purchase_quantity: Option<i64>,
    pub total_purchase_dollars: Option<f64>,
    pub total_sales_quantity: Option<i64>,
    pub total_sales_dollars: Option<f64>,
    pub total_sales_price: Option<f64>,
    pub total_excise_tax: Option<f64>,
    pub freight_cost: Option<f64>,
}

impl CombinedSummaryRow {
    pub fn key(&self) -> SummaryKey {
        SummaryKey {
            vendor_number: self.vendor_number,
            brand: self.brand,
        }
    }
}

/// The published, analysis-ready summary of one (vendor, brand).
///
/// Joined values are never absent. The three ratio metrics are absent only
/// when their denominator is zero and the null policy is in effect.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[sqlx(rename_all = "PascalCase")]
#[serde(rename_all = "PascalCase")]
pub struct VendorSummary {
    pub vendor_number: i64,
    pub vendor_name: String,
    pub brand: i64,
    pub description: String,
    pub purchase_price: f64,
    pub actual_price: f64,
    pub volume: f64,
    pub total_purchase_quantity: i64,
    pub total_purchase_dollars: f64,
    pub total_sales_quantity: i64,
    pub total_sales_dollars: f64,
    pub total_sales_price: f64,
    pub total_excise_tax: f64,
    pub freight_cost: f64,
    pub gross_profit: f64,
    pub profit_margin: Option<f64>,
    pub stock_turnover: Option<f64>,
    pub sales_to_purchase_ratio: Option<f64>,
}

impl VendorSummary {
    pub fn key(&self) -> SummaryKey {
        SummaryKey {
            vendor_number: self.vendor_number,
            brand: self.brand,
        }
    }
}
