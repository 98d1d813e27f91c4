use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four raw input relations.
///
/// The table name doubles as the file stem of the delimited input file
/// (`purchases` is read from `purchases.csv`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Purchases,
    PurchasePrices,
    VendorInvoice,
    Sales,
}

impl Relation {
    /// All raw relations, in load order.
    pub const ALL: [Relation; 4] = [
        Relation::Purchases,
        Relation::PurchasePrices,
        Relation::VendorInvoice,
        Relation::Sales,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Relation::Purchases => "purchases",
            Relation::PurchasePrices => "purchase_prices",
            Relation::VendorInvoice => "vendor_invoice",
            Relation::Sales => "sales",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.table_name())
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// How purchases are joined to the price list.
///
/// `Inner` drops purchases that have no price-list entry for their
/// (vendor, brand); `Left` keeps them with a zero actual price and volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum PriceListJoin {
    #[default]
    Inner,
    Left,
}

impl PriceListJoin {
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            PriceListJoin::Inner => "INNER JOIN",
            PriceListJoin::Left => "LEFT JOIN",
        }
    }
}

/// Sort direction of the summary on `TotalPurchaseDollars`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[serde(alias = "asc")]
    #[cfg_attr(feature = "clap", value(alias = "asc"))]
    Ascending,
    #[default]
    #[serde(alias = "desc")]
    #[cfg_attr(feature = "clap", value(alias = "desc"))]
    Descending,
}

impl SortDirection {
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// What a ratio metric becomes when its denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum ZeroDenominatorPolicy {
    /// The metric is absent (SQL NULL).
    #[default]
    Null,
    /// The metric is published as 0.0.
    Zero,
}

/// What the aggregator does when several purchase groups share one
/// (vendor, brand) key, which happens when price fields vary within the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum KeyConflictPolicy {
    /// Fail the batch before anything is written.
    #[default]
    Reject,
    /// Collapse the groups into one row, summing purchase totals.
    Merge,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_file_stem_is_the_table_name() {
        assert_eq!(Relation::VendorInvoice.file_name(), "vendor_invoice.csv");
        assert_eq!(Relation::PurchasePrices.to_string(), "purchase_prices");
    }

    #[test]
    fn sort_direction_accepts_short_aliases() {
        let asc: SortDirection = serde_json::from_str("\"asc\"").unwrap();
        let desc: SortDirection = serde_json::from_str("\"descending\"").unwrap();
        assert_eq!(asc, SortDirection::Ascending);
        assert_eq!(desc, SortDirection::Descending);
    }

    #[test]
    fn defaults_are_inner_descending_null_reject() {
        assert_eq!(PriceListJoin::default(), PriceListJoin::Inner);
        assert_eq!(SortDirection::default(), SortDirection::Descending);
        assert_eq!(KeyConflictPolicy::default(), KeyConflictPolicy::Reject);
    }
}
