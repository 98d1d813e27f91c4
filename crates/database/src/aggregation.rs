//! SQL for the vendor/brand aggregation.
//!
//! The combined summary is computed in three grouped sub-summaries joined on
//! (vendor, brand):
//!
//! - `FreightSummary`: invoice freight summed per vendor.
//! - `PurchaseSummary`: purchases joined to the price list, summed per
//!   vendor, brand and price fields.
//! - `SalesSummary`: sales summed per vendor and brand.
//!
//! Sales and freight are always left-joined onto the purchase side, so a
//! purchased brand is never lost for lack of sales or invoices. The price-list
//! join mode is a parameter.

use core_types::{PriceListJoin, SortDirection};
use sqlx::{QueryBuilder, Sqlite};

/// Parameters of one aggregation query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationQuery {
    pub price_list_join: PriceListJoin,
    /// Purchases with `PurchasePrice <= bound` are excluded when set.
    pub min_purchase_price: Option<f64>,
    pub order: SortDirection,
    /// Restricts every sub-summary to these vendors when non-empty.
    pub vendors: Vec<i64>,
}

/// Builds the combined purchase/sales/freight query.
pub fn combined_summary_query(query: &AggregationQuery) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(
        r#"
        WITH FreightSummary AS (
            SELECT
                VendorNumber,
                SUM(Freight) AS FreightCost
            FROM vendor_invoice
            WHERE 1 = 1"#,
    );
    push_vendor_filter(&mut qb, "VendorNumber", &query.vendors);
    qb.push(
        r#"
            GROUP BY VendorNumber
        ),

        PurchaseSummary AS (
            SELECT
                p.VendorNumber,
                p.VendorName,
                p.Brand,
                p.Description,
                p.PurchasePrice,
                pp.Price AS ActualPrice,
                pp.Volume,
                SUM(p.Quantity) AS TotalPurchaseQuantity,
                SUM(p.Dollars) AS TotalPurchaseDollars
            FROM purchases p
            "#,
    );
    qb.push(query.price_list_join.sql_keyword());
    qb.push(
        r#" purchase_prices pp
                ON p.VendorNumber = pp.VendorNumber
                AND p.Brand = pp.Brand
            WHERE 1 = 1"#,
    );
    push_purchase_filters(&mut qb, query);
    qb.push(
        r#"
            GROUP BY p.VendorNumber, p.VendorName, p.Brand, p.Description, p.PurchasePrice, pp.Price, pp.Volume
        ),

        SalesSummary AS (
            SELECT
                VendorNo,
                Brand,
                SUM(SalesQuantity) AS TotalSalesQuantity,
                SUM(SalesDollars) AS TotalSalesDollars,
                SUM(SalesPrice) AS TotalSalesPrice,
                SUM(ExciseTax) AS TotalExciseTax
            FROM sales
            WHERE 1 = 1"#,
    );
    push_vendor_filter(&mut qb, "VendorNo", &query.vendors);
    qb.push(
        r#"
            GROUP BY VendorNo, Brand
        )

        SELECT
            ps.VendorNumber,
            ps.VendorName,
            ps.Brand,
            ps.Description,
            ps.PurchasePrice,
            ps.ActualPrice,
            ps.Volume,
            ps.TotalPurchaseQuantity,
            ps.TotalPurchaseDollars,
            ss.TotalSalesQuantity,
            ss.TotalSalesDollars,
            ss.TotalSalesPrice,
            ss.TotalExciseTax,
            fs.FreightCost
        FROM PurchaseSummary ps
        LEFT JOIN SalesSummary ss
            ON ps.VendorNumber = ss.VendorNo
            AND ps.Brand = ss.Brand
        LEFT JOIN FreightSummary fs
            ON ps.VendorNumber = fs.VendorNumber
        ORDER BY ps.TotalPurchaseDollars "#,
    );
    qb.push(query.order.sql_keyword());
    qb.push(", ps.VendorNumber ASC, ps.Brand ASC");
    qb
}

/// Counts the distinct purchased (vendor, brand) pairs that have no price-list
/// entry, under the same purchase filters as the aggregation.
pub fn unpriced_pairs_query(query: &AggregationQuery) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(
        r#"
        SELECT COUNT(*) FROM (
            SELECT DISTINCT p.VendorNumber, p.Brand
            FROM purchases p
            LEFT JOIN purchase_prices pp
                ON p.VendorNumber = pp.VendorNumber
                AND p.Brand = pp.Brand
            WHERE pp.VendorNumber IS NULL"#,
    );
    push_purchase_filters(&mut qb, query);
    qb.push(")");
    qb
}

/// Counts the (vendor, brand) pairs listed more than once in the price list.
/// Each extra entry multiplies the matching purchase rows in the join.
pub const DUPLICATE_PRICE_ENTRIES_SQL: &str = r#"
    SELECT COUNT(*) FROM (
        SELECT VendorNumber, Brand
        FROM purchase_prices
        GROUP BY VendorNumber, Brand
        HAVING COUNT(*) > 1
    )
"#;

fn push_purchase_filters(qb: &mut QueryBuilder<'static, Sqlite>, query: &AggregationQuery) {
    if let Some(bound) = query.min_purchase_price {
        qb.push(" AND p.PurchasePrice > ");
        qb.push_bind(bound);
    }
    push_vendor_filter(qb, "p.VendorNumber", &query.vendors);
}

fn push_vendor_filter(qb: &mut QueryBuilder<'static, Sqlite>, column: &str, vendors: &[i64]) {
    if vendors.is_empty() {
        return;
    }
    qb.push(" AND ");
    qb.push(column);
    qb.push(" IN (");
    let mut separated = qb.separated(", ");
    for vendor in vendors {
        separated.push_bind(*vendor);
    }
    separated.push_unseparated(")");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_inner_joins_and_sorts_descending() {
        let sql = combined_summary_query(&AggregationQuery::default()).into_sql();
        assert!(sql.contains("INNER JOIN purchase_prices pp"));
        assert!(sql.contains("ORDER BY ps.TotalPurchaseDollars DESC, ps.VendorNumber ASC"));
        assert!(!sql.contains("p.PurchasePrice >"));
        assert!(!sql.contains(" IN ("));
    }

    #[test]
    fn options_shape_the_query() {
        let query = AggregationQuery {
            price_list_join: PriceListJoin::Left,
            min_purchase_price: Some(0.0),
            order: SortDirection::Ascending,
            vendors: vec![4466, 105],
        };
        let sql = combined_summary_query(&query).into_sql();
        assert!(sql.contains("LEFT JOIN purchase_prices pp"));
        assert!(sql.contains("AND p.PurchasePrice > ?"));
        assert!(sql.contains("AND p.VendorNumber IN (?, ?)"));
        assert!(sql.contains("AND VendorNo IN (?, ?)"));
        assert!(sql.contains("ORDER BY ps.TotalPurchaseDollars ASC"));
    }
}
