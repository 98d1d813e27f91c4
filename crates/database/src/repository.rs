use crate::DbError;
use crate::aggregation::{
    AggregationQuery, DUPLICATE_PRICE_ENTRIES_SQL, combined_summary_query, unpriced_pairs_query,
};
use core_types::{CombinedSummaryRow, RawSnapshot, Relation, VendorSummary};
use sqlx::query_builder::Separated;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool};
use sqlx::{FromRow, QueryBuilder};
use std::time::Instant;

/// Name of the published summary relation.
pub const SUMMARY_TABLE: &str = "vendor_summary";
/// Scratch table the next summary is built in before it replaces the old one.
const STAGING_TABLE: &str = "vendor_summary_staging";

/// SQLite refuses statements with more bound parameters than this.
const SQLITE_MAX_BIND_PARAMS: usize = 32_766;
const SUMMARY_COLUMNS: usize = 18;

/// Which published rows a reader wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryFilter {
    #[default]
    All,
    /// Rows with positive gross profit, positive margin and at least one unit
    /// sold. Drops loss-making and never-sold pairs before analysis.
    Profitable,
}

impl SummaryFilter {
    fn where_clause(&self) -> &'static str {
        match self {
            SummaryFilter::All => "",
            SummaryFilter::Profitable => {
                " WHERE GrossProfit > 0 AND ProfitMargin > 0 AND TotalSalesQuantity > 0"
            }
        }
    }
}

/// A table in the store with its row count.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RelationCount {
    pub name: String,
    pub rows: i64,
}

/// The `DbRepository` provides a high-level, application-specific interface
/// to the record store. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: SqlitePool,
}

impl DbRepository {
    /// Creates a new `DbRepository` around an open store handle.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Closes the underlying pool. Pending writes are already committed.
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Replaces the four raw relations with `snapshot` in a single transaction.
    ///
    /// Either every relation holds the new snapshot afterwards or, on error,
    /// every relation still holds the previous one.
    pub async fn replace_raw_relations(
        &self,
        snapshot: &RawSnapshot,
        batch_size: usize,
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        for relation in Relation::ALL {
            let started = Instant::now();
            sqlx::query(&format!("DELETE FROM {}", relation.table_name()))
                .execute(&mut *tx)
                .await?;

            match relation {
                Relation::Purchases => {
                    insert_rows(
                        &mut tx,
                        "INSERT INTO purchases (VendorNumber, VendorName, Brand, Description, PurchasePrice, Quantity, Dollars) ",
                        7,
                        &snapshot.purchases,
                        batch_size,
                        |mut b, r| {
                            b.push_bind(r.vendor_number)
                                .push_bind(r.vendor_name.clone())
                                .push_bind(r.brand)
                                .push_bind(r.description.clone())
                                .push_bind(r.purchase_price)
                                .push_bind(r.quantity)
                                .push_bind(r.dollars);
                        },
                    )
                    .await?
                }
                Relation::PurchasePrices => {
                    insert_rows(
                        &mut tx,
                        "INSERT INTO purchase_prices (VendorNumber, Brand, Price, Volume) ",
                        4,
                        &snapshot.purchase_prices,
                        batch_size,
                        |mut b, r| {
                            b.push_bind(r.vendor_number)
                                .push_bind(r.brand)
                                .push_bind(r.price)
                                .push_bind(r.volume.clone());
                        },
                    )
                    .await?
                }
                Relation::VendorInvoice => {
                    insert_rows(
                        &mut tx,
                        "INSERT INTO vendor_invoice (VendorNumber, PONumber, Freight) ",
                        3,
                        &snapshot.vendor_invoices,
                        batch_size,
                        |mut b, r| {
                            b.push_bind(r.vendor_number)
                                .push_bind(r.po_number)
                                .push_bind(r.freight);
                        },
                    )
                    .await?
                }
                Relation::Sales => {
                    insert_rows(
                        &mut tx,
                        "INSERT INTO sales (VendorNo, Brand, SalesQuantity, SalesDollars, SalesPrice, ExciseTax) ",
                        6,
                        &snapshot.sales,
                        batch_size,
                        |mut b, r| {
                            b.push_bind(r.vendor_no)
                                .push_bind(r.brand)
                                .push_bind(r.sales_quantity)
                                .push_bind(r.sales_dollars)
                                .push_bind(r.sales_price)
                                .push_bind(r.excise_tax);
                        },
                    )
                    .await?
                }
            }

            tracing::debug!(
                relation = %relation,
                rows = snapshot.len_of(relation),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Relation staged for replacement."
            );
        }

        tx.commit().await?;
        Ok(())
    }

    /// Runs the grouped purchase/sales/freight aggregation.
    pub async fn combined_summary(
        &self,
        query: &AggregationQuery,
    ) -> Result<Vec<CombinedSummaryRow>, DbError> {
        let mut qb = combined_summary_query(query);
        let rows = qb
            .build_query_as::<CombinedSummaryRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Number of purchased (vendor, brand) pairs without a price-list entry.
    pub async fn count_unpriced_pairs(&self, query: &AggregationQuery) -> Result<i64, DbError> {
        let mut qb = unpriced_pairs_query(query);
        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Number of (vendor, brand) pairs with more than one price-list entry.
    pub async fn count_duplicate_price_entries(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>(DUPLICATE_PRICE_ENTRIES_SQL)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Replaces the published vendor summary with `rows`.
    ///
    /// The new table is built under a staging name and swapped in inside one
    /// transaction, so readers see either the previous summary or the complete
    /// new one. A failure at any point (including a duplicate primary key)
    /// rolls back and keeps the previous summary.
    pub async fn publish_vendor_summary(
        &self,
        rows: &[VendorSummary],
        batch_size: usize,
    ) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {STAGING_TABLE}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&summary_table_ddl(STAGING_TABLE))
            .execute(&mut *tx)
            .await?;

        insert_rows(
            &mut tx,
            &format!(
                "INSERT INTO {STAGING_TABLE} (VendorNumber, VendorName, Brand, Description, PurchasePrice, \
                 ActualPrice, Volume, TotalPurchaseQuantity, TotalPurchaseDollars, TotalSalesQuantity, \
                 TotalSalesDollars, TotalSalesPrice, TotalExciseTax, FreightCost, GrossProfit, ProfitMargin, \
                 StockTurnover, SalesToPurchaseRatio) "
            ),
            SUMMARY_COLUMNS,
            rows,
            batch_size,
            |mut b, r| {
                b.push_bind(r.vendor_number)
                    .push_bind(r.vendor_name.clone())
                    .push_bind(r.brand)
                    .push_bind(r.description.clone())
                    .push_bind(r.purchase_price)
                    .push_bind(r.actual_price)
                    .push_bind(r.volume)
                    .push_bind(r.total_purchase_quantity)
                    .push_bind(r.total_purchase_dollars)
                    .push_bind(r.total_sales_quantity)
                    .push_bind(r.total_sales_dollars)
                    .push_bind(r.total_sales_price)
                    .push_bind(r.total_excise_tax)
                    .push_bind(r.freight_cost)
                    .push_bind(r.gross_profit)
                    .push_bind(r.profit_margin)
                    .push_bind(r.stock_turnover)
                    .push_bind(r.sales_to_purchase_ratio);
            },
        )
        .await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {SUMMARY_TABLE}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("ALTER TABLE {STAGING_TABLE} RENAME TO {SUMMARY_TABLE}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    /// Whether a summary has been published to this store.
    pub async fn summary_exists(&self) -> Result<bool, DbError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(SUMMARY_TABLE)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Reads the published summary in publication order.
    pub async fn fetch_vendor_summary(
        &self,
        filter: SummaryFilter,
    ) -> Result<Vec<VendorSummary>, DbError> {
        if !self.summary_exists().await? {
            return Err(DbError::SummaryNotPublished);
        }

        let sql = format!(
            "SELECT * FROM {SUMMARY_TABLE}{} ORDER BY rowid",
            filter.where_clause()
        );
        let rows = sqlx::query_as::<_, VendorSummary>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Lists the user tables of the store with their row counts.
    pub async fn relation_counts(&self) -> Result<Vec<RelationCount>, DbError> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
              AND name NOT LIKE '_sqlx_%'
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = Vec::with_capacity(names.len());
        for name in names {
            let rows: i64 =
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\"", name.replace('"', "\"\"")))
                    .fetch_one(&self.pool)
                    .await?;
            counts.push(RelationCount { name, rows });
        }
        Ok(counts)
    }
}

/// Fixed schema of the published summary.
fn summary_table_ddl(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE {table} (
            VendorNumber          INTEGER NOT NULL,
            VendorName            TEXT    NOT NULL,
            Brand                 INTEGER NOT NULL,
            Description           TEXT    NOT NULL,
            PurchasePrice         REAL    NOT NULL,
            ActualPrice           REAL    NOT NULL,
            Volume                REAL    NOT NULL,
            TotalPurchaseQuantity INTEGER NOT NULL,
            TotalPurchaseDollars  REAL    NOT NULL,
            TotalSalesQuantity    INTEGER NOT NULL,
            TotalSalesDollars     REAL    NOT NULL,
            TotalSalesPrice       REAL    NOT NULL,
            TotalExciseTax        REAL    NOT NULL,
            FreightCost           REAL    NOT NULL,
            GrossProfit           REAL    NOT NULL,
            ProfitMargin          REAL,
            StockTurnover         REAL,
            SalesToPurchaseRatio  REAL,
            PRIMARY KEY (VendorNumber, Brand)
        )
        "#
    )
}

/// Rows per multi-row INSERT, bounded by the batch size and SQLite's
/// parameter limit.
fn rows_per_statement(batch_size: usize, columns: usize) -> usize {
    (SQLITE_MAX_BIND_PARAMS / columns).min(batch_size).max(1)
}

/// Inserts `rows` in chunks of multi-row `VALUES` statements.
async fn insert_rows<'r, T, F>(
    conn: &mut SqliteConnection,
    insert: &str,
    columns: usize,
    rows: &'r [T],
    batch_size: usize,
    mut bind: F,
) -> Result<(), DbError>
where
    F: FnMut(Separated<'_, 'static, Sqlite, &'static str>, &'r T),
{
    for chunk in rows.chunks(rows_per_statement(batch_size, columns)) {
        let mut qb = QueryBuilder::<Sqlite>::new(insert);
        qb.push_values(chunk, &mut bind);
        qb.build().execute(&mut *conn).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{connect_in_memory, run_migrations};
    use core_types::{
        PriceListJoin, PurchasePriceRecord, PurchaseRecord, SalesRecord, VendorInvoiceRecord,
    };

    async fn test_repo() -> DbRepository {
        let pool = connect_in_memory().await.expect("in-memory pool");
        run_migrations(&pool).await.expect("migrations");
        DbRepository::new(pool)
    }

    fn purchase(vendor: i64, brand: i64, qty: i64, dollars: f64) -> PurchaseRecord {
        PurchaseRecord {
            vendor_number: vendor,
            vendor_name: format!("VENDOR {vendor}  "),
            brand,
            description: format!("Brand {brand}"),
            purchase_price: Some(10.0),
            quantity: Some(qty),
            dollars: Some(dollars),
        }
    }

    fn price(vendor: i64, brand: i64) -> PurchasePriceRecord {
        PurchasePriceRecord {
            vendor_number: vendor,
            brand,
            price: Some(12.0),
            volume: Some("750".to_string()),
        }
    }

    fn sale(vendor: i64, brand: i64, qty: i64, dollars: f64) -> SalesRecord {
        SalesRecord {
            vendor_no: vendor,
            brand,
            sales_quantity: Some(qty),
            sales_dollars: Some(dollars),
            sales_price: Some(12.0),
            excise_tax: Some(0.5),
        }
    }

    fn invoice(vendor: i64, po: i64, freight: f64) -> VendorInvoiceRecord {
        VendorInvoiceRecord {
            vendor_number: vendor,
            po_number: po,
            freight: Some(freight),
        }
    }

    fn summary(vendor: i64, brand: i64, dollars: f64) -> VendorSummary {
        VendorSummary {
            vendor_number: vendor,
            vendor_name: format!("VENDOR {vendor}"),
            brand,
            description: format!("Brand {brand}"),
            purchase_price: 10.0,
            actual_price: 12.0,
            volume: 750.0,
            total_purchase_quantity: 10,
            total_purchase_dollars: dollars,
            total_sales_quantity: 8,
            total_sales_dollars: 96.0,
            total_sales_price: 12.0,
            total_excise_tax: 0.5,
            freight_cost: 5.0,
            gross_profit: 96.0 - dollars,
            profit_margin: Some((96.0 - dollars) / 96.0 * 100.0),
            stock_turnover: Some(0.8),
            sales_to_purchase_ratio: None,
        }
    }

    fn snapshot() -> RawSnapshot {
        RawSnapshot {
            purchases: vec![
                purchase(1, 100, 4, 40.0),
                purchase(1, 100, 6, 60.0),
                purchase(1, 200, 3, 30.0),
                // No price-list entry: dropped by the inner join.
                purchase(2, 300, 5, 50.0),
            ],
            purchase_prices: vec![price(1, 100), price(1, 200)],
            vendor_invoices: vec![invoice(1, 1, 2.0), invoice(1, 2, 3.0), invoice(2, 3, 9.0)],
            sales: vec![sale(1, 100, 5, 60.0), sale(1, 100, 3, 36.0), sale(2, 300, 1, 15.0)],
        }
    }

    #[tokio::test]
    async fn replacing_raw_relations_does_not_append() {
        let repo = test_repo().await;
        repo.replace_raw_relations(&snapshot(), 2).await.unwrap();
        repo.replace_raw_relations(&snapshot(), 500).await.unwrap();

        let counts = repo.relation_counts().await.unwrap();
        let rows_of = |name: &str| counts.iter().find(|c| c.name == name).map(|c| c.rows);
        assert_eq!(rows_of("purchases"), Some(4));
        assert_eq!(rows_of("purchase_prices"), Some(2));
        assert_eq!(rows_of("vendor_invoice"), Some(3));
        assert_eq!(rows_of("sales"), Some(3));
        assert_eq!(rows_of(SUMMARY_TABLE), None);
    }

    #[tokio::test]
    async fn combined_summary_joins_sales_and_freight() {
        let repo = test_repo().await;
        repo.replace_raw_relations(&snapshot(), 500).await.unwrap();

        let rows = repo.combined_summary(&AggregationQuery::default()).await.unwrap();
        assert_eq!(rows.len(), 2);

        // Ordered by purchase dollars, descending.
        let sold = &rows[0];
        assert_eq!((sold.vendor_number, sold.brand), (1, 100));
        assert_eq!(sold.total_purchase_quantity, Some(10));
        assert_eq!(sold.total_purchase_dollars, Some(100.0));
        assert_eq!(sold.total_sales_quantity, Some(8));
        assert_eq!(sold.total_sales_dollars, Some(96.0));
        assert_eq!(sold.total_excise_tax, Some(1.0));
        assert_eq!(sold.freight_cost, Some(5.0));
        assert_eq!(sold.volume.as_deref(), Some("750"));

        // Never sold: the row survives with absent sales totals.
        let unsold = &rows[1];
        assert_eq!((unsold.vendor_number, unsold.brand), (1, 200));
        assert_eq!(unsold.total_sales_quantity, None);
        assert_eq!(unsold.total_sales_dollars, None);
        assert_eq!(unsold.freight_cost, Some(5.0));

        assert_eq!(
            repo.count_unpriced_pairs(&AggregationQuery::default()).await.unwrap(),
            1
        );
        assert_eq!(repo.count_duplicate_price_entries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn left_price_join_keeps_unpriced_purchases() {
        let repo = test_repo().await;
        repo.replace_raw_relations(&snapshot(), 500).await.unwrap();

        let query = AggregationQuery {
            price_list_join: PriceListJoin::Left,
            order: core_types::SortDirection::Ascending,
            ..Default::default()
        };
        let rows = repo.combined_summary(&query).await.unwrap();
        assert_eq!(rows.len(), 3);

        let unpriced = rows.iter().find(|r| r.vendor_number == 2).unwrap();
        assert_eq!(unpriced.actual_price, None);
        assert_eq!(unpriced.volume, None);
        assert_eq!(unpriced.freight_cost, Some(9.0));
        assert_eq!(unpriced.total_sales_dollars, Some(15.0));
        // Ascending: the 30-dollar purchase comes first.
        assert_eq!(rows[0].total_purchase_dollars, Some(30.0));
    }

    #[tokio::test]
    async fn purchase_price_bound_and_vendor_filter_apply() {
        let repo = test_repo().await;
        let mut data = snapshot();
        data.purchases[2].purchase_price = Some(0.0);
        repo.replace_raw_relations(&data, 500).await.unwrap();

        let query = AggregationQuery {
            min_purchase_price: Some(0.0),
            vendors: vec![1],
            ..Default::default()
        };
        let rows = repo.combined_summary(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].brand, 100);
    }

    #[tokio::test]
    async fn fetching_before_publishing_fails() {
        let repo = test_repo().await;
        let err = repo.fetch_vendor_summary(SummaryFilter::All).await.unwrap_err();
        assert!(matches!(err, DbError::SummaryNotPublished));
    }

    #[tokio::test]
    async fn publish_replaces_previous_summary() {
        let repo = test_repo().await;
        repo.publish_vendor_summary(&[summary(1, 1, 50.0), summary(1, 2, 40.0)], 500)
            .await
            .unwrap();
        repo.publish_vendor_summary(&[summary(3, 3, 120.0)], 1).await.unwrap();

        let rows = repo.fetch_vendor_summary(SummaryFilter::All).await.unwrap();
        assert_eq!(rows, vec![summary(3, 3, 120.0)]);
    }

    #[tokio::test]
    async fn failed_publish_keeps_previous_summary() {
        let repo = test_repo().await;
        let previous = vec![summary(1, 1, 50.0)];
        repo.publish_vendor_summary(&previous, 500).await.unwrap();

        let duplicated = vec![summary(2, 7, 10.0), summary(2, 7, 20.0)];
        assert!(repo.publish_vendor_summary(&duplicated, 500).await.is_err());

        let rows = repo.fetch_vendor_summary(SummaryFilter::All).await.unwrap();
        assert_eq!(rows, previous);
    }

    #[tokio::test]
    async fn profitable_filter_drops_losses_and_unsold_rows() {
        let repo = test_repo().await;
        let mut unsold = summary(1, 3, 20.0);
        unsold.total_sales_quantity = 0;
        repo.publish_vendor_summary(
            &[summary(1, 1, 50.0), summary(1, 2, 150.0), unsold],
            500,
        )
        .await
        .unwrap();

        let rows = repo.fetch_vendor_summary(SummaryFilter::Profitable).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].brand, 1);
    }

    #[test]
    fn statements_stay_under_the_parameter_limit() {
        assert_eq!(rows_per_statement(500, SUMMARY_COLUMNS), 500);
        assert_eq!(rows_per_statement(4_000, SUMMARY_COLUMNS), 1_820);
        assert_eq!(rows_per_statement(0, 3), 1);
    }
}
