use configuration::{Config, DatabaseSettings};
use core_types::{KeyConflictPolicy, PriceListJoin, Relation, VendorSummary};
use database::{DbError, DbRepository, SummaryFilter, connect, run_migrations};
use indicatif::ProgressBar;
use ingestion::IngestError;
use pipeline::{PipelineError, SummaryPipeline};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PURCHASES: &str = "\
InventoryId,Store,Brand,Description,Size,VendorNumber,VendorName,PONumber,PurchasePrice,Quantity,Dollars,Classification
1_HARDERSFIELD_100,1,100,Brand A ,750mL,1,ALPHA WINES  ,11,10,10,100,1
1_HARDERSFIELD_200,1,200,Brand B,1L,2,BETA SPIRITS,21,5,4,20,1
2_HARDERSFIELD_200,2,200,Brand B,1L,2,BETA SPIRITS,22,5,6,30,1
1_HARDERSFIELD_201,1,201,Brand C,750mL,2,BETA SPIRITS,23,2,5,10,2
1_HARDERSFIELD_300,1,300,Brand D,750mL,3,GAMMA IMPORTS,31,1,1,1,2
";

const PURCHASE_PRICES: &str = "\
Brand,Description,Price,Size,Volume,Classification,PurchasePrice,VendorNumber,VendorName
100,Brand A,12,750mL,750,1,10,1,ALPHA WINES
200,Brand B,7,1L,1000,1,5,2,BETA SPIRITS
201,Brand C,3,750mL,Unknown,2,2,2,BETA SPIRITS
";

const VENDOR_INVOICE: &str = "\
VendorNumber,VendorName,InvoiceDate,PONumber,PODate,PayDate,Quantity,Dollars,Freight,Approval
1,ALPHA WINES,2024-01-04,11,2023-12-21,2024-02-16,10,100,5,None
2,BETA SPIRITS,2024-01-05,21,2023-12-22,2024-02-17,10,50,1.5,None
2,BETA SPIRITS,2024-01-06,23,2023-12-23,2024-02-18,5,10,2.5,None
";

const SALES: &str = "\
InventoryId,Store,Brand,Description,Size,SalesQuantity,SalesDollars,SalesPrice,SalesDate,Volume,Classification,ExciseTax,VendorNo,VendorName
1_HARDERSFIELD_100,1,100,Brand A,750mL,8,96,12,2024-01-01,750,1,1.0,1,ALPHA WINES
1_HARDERSFIELD_200,1,200,Brand B,1L,3,21,7,2024-01-01,1000,1,0.3,2,BETA SPIRITS
2_HARDERSFIELD_200,2,200,Brand B,1L,2,14,7,2024-01-02,1000,1,,2,BETA SPIRITS
1_HARDERSFIELD_300,1,300,Brand D,750mL,1,2,2,2024-01-02,750,2,0.1,3,GAMMA IMPORTS
";

fn write_inputs(dir: &Path, purchases: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("purchases.csv"), purchases).unwrap();
    fs::write(dir.join("purchase_prices.csv"), PURCHASE_PRICES).unwrap();
    fs::write(dir.join("vendor_invoice.csv"), VENDOR_INVOICE).unwrap();
    fs::write(dir.join("sales.csv"), SALES).unwrap();
}

struct Fixture {
    _dir: TempDir,
    config: Config,
    repo: DbRepository,
}

impl Fixture {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        write_inputs(&data_dir, PURCHASES);

        let mut config = Config::default();
        config.ingestion.data_dir = data_dir;
        config.ingestion.batch_size = 2;
        config.database = DatabaseSettings {
            path: dir.path().join("store").join("inventory.db"),
            busy_timeout_secs: 5,
        };

        let pool = connect(&config.database).await.unwrap();
        run_migrations(&pool).await.unwrap();
        Self {
            _dir: dir,
            config,
            repo: DbRepository::new(pool),
        }
    }

    fn pipeline(&self) -> SummaryPipeline {
        SummaryPipeline::new(self.config.clone(), self.repo.clone())
    }

    async fn summary(&self) -> Vec<VendorSummary> {
        self.repo.fetch_vendor_summary(SummaryFilter::All).await.unwrap()
    }
}

fn find(rows: &[VendorSummary], vendor: i64, brand: i64) -> &VendorSummary {
    rows.iter()
        .find(|r| r.vendor_number == vendor && r.brand == brand)
        .unwrap_or_else(|| panic!("no row for vendor {vendor} / brand {brand}"))
}

#[tokio::test]
async fn batch_publishes_one_row_per_priced_pair() {
    let fx = Fixture::new().await;
    let (ingest, summary) = fx.pipeline().run(ProgressBar::hidden()).await.unwrap();

    assert_eq!(ingest.relations[0].relation, Relation::Purchases);
    assert_eq!(ingest.relations[0].rows, 5);
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.enrichment.unparsable_volumes, 1);

    let rows = fx.summary().await;
    let keys: Vec<_> = rows.iter().map(|r| (r.vendor_number, r.brand)).collect();
    assert_eq!(keys, vec![(1, 100), (2, 200), (2, 201)]);

    // Purchase dollars are conserved over the priced pairs.
    let purchased: f64 = rows.iter().map(|r| r.total_purchase_dollars).sum();
    assert_eq!(purchased, 160.0);

    let b = find(&rows, 2, 200);
    assert_eq!(b.total_purchase_quantity, 10);
    assert_eq!(b.total_sales_quantity, 5);
    assert_eq!(b.total_sales_dollars, 35.0);
    assert_eq!(b.total_excise_tax, 0.3);
    assert_eq!(b.volume, 1000.0);
}

#[tokio::test]
async fn end_to_end_metrics_for_a_single_pair() {
    let fx = Fixture::new().await;
    fx.pipeline().run(ProgressBar::hidden()).await.unwrap();
    let rows = fx.summary().await;
    let a = find(&rows, 1, 100);

    assert_eq!(a.vendor_name, "ALPHA WINES");
    assert_eq!(a.description, "Brand A");
    assert_eq!(a.actual_price, 12.0);
    assert_eq!(a.volume, 750.0);
    assert_eq!(a.total_purchase_quantity, 10);
    assert_eq!(a.total_purchase_dollars, 100.0);
    assert_eq!(a.total_sales_quantity, 8);
    assert_eq!(a.total_sales_dollars, 96.0);
    assert_eq!(a.freight_cost, 5.0);
    assert_eq!(a.gross_profit, -4.0);
    assert_eq!(a.stock_turnover, Some(0.8));
    assert_eq!(a.sales_to_purchase_ratio, Some(0.96));
}

#[tokio::test]
async fn unsold_brand_and_vendor_freight() {
    let fx = Fixture::new().await;
    fx.pipeline().run(ProgressBar::hidden()).await.unwrap();
    let rows = fx.summary().await;

    let unsold = find(&rows, 2, 201);
    assert_eq!(unsold.total_sales_quantity, 0);
    assert_eq!(unsold.total_sales_dollars, 0.0);
    assert_eq!(unsold.gross_profit, -10.0);
    assert_eq!(unsold.profit_margin, None);
    assert_eq!(unsold.stock_turnover, Some(0.0));
    assert_eq!(unsold.volume, 0.0);

    // Freight is per vendor and repeats on every brand of that vendor.
    assert_eq!(find(&rows, 2, 200).freight_cost, 4.0);
    assert_eq!(unsold.freight_cost, 4.0);

    for row in &rows {
        for value in [row.profit_margin, row.stock_turnover, row.sales_to_purchase_ratio]
            .into_iter()
            .flatten()
        {
            assert!(value.is_finite());
        }
    }
}

#[tokio::test]
async fn rerunning_on_identical_input_is_idempotent() {
    let fx = Fixture::new().await;
    fx.pipeline().run(ProgressBar::hidden()).await.unwrap();
    let first = fx.summary().await;

    fx.pipeline().run(ProgressBar::hidden()).await.unwrap();
    let second = fx.summary().await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn left_join_keeps_unpriced_purchases_with_zero_prices() {
    let mut fx = Fixture::new().await;
    fx.config.aggregation.price_list_join = PriceListJoin::Left;
    fx.pipeline().run(ProgressBar::hidden()).await.unwrap();
    let rows = fx.summary().await;

    assert_eq!(rows.len(), 4);
    let unpriced = find(&rows, 3, 300);
    assert_eq!(unpriced.actual_price, 0.0);
    assert_eq!(unpriced.volume, 0.0);
    assert_eq!(unpriced.total_sales_dollars, 2.0);
    assert_eq!(unpriced.freight_cost, 0.0);
}

#[tokio::test]
async fn rejected_key_conflict_keeps_previous_summary() {
    let mut fx = Fixture::new().await;
    fx.pipeline().run(ProgressBar::hidden()).await.unwrap();
    let before = fx.summary().await;

    // Brand A bought again at a different price splits its purchase group.
    let conflicting = format!("{PURCHASES}9_HARDERSFIELD_100,9,100,Brand A,750mL,1,ALPHA WINES,12,11,2,22,1\n");
    write_inputs(&fx.config.ingestion.data_dir, &conflicting);

    let err = fx.pipeline().run(ProgressBar::hidden()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Aggregate(_)));
    assert_eq!(fx.summary().await, before);

    fx.config.aggregation.key_conflict = KeyConflictPolicy::Merge;
    fx.pipeline().summarize().await.unwrap();
    let merged = fx.summary().await;
    let a = find(&merged, 1, 100);
    assert_eq!(merged.len(), 3);
    assert_eq!(a.total_purchase_quantity, 12);
    assert_eq!(a.total_purchase_dollars, 122.0);
    assert_eq!(a.purchase_price, 10.0);
}

#[tokio::test]
async fn missing_input_leaves_store_untouched() {
    let fx = Fixture::new().await;
    fx.pipeline().run(ProgressBar::hidden()).await.unwrap();
    let counts = fx.repo.relation_counts().await.unwrap();
    let before = fx.summary().await;

    fs::remove_file(fx.config.ingestion.data_dir.join("vendor_invoice.csv")).unwrap();
    let err = fx.pipeline().run(ProgressBar::hidden()).await.unwrap_err();

    assert!(matches!(err, PipelineError::Ingest(_)));
    assert_eq!(fx.repo.relation_counts().await.unwrap(), counts);
    assert_eq!(fx.summary().await, before);
}

#[tokio::test]
async fn empty_purchase_cells_count_as_zero() {
    let fx = Fixture::new().await;
    let with_blank = format!("{PURCHASES}3_HARDERSFIELD_100,3,100,Brand A,750mL,1,ALPHA WINES,13,10,4,,1\n");
    write_inputs(&fx.config.ingestion.data_dir, &with_blank);

    let (ingest, summary) = fx.pipeline().run(ProgressBar::hidden()).await.unwrap();
    assert_eq!(ingest.relations[0].rows, 6);
    assert_eq!(summary.rows, 3);

    let rows = fx.summary().await;
    let a = find(&rows, 1, 100);
    assert_eq!(a.total_purchase_quantity, 14);
    assert_eq!(a.total_purchase_dollars, 100.0);
    let purchased: f64 = rows.iter().map(|r| r.total_purchase_dollars).sum();
    assert_eq!(purchased, 160.0);
}

#[tokio::test]
async fn non_finite_input_aborts_the_batch() {
    let fx = Fixture::new().await;
    fx.pipeline().run(ProgressBar::hidden()).await.unwrap();
    let before = fx.summary().await;

    let infinite = format!("{PURCHASES}3_HARDERSFIELD_100,3,100,Brand A,750mL,1,ALPHA WINES,13,10,4,inf,1\n");
    write_inputs(&fx.config.ingestion.data_dir, &infinite);

    let err = fx.pipeline().run(ProgressBar::hidden()).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Ingest(IngestError::NonFinite { column: "Dollars", line: 7, .. })
    ));
    assert_eq!(fx.summary().await, before);
    assert!(before.iter().all(|r| r.total_purchase_dollars.is_finite() && r.gross_profit.is_finite()));
}

#[tokio::test]
async fn reports_serialize_for_json_output() {
    let fx = Fixture::new().await;
    let pipeline = fx.pipeline();
    let (ingest, summary) = pipeline.run(ProgressBar::hidden()).await.unwrap();

    let ingest = serde_json::to_value(&ingest).unwrap();
    assert_eq!(ingest["run_id"], pipeline.run_id().to_string());
    assert_eq!(ingest["relations"][3]["relation"], "sales");
    assert_eq!(ingest["relations"][3]["rows"], 4);

    let summary = serde_json::to_value(&summary).unwrap();
    assert_eq!(summary["rows"], 3);
    assert_eq!(summary["enrichment"]["unparsable_volumes"], 1);
}

#[tokio::test]
async fn summary_is_absent_until_first_publish() {
    let fx = Fixture::new().await;
    fx.pipeline().ingest(ProgressBar::hidden()).await.unwrap();

    let err = fx.repo.fetch_vendor_summary(SummaryFilter::All).await.unwrap_err();
    assert!(matches!(err, DbError::SummaryNotPublished));
}
