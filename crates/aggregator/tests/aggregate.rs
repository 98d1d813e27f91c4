use aggregator::{AggregateError, Aggregator};
use configuration::AggregationOptions;
use core_types::{
    KeyConflictPolicy, PriceListJoin, PurchasePriceRecord, PurchaseRecord, RawSnapshot, SalesRecord,
    VendorInvoiceRecord,
};
use database::{DbRepository, connect_in_memory, run_migrations};

fn purchase(vendor: i64, brand: i64, price: f64, quantity: i64) -> PurchaseRecord {
    PurchaseRecord {
        vendor_number: vendor,
        vendor_name: "DIAGEO NORTH AMERICA INC".to_string(),
        brand,
        description: "Ketel One Vodka".to_string(),
        purchase_price: Some(price),
        quantity: Some(quantity),
        dollars: Some(price * quantity as f64),
    }
}

fn snapshot() -> RawSnapshot {
    RawSnapshot {
        purchases: vec![
            purchase(3960, 1233, 10.0, 10),
            purchase(3960, 1233, 12.0, 5),
            purchase(3960, 4261, 2.0, 4),
            // No price-list entry.
            purchase(4425, 77, 3.0, 3),
        ],
        purchase_prices: vec![
            PurchasePriceRecord {
                vendor_number: 3960,
                brand: 1233,
                price: Some(15.0),
                volume: Some("750".to_string()),
            },
            PurchasePriceRecord {
                vendor_number: 3960,
                brand: 4261,
                price: Some(3.5),
                volume: Some("1000".to_string()),
            },
        ],
        vendor_invoices: vec![VendorInvoiceRecord {
            vendor_number: 3960,
            po_number: 1,
            freight: Some(12.5),
        }],
        sales: vec![SalesRecord {
            vendor_no: 3960,
            brand: 1233,
            sales_quantity: Some(9),
            sales_dollars: Some(135.0),
            sales_price: Some(15.0),
            excise_tax: Some(0.9),
        }],
    }
}

async fn seeded_repo() -> DbRepository {
    let pool = connect_in_memory().await.unwrap();
    run_migrations(&pool).await.unwrap();
    let repo = DbRepository::new(pool);
    repo.replace_raw_relations(&snapshot(), 100).await.unwrap();
    repo
}

#[tokio::test]
async fn purchase_price_variation_is_rejected_by_default() {
    let repo = seeded_repo().await;
    let err = Aggregator::default().run(&repo).await.unwrap_err();
    assert!(matches!(err, AggregateError::DuplicateKey { rows: 2, conflicting_keys: 1, .. }));
}

#[tokio::test]
async fn merge_yields_one_row_per_pair_and_conserves_purchases() {
    let repo = seeded_repo().await;
    let aggregator = Aggregator::new(AggregationOptions {
        key_conflict: KeyConflictPolicy::Merge,
        ..Default::default()
    });
    let rows = aggregator.run(&repo).await.unwrap();

    let keys: Vec<_> = rows.iter().map(|r| (r.vendor_number, r.brand)).collect();
    assert_eq!(keys, vec![(3960, 1233), (3960, 4261)]);

    let merged = &rows[0];
    assert_eq!(merged.total_purchase_quantity, Some(15));
    assert_eq!(merged.total_purchase_dollars, Some(160.0));
    assert_eq!(merged.purchase_price, Some(10.0));
    assert_eq!(merged.total_sales_quantity, Some(9));
    assert_eq!(merged.freight_cost, Some(12.5));
}

#[tokio::test]
async fn left_join_keeps_unpriced_purchases() {
    let repo = seeded_repo().await;
    let aggregator = Aggregator::new(AggregationOptions {
        key_conflict: KeyConflictPolicy::Merge,
        price_list_join: PriceListJoin::Left,
        vendor_filter: vec![4425],
        ..Default::default()
    });
    let rows = aggregator.run(&repo).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].brand, 77);
    assert_eq!(rows[0].actual_price, None);
    assert_eq!(rows[0].total_sales_quantity, None);
    assert_eq!(rows[0].freight_cost, None);
}
