//! # Vendorlens Aggregator
//!
//! Produces one `CombinedSummaryRow` per (vendor, brand) from the raw
//! relations in the store.
//!
//! ## Architectural Principles
//!
//! - **SQL Does the Grouping:** The heavy lifting (three grouped sub-summaries
//!   and their joins) runs inside the store. This crate decides the query
//!   parameters and checks the result.
//! - **One Row Per Key:** The purchase side is grouped on its descriptive and
//!   price columns too, so a pair bought at two prices comes back as two
//!   rows. The `KeyConflictPolicy` either rejects such a batch or merges the
//!   rows, before anything reaches the enricher.
//! - **Read Only:** Nothing here writes to the store.

use configuration::AggregationOptions;
use core_types::{CombinedSummaryRow, KeyConflictPolicy, PriceListJoin, SortDirection, SummaryKey};
use database::{AggregationQuery, DbRepository};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

pub mod error;

pub use error::AggregateError;

/// Runs the vendor/brand aggregation under a fixed set of options.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    options: AggregationOptions,
}

impl Aggregator {
    pub fn new(options: AggregationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AggregationOptions {
        &self.options
    }

    /// The store query these options translate to.
    pub fn query(&self) -> AggregationQuery {
        AggregationQuery {
            price_list_join: self.options.price_list_join,
            min_purchase_price: self.options.min_purchase_price,
            order: self.options.order,
            vendors: self.options.vendor_filter.clone(),
        }
    }

    /// Aggregates the current raw relations into one row per (vendor, brand),
    /// ordered by `TotalPurchaseDollars` in the configured direction with ties
    /// broken by vendor then brand.
    pub async fn run(&self, repo: &DbRepository) -> Result<Vec<CombinedSummaryRow>, AggregateError> {
        let started = Instant::now();
        let query = self.query();

        if query.price_list_join == PriceListJoin::Inner {
            let unpriced = repo.count_unpriced_pairs(&query).await?;
            if unpriced > 0 {
                tracing::warn!(
                    pairs = unpriced,
                    "Purchased pairs without a price-list entry are left out of the summary."
                );
            }
        }

        let duplicated = repo.count_duplicate_price_entries().await?;
        if duplicated > 0 {
            tracing::warn!(
                pairs = duplicated,
                "Pairs listed more than once in the price list; their purchases are counted once per entry."
            );
        }

        let rows = repo.combined_summary(&query).await?;
        let fetched = rows.len();
        let rows = resolve_key_conflicts(rows, self.options.key_conflict, self.options.order)?;

        tracing::info!(
            rows = rows.len(),
            merged = fetched - rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Aggregation finished."
        );
        Ok(rows)
    }
}

/// Ensures every (vendor, brand) appears once in `rows`.
///
/// `Reject` fails on the first duplicated key in row order. `Merge` sums the
/// purchase quantities and dollars of the duplicates, takes the descriptive
/// and price fields of the duplicate with the largest `TotalPurchaseDollars`
/// (the first one on ties), and keeps the sales and freight values, which are
/// identical across the duplicates. The merged rows are then re-sorted.
pub fn resolve_key_conflicts(
    rows: Vec<CombinedSummaryRow>,
    policy: KeyConflictPolicy,
    order: SortDirection,
) -> Result<Vec<CombinedSummaryRow>, AggregateError> {
    let mut counts: HashMap<SummaryKey, usize> = HashMap::with_capacity(rows.len());
    for row in &rows {
        *counts.entry(row.key()).or_default() += 1;
    }
    let first_duplicate = rows
        .iter()
        .map(CombinedSummaryRow::key)
        .find(|key| counts[key] > 1);
    let Some(key) = first_duplicate else {
        return Ok(rows);
    };

    match policy {
        KeyConflictPolicy::Reject => {
            let conflicting_keys = counts.values().filter(|&&n| n > 1).count();
            Err(AggregateError::DuplicateKey {
                key,
                rows: counts[&key],
                conflicting_keys,
            })
        }
        KeyConflictPolicy::Merge => Ok(merge_duplicates(rows, order)),
    }
}

fn merge_duplicates(rows: Vec<CombinedSummaryRow>, order: SortDirection) -> Vec<CombinedSummaryRow> {
    let mut merged: Vec<CombinedSummaryRow> = Vec::new();
    // Purchase dollars of the row whose descriptive fields `merged[i]` carries.
    let mut lead_dollars: Vec<Option<f64>> = Vec::new();
    let mut positions: HashMap<SummaryKey, usize> = HashMap::new();

    for row in rows {
        let Some(&index) = positions.get(&row.key()) else {
            positions.insert(row.key(), merged.len());
            lead_dollars.push(row.total_purchase_dollars);
            merged.push(row);
            continue;
        };

        tracing::debug!(key = %row.key(), "Merging duplicate aggregation row.");
        let target = &mut merged[index];
        let quantity = add(target.total_purchase_quantity, row.total_purchase_quantity);
        let dollars = add(target.total_purchase_dollars, row.total_purchase_dollars);

        if compare_dollars(row.total_purchase_dollars, lead_dollars[index]) == Ordering::Greater {
            lead_dollars[index] = row.total_purchase_dollars;
            target.vendor_name = row.vendor_name;
            target.description = row.description;
            target.purchase_price = row.purchase_price;
            target.actual_price = row.actual_price;
            target.volume = row.volume;
        }
        target.total_purchase_quantity = quantity;
        target.total_purchase_dollars = dollars;
    }

    merged.sort_by(|a, b| {
        let by_dollars = compare_dollars(a.total_purchase_dollars, b.total_purchase_dollars);
        let by_dollars = match order {
            SortDirection::Ascending => by_dollars,
            SortDirection::Descending => by_dollars.reverse(),
        };
        by_dollars.then_with(|| a.key().cmp(&b.key()))
    });
    merged
}

/// SQL `SUM` semantics: absent only when both sides are absent.
fn add<T: std::ops::Add<Output = T>>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Orders absent totals before any value, as the store does.
fn compare_dollars(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}
