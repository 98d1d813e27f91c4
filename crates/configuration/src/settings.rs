use core_types::{KeyConflictPolicy, PriceListJoin, SortDirection, ZeroDenominatorPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analysis_config::AnalysisConfig;

/// The root configuration structure for the entire application.
///
/// Every section falls back to its defaults, so an empty (or missing)
/// `config.toml` yields a usable configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseSettings,
    pub ingestion: IngestionSettings,
    pub aggregation: AggregationOptions,
    pub enrichment: EnrichmentSettings,
    pub analysis: AnalysisConfig,
    pub logging: LoggingSettings,
}

/// Where the relational store lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path of the SQLite database file. Created if missing.
    pub path: PathBuf,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("inventory.db"),
            busy_timeout_secs: 30,
        }
    }
}

/// Parameters for loading the raw delimited files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    /// Directory holding `purchases.csv`, `purchase_prices.csv`,
    /// `vendor_invoice.csv` and `sales.csv`.
    pub data_dir: PathBuf,
    /// Rows per multi-row INSERT statement.
    pub batch_size: usize,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            batch_size: 500,
        }
    }
}

/// Named options of the vendor/brand aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationOptions {
    /// Join mode between purchases and the price list.
    pub price_list_join: PriceListJoin,
    /// Exclusive lower bound on `PurchasePrice`. Purchases priced at or below
    /// it are ignored. `None` keeps every purchase.
    pub min_purchase_price: Option<f64>,
    /// Sort direction on `TotalPurchaseDollars`.
    pub order: SortDirection,
    /// Restricts the aggregation to these vendors. Empty means all vendors.
    pub vendor_filter: Vec<i64>,
    /// Behaviour when one (vendor, brand) yields several purchase groups.
    pub key_conflict: KeyConflictPolicy,
}

/// Options of the metric enricher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentSettings {
    pub zero_denominator: ZeroDenominatorPolicy,
}

/// Log verbosity and the optional log file sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive, e.g. `info` or `database=debug,info`.
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

// ==============================================================================
// Command-line overrides
// ==============================================================================

/// Overrides for the store location.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct StoreOverrides {
    /// Path of the SQLite database (overrides `database.path`).
    #[cfg_attr(feature = "clap", arg(long, global = true))]
    pub database: Option<PathBuf>,
}

impl StoreOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.database {
            config.database.path = path.clone();
        }
    }
}

/// Overrides for the ingestion stage.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct IngestOverrides {
    /// Directory of the input files (overrides `ingestion.data_dir`).
    #[cfg_attr(feature = "clap", arg(long))]
    pub data_dir: Option<PathBuf>,
}

impl IngestOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.ingestion.data_dir = dir.clone();
        }
    }
}

/// Overrides for the aggregation and enrichment stages.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct SummaryOverrides {
    /// Sort direction on TotalPurchaseDollars.
    #[cfg_attr(feature = "clap", arg(long, value_enum))]
    pub order: Option<SortDirection>,

    /// Join mode between purchases and the price list.
    #[cfg_attr(feature = "clap", arg(long, value_enum))]
    pub price_list_join: Option<PriceListJoin>,

    /// Ignore purchases priced at or below this value.
    #[cfg_attr(feature = "clap", arg(long))]
    pub min_purchase_price: Option<f64>,

    /// Restrict the summary to a vendor. Repeat for several vendors.
    #[cfg_attr(feature = "clap", arg(long = "vendor"))]
    pub vendors: Vec<i64>,

    /// Behaviour when a (vendor, brand) yields several purchase groups.
    #[cfg_attr(feature = "clap", arg(long, value_enum))]
    pub key_conflict: Option<KeyConflictPolicy>,

    /// Value of a ratio metric whose denominator is zero.
    #[cfg_attr(feature = "clap", arg(long, value_enum))]
    pub zero_denominator: Option<ZeroDenominatorPolicy>,
}

impl SummaryOverrides {
    pub fn apply(&self, config: &mut Config) {
        let aggregation = &mut config.aggregation;
        if let Some(order) = self.order {
            aggregation.order = order;
        }
        if let Some(join) = self.price_list_join {
            aggregation.price_list_join = join;
        }
        if self.min_purchase_price.is_some() {
            aggregation.min_purchase_price = self.min_purchase_price;
        }
        if !self.vendors.is_empty() {
            aggregation.vendor_filter = self.vendors.clone();
        }
        if let Some(policy) = self.key_conflict {
            aggregation.key_conflict = policy;
        }
        if let Some(policy) = self.zero_denominator {
            config.enrichment.zero_denominator = policy;
        }
    }
}
