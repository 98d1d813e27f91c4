use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod analysis_config;
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use analysis_config::{AnalysisConfig, Thresholds};
pub use logging::init_logging;
pub use settings::{
    AggregationOptions, Config, DatabaseSettings, EnrichmentSettings, IngestOverrides,
    IngestionSettings, LoggingSettings, StoreOverrides, SummaryOverrides,
};

/// Prefix of environment variable overrides, e.g. `VENDORLENS__DATABASE__PATH`.
pub const ENV_PREFIX: &str = "VENDORLENS";

/// Upper bound of `ingestion.batch_size`, keeping every multi-row INSERT under
/// SQLite's bound-parameter limit for the widest raw table.
pub const MAX_BATCH_SIZE: usize = 4_000;

/// Loads the application configuration.
///
/// Reads the TOML file at `path` if it exists, then applies environment
/// overrides (`VENDORLENS__SECTION__KEY`), deserializes the result into our
/// strongly-typed `Config` struct and validates it.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(
            config::File::from(path)
                .format(config::FileFormat::Toml)
                .required(false),
        )
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("aggregation.vendor_filter"),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}

impl Config {
    /// Rejects settings that would make a batch fail half-way through.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "database.path must not be empty".to_string(),
            ));
        }
        if self.ingestion.batch_size == 0 || self.ingestion.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "ingestion.batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.ingestion.batch_size
            )));
        }
        if let Some(bound) = self.aggregation.min_purchase_price {
            if !bound.is_finite() {
                return Err(ConfigError::ValidationError(
                    "aggregation.min_purchase_price must be a finite number".to_string(),
                ));
            }
        }

        let analysis = &self.analysis;
        if analysis.top_n == 0 {
            return Err(ConfigError::ValidationError(
                "analysis.top_n must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("analysis.confidence", analysis.confidence),
            ("analysis.alpha", analysis.alpha),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must lie strictly between 0 and 1, got {value}"
                )));
            }
        }
        let t = &analysis.thresholds;
        for (name, value) in [
            ("low_sales_quantile", t.low_sales_quantile),
            ("high_margin_quantile", t.high_margin_quantile),
            ("top_performer_quantile", t.top_performer_quantile),
            ("low_performer_quantile", t.low_performer_quantile),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "analysis.thresholds.{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        if t.low_performer_quantile > t.top_performer_quantile {
            return Err(ConfigError::ValidationError(
                "analysis.thresholds.low_performer_quantile exceeds top_performer_quantile"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
