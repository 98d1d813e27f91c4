//! # Vendorlens Pipeline
//!
//! Orchestrates the batch: loading the raw files into the store, and the
//! aggregate → enrich → publish sequence that produces `vendor_summary`.
//!
//! ## Architectural Principles
//!
//! - **Sequential Stages:** Every stage is awaited before the next one starts.
//!   Nothing overlaps and nothing is retried.
//! - **All or Nothing:** Input files are parsed completely before the store is
//!   touched, and the summary is swapped in by a single transaction. A failed
//!   batch leaves both the raw tables and the published summary as they were.
//! - **One Run, One Id:** Each `SummaryPipeline` carries a `run_id` that tags
//!   its log span and its reports.

use aggregator::Aggregator;
use configuration::Config;
use core_types::Relation;
use database::DbRepository;
use indicatif::{ProgressBar, ProgressStyle};
use metrics::{EnrichmentStats, MetricEnricher};
use serde::Serialize;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

pub mod error;

pub use error::PipelineError;

/// Rows loaded for one raw relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationLoad {
    pub relation: Relation,
    pub rows: usize,
}

/// Outcome of an ingest.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub relations: Vec<RelationLoad>,
    pub elapsed_ms: u64,
}

/// Outcome of an aggregate → enrich → publish batch.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub run_id: Uuid,
    /// Rows published to `vendor_summary`.
    pub rows: u64,
    pub enrichment: EnrichmentStats,
    pub elapsed_ms: u64,
}

/// The batch driver.
pub struct SummaryPipeline {
    // --- Context ---
    run_id: Uuid,
    config: Config,
    // --- Components ---
    aggregator: Aggregator,
    enricher: MetricEnricher,
    db_repo: DbRepository,
}

impl SummaryPipeline {
    /// Builds a pipeline for one run, with a fresh `run_id`.
    pub fn new(config: Config, db_repo: DbRepository) -> Self {
        let aggregator = Aggregator::new(config.aggregation.clone());
        let enricher = MetricEnricher::new(config.enrichment.zero_denominator);
        Self {
            run_id: Uuid::new_v4(),
            config,
            aggregator,
            enricher,
            db_repo,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Reads the four input files of `ingestion.data_dir` and replaces the raw
    /// relations with them.
    ///
    /// `progress` advances once per file read; pass `ProgressBar::hidden()`
    /// when nothing should be drawn.
    pub async fn ingest(&self, progress: ProgressBar) -> Result<IngestReport, PipelineError> {
        let span = tracing::info_span!("ingest", run_id = %self.run_id);
        self.ingest_inner(progress).instrument(span).await
    }

    async fn ingest_inner(&self, progress: ProgressBar) -> Result<IngestReport, PipelineError> {
        let started = Instant::now();
        let data_dir = self.config.ingestion.data_dir.clone();
        tracing::info!(data_dir = %data_dir.display(), "Ingest started.");

        progress.set_length(Relation::ALL.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=>-"),
        );

        let bar = progress.clone();
        let snapshot = tokio::task::spawn_blocking(move || {
            ingestion::load_snapshot_with(&data_dir, |relation, rows| {
                bar.set_message(format!("{relation}: {rows} rows"));
                bar.inc(1);
            })
        })
        .await??;

        progress.set_message("Replacing raw relations...");
        self.db_repo
            .replace_raw_relations(&snapshot, self.config.ingestion.batch_size)
            .await?;

        let relations: Vec<RelationLoad> = Relation::ALL
            .into_iter()
            .map(|relation| RelationLoad {
                relation,
                rows: snapshot.len_of(relation),
            })
            .collect();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        progress.finish_with_message("Raw relations replaced.");
        tracing::info!(
            rows = relations.iter().map(|r| r.rows).sum::<usize>(),
            elapsed_ms,
            "Ingest finished."
        );

        Ok(IngestReport {
            run_id: self.run_id,
            relations,
            elapsed_ms,
        })
    }

    /// Recomputes `vendor_summary` from the raw relations currently in the
    /// store and publishes it, replacing the previous version.
    pub async fn summarize(&self) -> Result<SummaryReport, PipelineError> {
        let span = tracing::info_span!("summary_batch", run_id = %self.run_id);
        self.summarize_inner().instrument(span).await
    }

    async fn summarize_inner(&self) -> Result<SummaryReport, PipelineError> {
        let started = Instant::now();
        tracing::info!(options = ?self.aggregator.options(), "Summary batch started.");

        // --- 1. AGGREGATE ---
        let combined = self.aggregator.run(&self.db_repo).await?;

        // --- 2. ENRICH ---
        let (summaries, enrichment) = self.enricher.enrich_all(combined);
        if enrichment.unparsable_volumes > 0 {
            tracing::warn!(
                rows = enrichment.unparsable_volumes,
                "Non-numeric Volume values were published as 0."
            );
        }

        // --- 3. PUBLISH ---
        let rows = self
            .db_repo
            .publish_vendor_summary(&summaries, self.config.ingestion.batch_size)
            .await?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(rows, elapsed_ms, "Vendor summary published.");

        Ok(SummaryReport {
            run_id: self.run_id,
            rows,
            enrichment,
            elapsed_ms,
        })
    }

    /// Ingest followed by summarize, under the same `run_id`.
    pub async fn run(&self, progress: ProgressBar) -> Result<(IngestReport, SummaryReport), PipelineError> {
        let ingest = self.ingest(progress).await?;
        let summary = self.summarize().await?;
        Ok((ingest, summary))
    }
}
