use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use configuration::{Config, IngestOverrides, StoreOverrides, SummaryOverrides, init_logging, load_config};
use database::{DbRepository, SummaryFilter, connect, run_migrations};
use indicatif::ProgressBar;
use pipeline::SummaryPipeline;
use std::path::PathBuf;

mod render;

/// The main entry point for the vendorlens application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment overrides may live in a .env file; it is optional.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    // Held until exit so the file writer flushes.
    let _log_guard = init_logging(&config.logging).context("Failed to initialise logging")?;

    // Initialize the store connection and run migrations
    let pool = connect(&config.database)
        .await
        .with_context(|| format!("Failed to open the store at {}", config.database.path.display()))?;
    run_migrations(&pool).await.context("Failed to run database migrations")?;
    let db_repo = DbRepository::new(pool);

    let json = cli.json;
    let result = match cli.command {
        Commands::Ingest(_) => handle_ingest(config, db_repo.clone(), json).await,
        Commands::Summarize(_) => handle_summarize(config, db_repo.clone(), json).await,
        Commands::Run(_) => handle_run(config, db_repo.clone(), json).await,
        Commands::Inspect => handle_inspect(&db_repo).await,
        Commands::Analyze(args) => handle_analyze(config, &db_repo, args, json).await,
    };

    db_repo.close().await;
    result
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Builds an analysis-ready vendor performance summary from raw purchase,
/// price-list, invoice and sales files.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path of the TOML configuration file. Missing files are ignored.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Print reports as JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    store: StoreOverrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the four input files into the store, replacing the raw relations.
    Ingest(IngestOverrides),
    /// Aggregate, enrich and publish the vendor summary.
    Summarize(SummaryOverrides),
    /// Ingest, then summarize.
    Run(RunArgs),
    /// List the relations in the store with their row counts.
    Inspect,
    /// Print the statistical analysis of the published summary.
    Analyze(AnalyzeArgs),
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    ingest: IngestOverrides,

    #[command(flatten)]
    summary: SummaryOverrides,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Analyse every row instead of only the profitable ones.
    #[arg(long)]
    all_rows: bool,
}

/// File, then environment, then command-line flags.
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    cli.store.apply(&mut config);
    match &cli.command {
        Commands::Ingest(overrides) => overrides.apply(&mut config),
        Commands::Summarize(overrides) => overrides.apply(&mut config),
        Commands::Run(args) => {
            args.ingest.apply(&mut config);
            args.summary.apply(&mut config);
        }
        Commands::Inspect | Commands::Analyze(_) => {}
    }

    config.validate().context("Invalid command-line override")?;
    Ok(config)
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_ingest(config: Config, db_repo: DbRepository, json: bool) -> anyhow::Result<()> {
    let pipeline = SummaryPipeline::new(config, db_repo);
    let report = pipeline
        .ingest(ProgressBar::new(0))
        .await
        .context("Ingest failed; the store is unchanged")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render::ingest_table(&report));
    }
    Ok(())
}

async fn handle_summarize(config: Config, db_repo: DbRepository, json: bool) -> anyhow::Result<()> {
    let pipeline = SummaryPipeline::new(config, db_repo);
    let report = pipeline
        .summarize()
        .await
        .context("Summary batch failed; the previous summary is unchanged")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render::summary_table(&report));
    }
    Ok(())
}

async fn handle_run(config: Config, db_repo: DbRepository, json: bool) -> anyhow::Result<()> {
    let pipeline = SummaryPipeline::new(config, db_repo);
    tracing::info!(run_id = %pipeline.run_id(), "Starting full run.");

    let (ingest, summary) = pipeline
        .run(ProgressBar::new(0))
        .await
        .context("Run failed; the previous summary is unchanged")?;

    if json {
        let reports = serde_json::json!({ "ingest": ingest, "summary": summary });
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("{}", render::ingest_table(&ingest));
        println!("{}", render::summary_table(&summary));
    }
    Ok(())
}

async fn handle_inspect(db_repo: &DbRepository) -> anyhow::Result<()> {
    let counts = db_repo
        .relation_counts()
        .await
        .context("Failed to list the store's relations")?;

    println!("{}", render::relation_table(&counts));
    if !db_repo.summary_exists().await? {
        println!("No vendor summary has been published yet.");
    }
    Ok(())
}

async fn handle_analyze(
    config: Config,
    db_repo: &DbRepository,
    args: AnalyzeArgs,
    json: bool,
) -> anyhow::Result<()> {
    let filter = if args.all_rows {
        SummaryFilter::All
    } else {
        SummaryFilter::Profitable
    };
    let rows = db_repo
        .fetch_vendor_summary(filter)
        .await
        .context("Failed to read the vendor summary")?;

    let engine = analytics::AnalyticsEngine::new(config.analysis);
    let report = engine.analyze(&rows).context("Analysis failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_analysis(&report);
    }
    Ok(())
}
