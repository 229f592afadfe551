//! RegionLens - district-level insights from registry transaction batches
//!
//! A CLI tool that loads enrolment, demographic-update and biometric-update
//! batches, aggregates them per district and exports the JSON artefacts
//! backing the dashboard.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, unwritable output, invalid arguments)

mod analysis;
mod cli;
mod config;
mod engine;
mod error;
mod models;
mod report;
mod source;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, SourceMode, CONFIG_FILE};
use engine::InsightEngine;
use models::{EventKind, RecordCounts, RegionAggregate, RegionDetail, Report, ReportMetadata};
use source::{DatasetLoader, SourceSettings};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("RegionLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .regionlens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize sources, variants and output.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load, aggregate and export.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let settings = SourceSettings::from(&config.source);
    let loader = DatasetLoader::new(settings, !args.quiet);

    if args.dry_run {
        return handle_dry_run(&loader);
    }

    let source = match config.source.mode {
        SourceMode::Local => config.source.datasets_path.clone(),
        SourceMode::Remote => config.source.base_url.clone(),
    };

    println!("📥 Loading datasets from: {}", source);
    let store = loader.load().await?;
    if store.is_empty() {
        warn!("No records were loaded; every output will be empty");
    }

    let records = RecordCounts {
        enrolment: store.len(EventKind::Enrolment),
        demographic: store.len(EventKind::Demographic),
        biometric: store.len(EventKind::Biometric),
    };

    let engine = InsightEngine::new(store, config.analysis);

    // Single-region query mode
    if let Some(ref name) = args.region {
        let detail = engine.region_detail(name);
        if detail.is_unknown() {
            warn!("Region '{}' was not found", name.trim());
        } else if detail.time_series.as_ref().is_some_and(|ts| ts.is_empty()) {
            info!("Region '{}' has no dated records", name.trim());
        }
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    println!("🔬 Aggregating {} regions...", engine.get_all_region_aggregates().len());

    let output_dir = Path::new(&config.general.output_dir);
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    report::write_json(output_dir, report::AGGREGATES_FILE, &engine.region_details())?;
    report::write_json(
        output_dir,
        report::TIME_SERIES_FILE,
        &engine.composite_time_series(),
    )?;
    let summary = engine.get_summary().rounded();
    report::write_json(output_dir, report::SUMMARY_FILE, &summary)?;

    let duration = start_time.elapsed().as_secs_f64();

    if let Some(ref report_path) = args.report {
        println!("\n📝 Generating report...");

        let options = engine.options();
        let lifecycle_is_percentage = options.lifecycle.is_percentage();
        let top = config.report.top_regions;
        let regions = engine.get_all_region_aggregates().values();

        let detail =
            |agg: &RegionAggregate| RegionDetail::from_aggregate(agg, lifecycle_is_percentage, None);

        let report = Report {
            metadata: ReportMetadata {
                source: source.clone(),
                source_mode: config.source.mode,
                generated_at: Utc::now(),
                typology_policy: options.typology,
                lifecycle_variant: options.lifecycle,
                imbalance_variant: options.imbalance,
                records,
                duration_seconds: duration,
            },
            summary: summary.clone(),
            most_volatile: analysis::most_volatile(regions.clone(), top)
                .into_iter()
                .map(detail)
                .collect(),
            lowest_compliance: analysis::lowest_compliance(regions, top)
                .into_iter()
                .map(detail)
                .collect(),
        };

        let output = match args.format {
            OutputFormat::Json => report::generate_json_report(&report)?,
            OutputFormat::Markdown => report::generate_markdown_report(&report),
        };

        std::fs::write(report_path, &output)
            .with_context(|| format!("Failed to write report to {}", report_path.display()))?;
        println!("   Report saved to: {}", report_path.display());
    }

    // Print summary
    println!("\n📊 Summary:");
    println!("   Regions: {}", summary.total_regions);
    println!(
        "   Enrolments: {} | Demographic updates: {} | Biometric updates: {}",
        summary.total_enrolments, summary.total_demo_updates, summary.total_bio_updates
    );
    println!(
        "   Avg identity volatility: {:.4} | Avg adult bio compliance: {:.2}%",
        summary.avg_identity_volatility, summary.avg_adult_bio_compliance
    );
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Export complete! Files saved to: {}",
        output_dir.display()
    );

    Ok(())
}

/// Handle --dry-run: list the source units, exit without reading them.
fn handle_dry_run(loader: &DatasetLoader) -> Result<()> {
    println!("\n🔍 Dry run: listing source units (nothing is read)...\n");

    let units = loader.plan();

    if units.is_empty() {
        println!("   No source units found.");
    } else {
        for unit in &units {
            println!("     📄 {}", unit);
        }
        println!("\n   Total: {} units", units.len());
    }

    println!("\n✅ Dry run complete.");
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
