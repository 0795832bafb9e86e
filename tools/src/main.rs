//! pulse-runner: headless pipeline runner for Telecom Pulse.
//!
//! Usage:
//!   pulse-runner run --seed 42 --count 600 --db egypt_telecom.db
//!   pulse-runner report --db egypt_telecom.db --operator vodafone --out report.md
//!   pulse-runner status --db egypt_telecom.db
//!   pulse-runner export --db egypt_telecom.db --out-dir ./csv

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use telecom_pulse_core::{
    analytics::{
        Analytics, QueryFilter, DEFAULT_GOVERNORATE_LIMIT, DEFAULT_WEEKLY_LIMIT,
    },
    config::PulseConfig,
    csv_export,
    pipeline::Pipeline,
    report::render_report,
    store::PulseStore,
};

#[derive(Parser)]
#[command(name = "pulse-runner")]
#[command(about = "Synthetic telecom complaint analytics pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate complaints, aggregate metrics, and load the database
    Run {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 600)]
        count: usize,
        #[arg(long, default_value = "egypt_telecom.db")]
        db: String,
        /// Directory with operators/, complaints/, locations/ JSON files.
        /// The built-in config is used when omitted.
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Also write the three tables as CSV files here
        #[arg(long)]
        csv_dir: Option<PathBuf>,
        #[arg(long)]
        run_id: Option<String>,
    },
    /// Render a markdown analytics report
    Report {
        #[arg(long, default_value = "egypt_telecom.db")]
        db: String,
        /// Config directory for operator colors; built-in config when omitted
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Operator to focus on ("All" for every operator)
        #[arg(long)]
        operator: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show row counts for every table
    Status {
        #[arg(long, default_value = "egypt_telecom.db")]
        db: String,
    },
    /// Export stored tables as CSV files
    Export {
        #[arg(long, default_value = "egypt_telecom.db")]
        db: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            seed,
            count,
            db,
            data_dir,
            csv_dir,
            run_id,
        } => {
            let config = load_config(data_dir)?;

            println!("Telecom Pulse: pulse-runner");
            println!("  seed:      {seed}");
            println!("  count:     {count}");
            println!("  db:        {db}");
            println!();

            let store = PulseStore::open(&db).with_context(|| format!("failed to open {db}"))?;
            store.migrate()?;

            let run_id = run_id.unwrap_or_else(|| format!("run-{seed}-{}", uuid::Uuid::new_v4()));
            let pipeline = Pipeline::new(run_id, seed, config, store);
            let now = chrono::Local::now().naive_local();
            let output = pipeline.run(count, now)?;

            println!("=== RUN SUMMARY ===");
            println!("  run_id:        {}", output.run_id);
            println!("  complaints:    {}", output.loaded.complaints);
            println!("  daily rows:    {}", output.loaded.daily_health);
            println!("  benchmarks:    {}", output.loaded.benchmarks);

            if let Some(dir) = csv_dir {
                let summary = pipeline.export(&output, &dir)?;
                println!(
                    "  csv export:    {} files in {}",
                    summary.files.len(),
                    dir.display()
                );
            }

            print_analytics(&Analytics::new(pipeline.store()));
        }
        Commands::Report {
            db,
            data_dir,
            operator,
            from,
            to,
            out,
        } => {
            let config = load_config(data_dir)?;
            let store = open_existing(&db)?;
            let mut filter = QueryFilter::all().between(from, to);
            if let Some(operator) = operator {
                filter = filter.with_operator(operator);
            }
            let report = render_report(&Analytics::new(&store), &filter, &config.operators);
            match out {
                Some(path) => {
                    std::fs::write(&path, report)?;
                    println!("Report written to {}.", path.display());
                }
                None => print!("{report}"),
            }
        }
        Commands::Status { db } => {
            let store = open_existing(&db)?;
            for status in Analytics::new(&store).table_status() {
                match status.rows {
                    Some(rows) => println!("{}: {rows} rows", status.table),
                    None => println!("{}: Not found", status.table),
                }
            }
        }
        Commands::Export { db, out_dir } => {
            let store = open_existing(&db)?;
            let summary = csv_export::export_store(&store, &out_dir)?;
            println!(
                "Exported {} rows across {} files to {}.",
                summary.rows,
                summary.files.len(),
                out_dir.display()
            );
        }
    }

    Ok(())
}

fn load_config(data_dir: Option<PathBuf>) -> Result<PulseConfig> {
    match data_dir {
        Some(dir) => PulseConfig::load(&dir)
            .with_context(|| format!("failed to load config from {}", dir.display())),
        None => Ok(PulseConfig::builtin()),
    }
}

/// Open a database for reading. A missing file is reported, not fatal:
/// queries then run against an empty in-memory store and return nothing.
fn open_existing(db: &str) -> Result<PulseStore> {
    if Path::new(db).exists() {
        Ok(PulseStore::open(db)?)
    } else {
        log::warn!("database {db} not found, continuing with empty results");
        Ok(PulseStore::in_memory()?)
    }
}

fn print_analytics(analytics: &Analytics<'_>) {
    let filter = QueryFilter::all();

    println!();
    println!("=== OPERATOR PERFORMANCE RANKING ===");
    let ranking = analytics.operator_ranking(&filter);
    if ranking.is_empty() {
        println!("  (no benchmarks)");
    }
    for row in ranking {
        println!(
            "  {:<10} health {:>6} | {:<9} | {:>4} complaints | top {:<16} | sentiment {}",
            row.operator,
            row.health_score
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "n/a".into()),
            row.performance_rating,
            row.total_complaints,
            row.most_common_category,
            row.avg_sentiment
                .map(|v| format!("{v:.3}"))
                .unwrap_or_else(|| "n/a".into()),
        );
    }

    println!();
    println!("=== COMPLAINT CATEGORY BREAKDOWN ===");
    for share in analytics.category_breakdown(&filter) {
        println!(
            "  {:<16} {:>4} ({:>6.2}%)",
            share.category, share.complaint_count, share.percentage
        );
    }

    println!();
    println!("=== COMPLAINTS BY GOVERNORATE ===");
    for row in analytics.governorate_breakdown(&filter, DEFAULT_GOVERNORATE_LIMIT) {
        println!(
            "  {:<12} {:>4} complaints | {}",
            row.governorate,
            row.complaint_count,
            row.sentiment_label.as_str()
        );
    }

    println!();
    println!("=== WEEKLY PERFORMANCE TRENDS ===");
    for trend in analytics.weekly_trends(&filter, DEFAULT_WEEKLY_LIMIT) {
        println!(
            "  {} {:<10} health {:>6} | {:>3} complaints",
            trend.week_start,
            trend.operator,
            trend
                .weekly_health_score
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "n/a".into()),
            trend.weekly_complaints,
        );
    }
}
