//! CSV export of the three analytical tables.
//!
//! File names match the flat-file layout downstream tools expect:
//! one file per table, header row first, UTF-8.

use crate::{
    complaint_generator::ComplaintRecord,
    error::PulseResult,
    metrics_aggregator::{DailyHealthRecord, OperatorBenchmark},
    store::PulseStore,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const COMPLAINTS_CSV: &str = "egypt_telecom_complaints.csv";
pub const DAILY_HEALTH_CSV: &str = "network_health_metrics.csv";
pub const BENCHMARKS_CSV: &str = "operator_benchmarks.csv";

pub const COMPLAINTS_HEADER: &[&str] = &[
    "complaint_id",
    "operator",
    "complaint_text",
    "complaint_category",
    "sentiment_score",
    "date",
    "governorate",
    "likes",
    "replies",
    "source",
    "collection_timestamp",
];

pub const DAILY_HEALTH_HEADER: &[&str] = &[
    "operator",
    "date",
    "daily_complaints",
    "avg_sentiment",
    "avg_likes",
    "avg_replies",
    "network_health_score",
    "dominant_complaint_category",
    "complaint_trend_7d",
];

pub const BENCHMARKS_HEADER: &[&str] = &[
    "operator",
    "total_complaints",
    "avg_sentiment",
    "avg_likes",
    "avg_replies",
    "network_health_score",
    "most_common_category",
    "performance_rating",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub files: Vec<PathBuf>,
    pub rows: usize,
}

/// Serialize `rows` to `path` under `header`. The header is written even
/// when `rows` is empty. Returns rows written.
pub fn write_csv<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> PulseResult<usize> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    log::debug!("wrote {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

/// Write in-memory tables straight to `dir`, creating it if needed.
pub fn export_tables(
    dir: &Path,
    complaints: &[ComplaintRecord],
    daily_health: &[DailyHealthRecord],
    benchmarks: &[OperatorBenchmark],
) -> PulseResult<ExportSummary> {
    std::fs::create_dir_all(dir)?;
    let mut summary = ExportSummary::default();

    summary.record(dir.join(COMPLAINTS_CSV), COMPLAINTS_HEADER, complaints)?;
    summary.record(dir.join(DAILY_HEALTH_CSV), DAILY_HEALTH_HEADER, daily_health)?;
    summary.record(dir.join(BENCHMARKS_CSV), BENCHMARKS_HEADER, benchmarks)?;

    log::info!(
        "exported {} rows across {} files to {}",
        summary.rows,
        summary.files.len(),
        dir.display()
    );
    Ok(summary)
}

/// Export whatever the store holds. A table that cannot be read is reported
/// and skipped; the remaining tables are still written.
pub fn export_store(store: &PulseStore, dir: &Path) -> PulseResult<ExportSummary> {
    std::fs::create_dir_all(dir)?;
    let mut summary = ExportSummary::default();

    match store.all_complaints() {
        Ok(rows) => summary.record(dir.join(COMPLAINTS_CSV), COMPLAINTS_HEADER, &rows)?,
        Err(e) => log::warn!("skipping {COMPLAINTS_CSV}: {e}"),
    }
    match store.all_daily_health() {
        Ok(rows) => summary.record(dir.join(DAILY_HEALTH_CSV), DAILY_HEALTH_HEADER, &rows)?,
        Err(e) => log::warn!("skipping {DAILY_HEALTH_CSV}: {e}"),
    }
    match store.all_benchmarks() {
        Ok(rows) => summary.record(dir.join(BENCHMARKS_CSV), BENCHMARKS_HEADER, &rows)?,
        Err(e) => log::warn!("skipping {BENCHMARKS_CSV}: {e}"),
    }

    log::info!(
        "exported {} rows across {} files to {}",
        summary.rows,
        summary.files.len(),
        dir.display()
    );
    Ok(summary)
}

impl ExportSummary {
    fn record<T: Serialize>(
        &mut self,
        path: PathBuf,
        header: &[&str],
        rows: &[T],
    ) -> PulseResult<()> {
        self.rows += write_csv(&path, header, rows)?;
        self.files.push(path);
        Ok(())
    }
}
