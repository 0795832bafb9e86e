//! The batch pipeline: generate, aggregate, load.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Complaint generator
//!   2. Daily health aggregation
//!   3. Operator benchmark aggregation
//!   4. Load all three tables (one transaction)
//!   5. CSV export (optional)
//!
//! RULES:
//!   - Each stage consumes the previous stage's complete output.
//!   - All randomness flows through the RngBank seeded from the run seed.
//!   - Every stage appends a PipelineEvent to the event log.

use crate::{
    complaint_generator::{ComplaintGenerator, ComplaintRecord},
    config::PulseConfig,
    csv_export::{self, ExportSummary},
    error::PulseResult,
    event::{EventLogEntry, PipelineEvent},
    metrics_aggregator::{
        compute_daily_health, compute_operator_benchmarks, DailyHealthRecord, OperatorBenchmark,
    },
    rng::RngBank,
    store::{LoadCounts, PulseStore},
    types::RunId,
};
use chrono::NaiveDateTime;
use std::collections::BTreeSet;
use std::path::Path;

/// Everything one run produced, kept in memory for callers that want it.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub run_id: RunId,
    pub complaints: Vec<ComplaintRecord>,
    pub daily_health: Vec<DailyHealthRecord>,
    pub benchmarks: Vec<OperatorBenchmark>,
    pub loaded: LoadCounts,
}

pub struct Pipeline {
    pub run_id: RunId,
    seed: u64,
    config: PulseConfig,
    store: PulseStore,
}

impl Pipeline {
    /// The store must already be migrated.
    pub fn new(run_id: RunId, seed: u64, config: PulseConfig, store: PulseStore) -> Self {
        Self {
            run_id,
            seed,
            config,
            store,
        }
    }

    /// Build a pipeline over a fresh, migrated in-memory store with the
    /// built-in config. Used by tests.
    pub fn build_test(run_id: RunId, seed: u64) -> PulseResult<Self> {
        let store = PulseStore::in_memory()?;
        store.migrate()?;
        Ok(Self::new(run_id, seed, PulseConfig::builtin(), store))
    }

    pub fn store(&self) -> &PulseStore {
        &self.store
    }

    pub fn into_store(self) -> PulseStore {
        self.store
    }

    /// Run stages 1-4 for `count` complaints anchored at `now`.
    pub fn run(&self, count: usize, now: NaiveDateTime) -> PulseResult<PipelineOutput> {
        self.store.insert_run(
            &self.run_id,
            self.seed,
            env!("CARGO_PKG_VERSION"),
            count,
            now,
        )?;
        self.record(&PipelineEvent::RunInitialized {
            run_id: self.run_id.clone(),
            seed: self.seed,
            requested: count,
        })?;

        // 1. Generate
        let bank = RngBank::new(self.seed);
        let mut generator = ComplaintGenerator::new(self.config.clone(), &bank)?;
        let complaints = generator.generate(count, now)?;
        let operators: BTreeSet<&str> = complaints.iter().map(|c| c.operator.as_str()).collect();
        self.record(&PipelineEvent::ComplaintsGenerated {
            count: complaints.len(),
            operators: operators.len(),
            first_date: complaints.iter().map(|c| c.date).min(),
            last_date: complaints.iter().map(|c| c.date).max(),
        })?;

        // 2. Daily health
        let daily_health = compute_daily_health(&complaints);
        self.record(&PipelineEvent::DailyHealthComputed {
            rows: daily_health.len(),
            max_daily_complaints: daily_health
                .iter()
                .map(|r| r.daily_complaints)
                .max()
                .unwrap_or(0),
        })?;

        // 3. Benchmarks
        let benchmarks = compute_operator_benchmarks(&complaints, &daily_health);
        self.record(&PipelineEvent::BenchmarksComputed {
            rows: benchmarks.len(),
        })?;

        // 4. Load
        let loaded = self
            .store
            .load_tables(&complaints, &daily_health, &benchmarks)?;
        self.record(&PipelineEvent::TablesLoaded {
            complaints: loaded.complaints,
            daily_health: loaded.daily_health,
            benchmarks: loaded.benchmarks,
        })?;

        log::info!(
            "run {} complete: {} complaints, {} daily rows, {} operators",
            self.run_id,
            complaints.len(),
            daily_health.len(),
            benchmarks.len(),
        );

        Ok(PipelineOutput {
            run_id: self.run_id.clone(),
            complaints,
            daily_health,
            benchmarks,
            loaded,
        })
    }

    /// 5. Write the run's tables as CSV files under `dir`.
    pub fn export(&self, output: &PipelineOutput, dir: &Path) -> PulseResult<ExportSummary> {
        let summary = csv_export::export_tables(
            dir,
            &output.complaints,
            &output.daily_health,
            &output.benchmarks,
        )?;
        self.record(&PipelineEvent::CsvExported {
            dir: dir.display().to_string(),
            files: summary.files.len(),
        })?;
        Ok(summary)
    }

    /// Events recorded for this run, in order.
    pub fn events(&self) -> PulseResult<Vec<PipelineEvent>> {
        self.store
            .events_for_run(&self.run_id)?
            .iter()
            .map(|entry| entry.decode().map_err(Into::into))
            .collect()
    }

    fn record(&self, event: &PipelineEvent) -> PulseResult<()> {
        let entry = EventLogEntry::new(&self.run_id, event)?;
        self.store.append_event(&entry)?;
        log::debug!("run {} [{}] {}", self.run_id, entry.stage, entry.event_type);
        Ok(())
    }
}
