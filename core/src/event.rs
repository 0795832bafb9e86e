//! Pipeline event log.
//!
//! RULE: Every stage records what it produced as a PipelineEvent.
//! Events are serialized to JSON and appended to `event_log` so a run's
//! history can be inspected after the fact.

use crate::types::RunId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Every event emitted during a pipeline run.
/// Variants are added per stage, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunInitialized {
        run_id: RunId,
        seed: u64,
        requested: usize,
    },
    ComplaintsGenerated {
        count: usize,
        operators: usize,
        first_date: Option<NaiveDate>,
        last_date: Option<NaiveDate>,
    },
    DailyHealthComputed {
        rows: usize,
        max_daily_complaints: i64,
    },
    BenchmarksComputed {
        rows: usize,
    },
    TablesLoaded {
        complaints: usize,
        daily_health: usize,
        benchmarks: usize,
    },
    CsvExported {
        dir: String,
        files: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Pipeline,
    Generate,
    Aggregate,
    Load,
    Export,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pipeline => "pipeline",
            Self::Generate => "generate",
            Self::Aggregate => "aggregate",
            Self::Load => "load",
            Self::Export => "export",
        }
    }
}

impl PipelineEvent {
    /// Stable name for the event_type column.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. } => "run_initialized",
            Self::ComplaintsGenerated { .. } => "complaints_generated",
            Self::DailyHealthComputed { .. } => "daily_health_computed",
            Self::BenchmarksComputed { .. } => "benchmarks_computed",
            Self::TablesLoaded { .. } => "tables_loaded",
            Self::CsvExported { .. } => "csv_exported",
        }
    }

    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::RunInitialized { .. } => PipelineStage::Pipeline,
            Self::ComplaintsGenerated { .. } => PipelineStage::Generate,
            Self::DailyHealthComputed { .. } | Self::BenchmarksComputed { .. } => {
                PipelineStage::Aggregate
            }
            Self::TablesLoaded { .. } => PipelineStage::Load,
            Self::CsvExported { .. } => PipelineStage::Export,
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub stage: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized PipelineEvent
}

impl EventLogEntry {
    pub fn new(run_id: &str, event: &PipelineEvent) -> serde_json::Result<Self> {
        Ok(Self {
            id: None,
            run_id: run_id.to_string(),
            stage: event.stage().as_str().to_string(),
            event_type: event.event_type().to_string(),
            payload: serde_json::to_string(event)?,
        })
    }

    pub fn decode(&self) -> serde_json::Result<PipelineEvent> {
        serde_json::from_str(&self.payload)
    }
}
