//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Pipeline stages and the analytics layer call store methods; they never
//! execute SQL directly.

use crate::{
    complaint_generator::ComplaintRecord,
    error::PulseResult,
    event::EventLogEntry,
    metrics_aggregator::{DailyHealthRecord, OperatorBenchmark},
};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

mod analytics;
mod complaint;
mod health;

pub const COMPLAINTS_TABLE: &str = "customer_complaints";
pub const DAILY_HEALTH_TABLE: &str = "network_health_daily";
pub const BENCHMARKS_TABLE: &str = "operator_benchmarks";

/// The three analytical tables, in load order.
pub const DATA_TABLES: [&str; 3] = [COMPLAINTS_TABLE, DAILY_HEALTH_TABLE, BENCHMARKS_TABLE];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub seed: u64,
    pub version: String,
    pub complaint_count: i64,
    pub started_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadCounts {
    pub complaints: usize,
    pub daily_health: usize,
    pub benchmarks: usize,
}

pub struct PulseStore {
    conn: Connection,
}

impl PulseStore {
    pub fn open(path: &str) -> PulseResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PulseResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Every migration is idempotent.
    pub fn migrate(&self) -> PulseResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_complaints.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_network_health.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(
        &self,
        run_id: &str,
        seed: u64,
        version: &str,
        complaint_count: usize,
        started_at: NaiveDateTime,
    ) -> PulseResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, complaint_count, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run_id,
                seed as i64,
                version,
                complaint_count as i64,
                started_at
            ],
        )?;
        Ok(())
    }

    /// Most recently started run, if any.
    pub fn latest_run(&self) -> PulseResult<Option<RunRecord>> {
        self.conn
            .query_row(
                "SELECT run_id, seed, version, complaint_count, started_at
                 FROM run ORDER BY started_at DESC, rowid DESC LIMIT 1",
                [],
                |row| {
                    Ok(RunRecord {
                        run_id: row.get(0)?,
                        seed: row.get::<_, i64>(1)? as u64,
                        version: row.get(2)?,
                        complaint_count: row.get(3)?,
                        started_at: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> PulseResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, stage, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.run_id, entry.stage, entry.event_type, entry.payload],
        )?;
        Ok(())
    }

    pub fn events_for_run(&self, run_id: &str) -> PulseResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, stage, event_type, payload
             FROM event_log WHERE run_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    run_id: row.get(1)?,
                    stage: row.get(2)?,
                    event_type: row.get(3)?,
                    payload: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Tables ─────────────────────────────────────────────────

    pub fn table_exists(&self, table: &str) -> PulseResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Row count for a table, or None when the table does not exist.
    pub fn table_row_count(&self, table: &str) -> PulseResult<Option<i64>> {
        if !self.table_exists(table)? {
            return Ok(None);
        }
        // Name verified against sqlite_master above.
        let sql = format!("SELECT COUNT(*) FROM \"{table}\"");
        let count = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(Some(count))
    }

    /// Replace the contents of all three analytical tables in one transaction.
    /// A failure leaves the previous load intact.
    pub fn load_tables(
        &self,
        complaints: &[ComplaintRecord],
        daily_health: &[DailyHealthRecord],
        benchmarks: &[OperatorBenchmark],
    ) -> PulseResult<LoadCounts> {
        let tx = self.conn.unchecked_transaction()?;
        let counts = LoadCounts {
            complaints: complaint::replace_complaints(&tx, complaints)?,
            daily_health: health::replace_daily_health(&tx, daily_health)?,
            benchmarks: health::replace_benchmarks(&tx, benchmarks)?,
        };
        tx.commit()?;
        log::info!(
            "loaded {} complaints, {} daily health rows, {} benchmarks",
            counts.complaints,
            counts.daily_health,
            counts.benchmarks,
        );
        Ok(counts)
    }
}
