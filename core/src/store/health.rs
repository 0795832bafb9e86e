use super::PulseStore;
use crate::{
    error::PulseResult,
    metrics_aggregator::{DailyHealthRecord, OperatorBenchmark, PerformanceRating},
};
use rusqlite::{params, types::Type, Connection};

fn daily_health_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<DailyHealthRecord> {
    Ok(DailyHealthRecord {
        operator: row.get(0)?,
        date: row.get(1)?,
        daily_complaints: row.get(2)?,
        avg_sentiment: row.get(3)?,
        avg_likes: row.get(4)?,
        avg_replies: row.get(5)?,
        network_health_score: row.get(6)?,
        dominant_complaint_category: row.get(7)?,
        complaint_trend_7d: row.get(8)?,
    })
}

fn benchmark_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<OperatorBenchmark> {
    let rating: String = row.get(7)?;
    let performance_rating = rating
        .parse::<PerformanceRating>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
    Ok(OperatorBenchmark {
        operator: row.get(0)?,
        total_complaints: row.get(1)?,
        avg_sentiment: row.get(2)?,
        avg_likes: row.get(3)?,
        avg_replies: row.get(4)?,
        network_health_score: row.get(5)?,
        most_common_category: row.get(6)?,
        performance_rating,
    })
}

pub(super) fn replace_daily_health(
    conn: &Connection,
    rows: &[DailyHealthRecord],
) -> PulseResult<usize> {
    conn.execute("DELETE FROM network_health_daily", [])?;
    let mut stmt = conn.prepare(
        "INSERT INTO network_health_daily (
            operator, date, daily_complaints, avg_sentiment, avg_likes, avg_replies,
            network_health_score, dominant_complaint_category, complaint_trend_7d
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    for r in rows {
        stmt.execute(params![
            &r.operator,
            r.date,
            r.daily_complaints,
            r.avg_sentiment,
            r.avg_likes,
            r.avg_replies,
            r.network_health_score,
            &r.dominant_complaint_category,
            r.complaint_trend_7d,
        ])?;
    }
    Ok(rows.len())
}

pub(super) fn replace_benchmarks(
    conn: &Connection,
    rows: &[OperatorBenchmark],
) -> PulseResult<usize> {
    conn.execute("DELETE FROM operator_benchmarks", [])?;
    let mut stmt = conn.prepare(
        "INSERT INTO operator_benchmarks (
            operator, total_complaints, avg_sentiment, avg_likes, avg_replies,
            network_health_score, most_common_category, performance_rating
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    for b in rows {
        stmt.execute(params![
            &b.operator,
            b.total_complaints,
            b.avg_sentiment,
            b.avg_likes,
            b.avg_replies,
            b.network_health_score,
            &b.most_common_category,
            b.performance_rating.as_str(),
        ])?;
    }
    Ok(rows.len())
}

impl PulseStore {
    // ── Network health ─────────────────────────────────────────────

    pub fn all_daily_health(&self) -> PulseResult<Vec<DailyHealthRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT operator, date, daily_complaints, avg_sentiment, avg_likes, avg_replies,
                    network_health_score, dominant_complaint_category, complaint_trend_7d
             FROM network_health_daily
             ORDER BY operator ASC, date ASC",
        )?;
        let rows = stmt.query_map([], daily_health_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn daily_health_for_operator(&self, operator: &str) -> PulseResult<Vec<DailyHealthRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT operator, date, daily_complaints, avg_sentiment, avg_likes, avg_replies,
                    network_health_score, dominant_complaint_category, complaint_trend_7d
             FROM network_health_daily
             WHERE operator = ?1
             ORDER BY date ASC",
        )?;
        let rows = stmt.query_map(params![operator], daily_health_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Benchmarks ─────────────────────────────────────────────────

    pub fn all_benchmarks(&self) -> PulseResult<Vec<OperatorBenchmark>> {
        let mut stmt = self.conn.prepare(
            "SELECT operator, total_complaints, avg_sentiment, avg_likes, avg_replies,
                    network_health_score, most_common_category, performance_rating
             FROM operator_benchmarks
             ORDER BY operator ASC",
        )?;
        let rows = stmt.query_map([], benchmark_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
