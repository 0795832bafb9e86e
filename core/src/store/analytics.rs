//! Set-based analytical queries behind `crate::analytics`.
//!
//! Numeric aggregates are read through `numeric()`, which coerces NULL or
//! non-numeric cells to None instead of failing the row.

use super::PulseStore;
use crate::{
    analytics::{
        BestPerformer, CategoryCount, CategoryShare, DateBounds, GovernorateOperatorCell,
        GovernorateRow, HealthPoint, Kpis, QueryFilter, RankingRow, RecentComplaint,
        SentimentLabel, SentimentTone, WeeklyTrend,
    },
    error::PulseResult,
    types::{round2, round3, UNKNOWN_LOCATION},
};
use chrono::NaiveDate;
use rusqlite::{
    params_from_iter,
    types::{Value, ValueRef},
    OptionalExtension,
};

/// Accumulates WHERE conditions and their positional values.
#[derive(Default)]
struct Clause {
    conditions: Vec<String>,
    values: Vec<Value>,
}

impl Clause {
    /// Conditions for a filter. `date_col` is None for tables without dates.
    fn from_filter(filter: &QueryFilter, operator_col: &str, date_col: Option<&str>) -> Self {
        let mut clause = Self::default();
        if let Some(operator) = &filter.operator {
            clause.bind(format!("{operator_col} = ?"), Value::Text(operator.clone()));
        }
        if let Some(col) = date_col {
            if let Some(from) = filter.from {
                clause.bind(format!("{col} >= ?"), date_value(from));
            }
            if let Some(to) = filter.to {
                clause.bind(format!("{col} <= ?"), date_value(to));
            }
        }
        clause
    }

    fn bind(&mut self, condition: String, value: Value) {
        self.conditions.push(condition);
        self.values.push(value);
    }

    fn where_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// Values for the WHERE clause followed by any trailing values (LIMIT).
    fn values_with(&self, trailing: &[Value]) -> Vec<Value> {
        self.values.iter().chain(trailing).cloned().collect()
    }
}

fn date_value(date: NaiveDate) -> Value {
    Value::Text(date.format("%Y-%m-%d").to_string())
}

fn limit_value(limit: usize) -> Value {
    Value::Integer(limit.min(i64::MAX as usize) as i64)
}

/// SQL expression yielding `col` when it holds a number and NULL otherwise.
/// SQLite's AVG/SUM/ROUND read text as 0.0, so aggregates go through this.
fn number(col: &str) -> String {
    format!("(CASE WHEN typeof({col}) IN ('integer', 'real') THEN {col} END)")
}

/// Read a numeric cell, coercing NULL and unparseable text to None.
fn numeric(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

impl PulseStore {
    // ── KPIs ───────────────────────────────────────────────────────

    pub fn query_kpis(&self, filter: &QueryFilter) -> PulseResult<Kpis> {
        let complaints = Clause::from_filter(filter, "operator", Some("date"));

        let (total_complaints, avg_sentiment) = self.conn.query_row(
            &format!(
                "SELECT COUNT(*), AVG({}) FROM customer_complaints {}",
                number("sentiment_score"),
                complaints.where_sql()
            ),
            params_from_iter(complaints.values.iter()),
            |row| Ok((row.get::<_, i64>(0)?, numeric(row, 1)?)),
        )?;

        let most_common_issue = self
            .conn
            .query_row(
                &format!(
                    "SELECT complaint_category FROM customer_complaints {}
                     GROUP BY complaint_category
                     ORDER BY COUNT(*) DESC, complaint_category ASC
                     LIMIT 1",
                    complaints.where_sql()
                ),
                params_from_iter(complaints.values.iter()),
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        let health = Clause::from_filter(filter, "operator", Some("date"));
        let best_performer = self
            .conn
            .query_row(
                &format!(
                    "SELECT operator, AVG({}) AS score
                     FROM network_health_daily {}
                     GROUP BY operator
                     ORDER BY score DESC, operator ASC
                     LIMIT 1",
                    number("network_health_score"),
                    health.where_sql()
                ),
                params_from_iter(health.values.iter()),
                |row| {
                    Ok(BestPerformer {
                        operator: row.get(0)?,
                        health_score: numeric(row, 1)?.map(round3),
                    })
                },
            )
            .optional()?;

        Ok(Kpis {
            total_complaints,
            avg_sentiment: avg_sentiment.map(round3),
            best_performer,
            most_common_issue,
        })
    }

    // ── Rankings and breakdowns ────────────────────────────────────

    pub fn query_operator_ranking(&self, filter: &QueryFilter) -> PulseResult<Vec<RankingRow>> {
        let clause = Clause::from_filter(filter, "operator", None);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT operator, ROUND({}, 2) AS health_score, performance_rating,
                    total_complaints, most_common_category, ROUND({}, 3)
             FROM operator_benchmarks {}
             ORDER BY health_score DESC, operator ASC",
            number("network_health_score"),
            number("avg_sentiment"),
            clause.where_sql()
        ))?;
        let rows = stmt.query_map(params_from_iter(clause.values.iter()), |row| {
            Ok(RankingRow {
                operator: row.get(0)?,
                health_score: numeric(row, 1)?,
                performance_rating: row.get(2)?,
                total_complaints: row.get(3)?,
                most_common_category: row.get(4)?,
                avg_sentiment: numeric(row, 5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn query_category_breakdown(&self, filter: &QueryFilter) -> PulseResult<Vec<CategoryShare>> {
        let clause = Clause::from_filter(filter, "operator", Some("date"));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT complaint_category, COUNT(*) AS complaint_count, AVG({})
             FROM customer_complaints {}
             GROUP BY complaint_category
             ORDER BY complaint_count DESC, complaint_category ASC",
            number("sentiment_score"),
            clause.where_sql()
        ))?;
        let counted = stmt
            .query_map(params_from_iter(clause.values.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    numeric(row, 2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // Groups partition the filtered rows, so their counts sum to the total.
        let total: i64 = counted.iter().map(|(_, count, _)| count).sum();
        Ok(counted
            .into_iter()
            .map(|(category, complaint_count, avg)| CategoryShare {
                category,
                complaint_count,
                percentage: if total > 0 {
                    round2(complaint_count as f64 * 100.0 / total as f64)
                } else {
                    0.0
                },
                avg_sentiment: avg.map(round3),
            })
            .collect())
    }

    pub fn query_governorate_breakdown(
        &self,
        filter: &QueryFilter,
        limit: usize,
    ) -> PulseResult<Vec<GovernorateRow>> {
        let mut clause = Clause::from_filter(filter, "operator", Some("date"));
        clause.bind(
            "governorate != ?".into(),
            Value::Text(UNKNOWN_LOCATION.into()),
        );
        let mut stmt = self.conn.prepare(&format!(
            "SELECT governorate, COUNT(*) AS complaint_count, AVG({})
             FROM customer_complaints {}
             GROUP BY governorate
             ORDER BY complaint_count DESC, governorate ASC
             LIMIT ?",
            number("sentiment_score"),
            clause.where_sql()
        ))?;
        let rows = stmt.query_map(
            params_from_iter(clause.values_with(&[limit_value(limit)])),
            |row| {
                let avg_sentiment = numeric(row, 2)?;
                Ok(GovernorateRow {
                    governorate: row.get(0)?,
                    complaint_count: row.get(1)?,
                    avg_sentiment: avg_sentiment.map(round3),
                    sentiment_label: SentimentLabel::from_average(avg_sentiment),
                })
            },
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn query_governorate_operator_matrix(
        &self,
        filter: &QueryFilter,
    ) -> PulseResult<Vec<GovernorateOperatorCell>> {
        let mut clause = Clause::from_filter(filter, "operator", Some("date"));
        clause.bind(
            "governorate != ?".into(),
            Value::Text(UNKNOWN_LOCATION.into()),
        );
        let mut stmt = self.conn.prepare(&format!(
            "SELECT governorate, operator, COUNT(*), AVG({})
             FROM customer_complaints {}
             GROUP BY governorate, operator
             ORDER BY governorate ASC, operator ASC",
            number("sentiment_score"),
            clause.where_sql()
        ))?;
        let rows = stmt.query_map(params_from_iter(clause.values.iter()), |row| {
            Ok(GovernorateOperatorCell {
                governorate: row.get(0)?,
                operator: row.get(1)?,
                complaints: row.get(2)?,
                avg_sentiment: numeric(row, 3)?.map(round3),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn query_category_by_operator(
        &self,
        filter: &QueryFilter,
    ) -> PulseResult<Vec<CategoryCount>> {
        let clause = Clause::from_filter(filter, "operator", Some("date"));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT operator, complaint_category, COUNT(*)
             FROM customer_complaints {}
             GROUP BY operator, complaint_category
             ORDER BY operator ASC, complaint_category ASC",
            clause.where_sql()
        ))?;
        let rows = stmt.query_map(params_from_iter(clause.values.iter()), |row| {
            Ok(CategoryCount {
                operator: row.get(0)?,
                category: row.get(1)?,
                count: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Time series ────────────────────────────────────────────────

    /// Weekly rollup of the daily health table. Weeks start on Monday:
    /// stepping back 6 days then forward to the next Monday lands on the
    /// Monday on or before `date`.
    pub fn query_weekly_trends(
        &self,
        filter: &QueryFilter,
        limit: usize,
    ) -> PulseResult<Vec<WeeklyTrend>> {
        let clause = Clause::from_filter(filter, "operator", Some("date"));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT operator,
                    date(date, '-6 days', 'weekday 1') AS week_start,
                    ROUND(AVG({}), 2) AS weekly_health_score,
                    SUM({})
             FROM network_health_daily {}
             GROUP BY operator, week_start
             ORDER BY week_start DESC, weekly_health_score DESC, operator ASC
             LIMIT ?",
            number("network_health_score"),
            number("daily_complaints"),
            clause.where_sql()
        ))?;
        let rows = stmt.query_map(
            params_from_iter(clause.values_with(&[limit_value(limit)])),
            |row| {
                Ok(WeeklyTrend {
                    operator: row.get(0)?,
                    week_start: row.get(1)?,
                    weekly_health_score: numeric(row, 2)?,
                    weekly_complaints: numeric(row, 3)?.map_or(0, |n| n as i64),
                })
            },
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn query_health_timeline(&self, filter: &QueryFilter) -> PulseResult<Vec<HealthPoint>> {
        let clause = Clause::from_filter(filter, "operator", Some("date"));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT operator, date, network_health_score
             FROM network_health_daily {}
             ORDER BY date ASC, operator ASC",
            clause.where_sql()
        ))?;
        let rows = stmt.query_map(params_from_iter(clause.values.iter()), |row| {
            Ok(HealthPoint {
                operator: row.get(0)?,
                date: row.get(1)?,
                health_score: numeric(row, 2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn query_recent_complaints(
        &self,
        filter: &QueryFilter,
        limit: usize,
    ) -> PulseResult<Vec<RecentComplaint>> {
        let clause = Clause::from_filter(filter, "operator", Some("date"));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT operator, complaint_text, complaint_category, sentiment_score, date, governorate
             FROM customer_complaints {}
             ORDER BY date DESC, collection_timestamp DESC, complaint_id DESC
             LIMIT ?",
            clause.where_sql()
        ))?;
        let rows = stmt.query_map(
            params_from_iter(clause.values_with(&[limit_value(limit)])),
            |row| {
                let sentiment_score = numeric(row, 3)?;
                Ok(RecentComplaint {
                    operator: row.get(0)?,
                    complaint_text: row.get(1)?,
                    category: row.get(2)?,
                    sentiment_score,
                    date: row.get(4)?,
                    governorate: row.get(5)?,
                    tone: SentimentTone::from_score(sentiment_score),
                })
            },
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Filter domains ─────────────────────────────────────────────

    pub fn query_available_operators(&self) -> PulseResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT operator FROM customer_complaints ORDER BY operator ASC",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn query_date_bounds(&self) -> PulseResult<Option<DateBounds>> {
        let (min, max) = self.conn.query_row(
            "SELECT MIN(date), MAX(date) FROM customer_complaints",
            [],
            |row| {
                Ok((
                    row.get::<_, Option<NaiveDate>>(0)?,
                    row.get::<_, Option<NaiveDate>>(1)?,
                ))
            },
        )?;
        Ok(min.zip(max).map(|(min, max)| DateBounds { min, max }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Same tables as the migrated schema but without column types or
    /// NOT NULL, the way a hand-edited or foreign database can hold them.
    fn loose_store() -> PulseStore {
        let store = PulseStore::in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TABLE customer_complaints (
                    complaint_id INTEGER PRIMARY KEY, operator TEXT, complaint_text TEXT,
                    complaint_category TEXT, sentiment_score, date TEXT, governorate TEXT,
                    likes, replies, source TEXT, collection_timestamp TEXT);
                 CREATE TABLE network_health_daily (
                    operator TEXT, date TEXT, daily_complaints, avg_sentiment, avg_likes,
                    avg_replies, network_health_score, dominant_complaint_category TEXT,
                    complaint_trend_7d);
                 CREATE TABLE operator_benchmarks (
                    operator TEXT PRIMARY KEY, total_complaints INTEGER, avg_sentiment,
                    avg_likes, avg_replies, network_health_score, most_common_category TEXT,
                    performance_rating TEXT);

                 INSERT INTO customer_complaints VALUES
                    (1, 'orange', 'Calls dropping', 'calls', 'not-a-number', '2024-05-06',
                     'Cairo', 0, 0, 'synthetic', '2024-05-31 09:00:00'),
                    (2, 'orange', 'Bill is wrong', 'billing', NULL, '2024-05-07',
                     'Cairo', 0, 0, 'synthetic', '2024-05-31 09:00:00'),
                    (3, 'we', 'Slow internet in Giza', 'internet', -0.4, '2024-05-07',
                     'Giza', 2, 1, 'synthetic', '2024-05-31 09:00:00');
                 INSERT INTO network_health_daily VALUES
                    ('orange', '2024-05-06', 'x', 'garbage', 0, 0, 'n/a', 'calls', 1.0),
                    ('orange', '2024-05-07', 1, NULL, 0, 0, NULL, 'billing', 1.0),
                    ('we', '2024-05-07', 1, -0.4, 2, 1, 72.5, 'internet', 1.0);
                 INSERT INTO operator_benchmarks VALUES
                    ('orange', 2, 'garbage', 0, 0, 'n/a', 'calls', 'Poor'),
                    ('we', 1, -0.4, 2, 1, 72.5, 'internet', 'Good');",
            )
            .unwrap();
        store
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn kpis_skip_malformed_cells() {
        let store = loose_store();
        let all = store.query_kpis(&QueryFilter::all()).unwrap();
        assert_eq!(all.total_complaints, 3);
        assert_eq!(all.avg_sentiment, Some(-0.4));
        let best = all.best_performer.unwrap();
        assert_eq!(best.operator, "we");
        assert_eq!(best.health_score, Some(72.5));

        let orange = store
            .query_kpis(&QueryFilter::all().with_operator("orange"))
            .unwrap();
        assert_eq!(orange.total_complaints, 2);
        assert_eq!(orange.avg_sentiment, None);
        assert_eq!(orange.best_performer.unwrap().health_score, None);
    }

    #[test]
    fn ranking_reads_malformed_benchmarks_as_missing() {
        let ranking = loose_store()
            .query_operator_ranking(&QueryFilter::all())
            .unwrap();
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].operator, "we");
        assert_eq!(ranking[0].health_score, Some(72.5));
        assert_eq!(ranking[0].avg_sentiment, Some(-0.4));
        assert_eq!(ranking[1].operator, "orange");
        assert_eq!(ranking[1].health_score, None);
        assert_eq!(ranking[1].avg_sentiment, None);
    }

    #[test]
    fn breakdowns_average_only_numeric_sentiment() {
        let store = loose_store();
        let filter = QueryFilter::all();

        let categories = store.query_category_breakdown(&filter).unwrap();
        let avg = |name: &str| {
            categories
                .iter()
                .find(|c| c.category == name)
                .unwrap()
                .avg_sentiment
        };
        assert_eq!(avg("calls"), None);
        assert_eq!(avg("billing"), None);
        assert_eq!(avg("internet"), Some(-0.4));

        let governorates = store.query_governorate_breakdown(&filter, 10).unwrap();
        assert_eq!(governorates[0].governorate, "Cairo");
        assert_eq!(governorates[0].complaint_count, 2);
        assert_eq!(governorates[0].avg_sentiment, None);
        assert_eq!(governorates[0].sentiment_label, SentimentLabel::Negative);
        assert_eq!(governorates[1].avg_sentiment, Some(-0.4));

        let matrix = store.query_governorate_operator_matrix(&filter).unwrap();
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix[0].avg_sentiment, None);
        assert_eq!(matrix[1].avg_sentiment, Some(-0.4));
    }

    #[test]
    fn time_series_read_malformed_cells_as_missing() {
        let store = loose_store();
        let filter = QueryFilter::all();

        let weekly = store.query_weekly_trends(&filter, 12).unwrap();
        let orange = weekly.iter().find(|w| w.operator == "orange").unwrap();
        assert_eq!(orange.week_start, day(6));
        assert_eq!(orange.weekly_health_score, None);
        assert_eq!(orange.weekly_complaints, 1);
        let we = weekly.iter().find(|w| w.operator == "we").unwrap();
        assert_eq!(we.weekly_health_score, Some(72.5));

        let timeline = store.query_health_timeline(&filter).unwrap();
        let scores: Vec<Option<f64>> = timeline.iter().map(|p| p.health_score).collect();
        assert_eq!(scores, vec![None, None, Some(72.5)]);

        let recent = store.query_recent_complaints(&filter, 15).unwrap();
        let rows: Vec<(&str, Option<f64>, SentimentTone)> = recent
            .iter()
            .map(|r| (r.operator.as_str(), r.sentiment_score, r.tone))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("we", Some(-0.4), SentimentTone::Negative),
                ("orange", None, SentimentTone::Neutral),
                ("orange", None, SentimentTone::Neutral),
            ]
        );
    }
}
