//! Read-only analytical query layer.
//!
//! Every query:
//!   1. Accepts a QueryFilter (operator selection, inclusive date range)
//!   2. Delegates the set-based SQL to the store
//!   3. Degrades to an empty/default result on failure, logging a warning
//!
//! A missing table, an empty table, or a malformed numeric cell never
//! surfaces as an error to the caller. Queries have no side effects, so
//! any number of them may run in any order.

use crate::{
    error::PulseResult,
    metrics_aggregator::DailyHealthRecord,
    store::{PulseStore, RunRecord, DATA_TABLES},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Filter shared by every query. `None` fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub operator: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl QueryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// `"All"` (the dashboard's catch-all choice) selects every operator.
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        let operator = operator.into();
        self.operator = if operator.eq_ignore_ascii_case("all") {
            None
        } else {
            Some(operator)
        };
        self
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.operator.is_none() && self.from.is_none() && self.to.is_none()
    }
}

// ── Result rows ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestPerformer {
    pub operator: String,
    pub health_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub total_complaints: i64,
    pub avg_sentiment: Option<f64>,
    pub best_performer: Option<BestPerformer>,
    pub most_common_issue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRow {
    pub operator: String,
    pub health_score: Option<f64>,
    pub performance_rating: String,
    pub total_complaints: i64,
    pub most_common_category: String,
    pub avg_sentiment: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: String,
    pub complaint_count: i64,
    pub percentage: f64,
    pub avg_sentiment: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// `> 0` Positive, `> -0.3` Neutral, anything else (including missing)
    /// Negative.
    pub fn from_average(avg: Option<f64>) -> Self {
        match avg {
            Some(v) if v > 0.0 => Self::Positive,
            Some(v) if v > -0.3 => Self::Neutral,
            _ => Self::Negative,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernorateRow {
    pub governorate: String,
    pub complaint_count: i64,
    pub avg_sentiment: Option<f64>,
    pub sentiment_label: SentimentLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernorateOperatorCell {
    pub governorate: String,
    pub operator: String,
    pub complaints: i64,
    pub avg_sentiment: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTrend {
    pub operator: String,
    /// Monday of the ISO week.
    pub week_start: NaiveDate,
    pub weekly_health_score: Option<f64>,
    pub weekly_complaints: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthPoint {
    pub operator: String,
    pub date: NaiveDate,
    pub health_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub operator: String,
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentTone {
    Positive,
    Neutral,
    Negative,
}

impl SentimentTone {
    /// `> 0.1` positive, `< -0.1` negative, otherwise (or missing) neutral.
    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            Some(v) if v > 0.1 => Self::Positive,
            Some(v) if v < -0.1 => Self::Negative,
            _ => Self::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentComplaint {
    pub operator: String,
    pub complaint_text: String,
    pub category: String,
    pub sentiment_score: Option<f64>,
    pub date: NaiveDate,
    pub governorate: String,
    pub tone: SentimentTone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStatus {
    pub table: String,
    /// None when the table does not exist.
    pub rows: Option<i64>,
}

// ── Query surface ────────────────────────────────────────────────────────────

pub const DEFAULT_GOVERNORATE_LIMIT: usize = 10;
pub const DEFAULT_WEEKLY_LIMIT: usize = 12;
pub const DEFAULT_RECENT_LIMIT: usize = 15;

pub struct Analytics<'a> {
    store: &'a PulseStore,
}

impl<'a> Analytics<'a> {
    pub fn new(store: &'a PulseStore) -> Self {
        Self { store }
    }

    pub fn kpis(&self, filter: &QueryFilter) -> Kpis {
        degrade("kpis", self.store.query_kpis(filter))
    }

    pub fn operator_ranking(&self, filter: &QueryFilter) -> Vec<RankingRow> {
        degrade("operator ranking", self.store.query_operator_ranking(filter))
    }

    pub fn category_breakdown(&self, filter: &QueryFilter) -> Vec<CategoryShare> {
        degrade(
            "category breakdown",
            self.store.query_category_breakdown(filter),
        )
    }

    pub fn governorate_breakdown(&self, filter: &QueryFilter, limit: usize) -> Vec<GovernorateRow> {
        degrade(
            "governorate breakdown",
            self.store.query_governorate_breakdown(filter, limit),
        )
    }

    pub fn governorate_operator_matrix(&self, filter: &QueryFilter) -> Vec<GovernorateOperatorCell> {
        degrade(
            "governorate/operator matrix",
            self.store.query_governorate_operator_matrix(filter),
        )
    }

    pub fn weekly_trends(&self, filter: &QueryFilter, limit: usize) -> Vec<WeeklyTrend> {
        degrade(
            "weekly trends",
            self.store.query_weekly_trends(filter, limit),
        )
    }

    pub fn health_timeline(&self, filter: &QueryFilter) -> Vec<HealthPoint> {
        degrade("health timeline", self.store.query_health_timeline(filter))
    }

    pub fn category_by_operator(&self, filter: &QueryFilter) -> Vec<CategoryCount> {
        degrade(
            "category by operator",
            self.store.query_category_by_operator(filter),
        )
    }

    pub fn recent_complaints(&self, filter: &QueryFilter, limit: usize) -> Vec<RecentComplaint> {
        degrade(
            "recent complaints",
            self.store.query_recent_complaints(filter, limit),
        )
    }

    /// The selected operator's daily rows, date ordered. The operator comes
    /// from the argument; only the date range of `filter` applies.
    pub fn operator_deep_dive(&self, operator: &str, filter: &QueryFilter) -> Vec<DailyHealthRecord> {
        let rows = degrade(
            "operator deep dive",
            self.store.daily_health_for_operator(operator),
        );
        rows.into_iter()
            .filter(|r| filter.from.map_or(true, |from| r.date >= from))
            .filter(|r| filter.to.map_or(true, |to| r.date <= to))
            .collect()
    }

    pub fn available_operators(&self) -> Vec<String> {
        degrade(
            "available operators",
            self.store.query_available_operators(),
        )
    }

    pub fn date_bounds(&self) -> Option<DateBounds> {
        degrade("date bounds", self.store.query_date_bounds())
    }

    pub fn latest_run(&self) -> Option<RunRecord> {
        degrade("latest run", self.store.latest_run())
    }

    pub fn table_status(&self) -> Vec<TableStatus> {
        DATA_TABLES
            .iter()
            .map(|table| TableStatus {
                table: table.to_string(),
                rows: degrade("table status", self.store.table_row_count(table)),
            })
            .collect()
    }
}

/// Warn and continue with the default (empty) result.
fn degrade<T: Default>(label: &str, result: PulseResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            log::warn!("{label} query failed, returning empty result: {e}");
            T::default()
        }
    }
}
