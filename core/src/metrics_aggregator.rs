//! Metrics aggregator: derives the daily health table and the operator
//! benchmark table from a complete complaint collection.
//!
//! Both operations are pure and deterministic:
//!   - groups are iterated in (operator, date) / operator order
//!   - category ties resolve to the lexicographically smallest category
//!   - every derived number is rounded to 3 fractional digits
//!
//! Empty input yields empty tables. There is no error path: the volume term's
//! denominator (max daily count) only exists when at least one group exists.

use crate::{
    complaint_generator::ComplaintRecord,
    types::round3,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;

/// Trailing window (in existing rows, not calendar days) for the complaint trend.
pub const TREND_WINDOW: usize = 7;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyHealthRecord {
    pub operator: String,
    pub date: NaiveDate,
    pub daily_complaints: i64,
    pub avg_sentiment: f64,
    pub avg_likes: f64,
    pub avg_replies: f64,
    pub network_health_score: f64,
    pub dominant_complaint_category: String,
    pub complaint_trend_7d: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorBenchmark {
    pub operator: String,
    pub total_complaints: i64,
    pub avg_sentiment: f64,
    pub avg_likes: f64,
    pub avg_replies: f64,
    pub network_health_score: f64,
    pub most_common_category: String,
    pub performance_rating: PerformanceRating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl PerformanceRating {
    /// Bands are inclusive on their lower bound.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Excellent
        } else if score >= 60.0 {
            Self::Good
        } else if score >= 40.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        }
    }
}

impl fmt::Display for PerformanceRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown performance rating '{0}'")]
pub struct UnknownRating(pub String);

impl FromStr for PerformanceRating {
    type Err = UnknownRating;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Excellent" => Ok(Self::Excellent),
            "Good" => Ok(Self::Good),
            "Fair" => Ok(Self::Fair),
            "Poor" => Ok(Self::Poor),
            other => Err(UnknownRating(other.to_string())),
        }
    }
}

// ── Scoring ──────────────────────────────────────────────────────────────────

/// Composite daily health score, clamped (not rescaled) to [0, 100].
///
/// `(100 - count / max_count * 50) + (sentiment + 1) * 25 + likes * 5`
///
/// The sentiment term spans 0..=50 and the engagement term is unbounded
/// until the clamp.
pub fn health_score(
    daily_complaints: i64,
    max_daily_complaints: i64,
    avg_sentiment: f64,
    avg_likes: f64,
) -> f64 {
    let volume_ratio = if max_daily_complaints > 0 {
        daily_complaints as f64 / max_daily_complaints as f64
    } else {
        0.0
    };
    let volume = 100.0 - volume_ratio * 50.0;
    let sentiment = (avg_sentiment + 1.0) * 25.0;
    let engagement = avg_likes * 5.0;
    (volume + sentiment + engagement).clamp(0.0, 100.0)
}

// ── Grouping ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct GroupAccumulator {
    count: i64,
    sentiment_sum: f64,
    likes_sum: f64,
    replies_sum: f64,
    categories: BTreeMap<String, i64>,
}

impl GroupAccumulator {
    fn add(&mut self, complaint: &ComplaintRecord) {
        self.count += 1;
        self.sentiment_sum += complaint.sentiment_score;
        self.likes_sum += complaint.likes as f64;
        self.replies_sum += complaint.replies as f64;
        *self
            .categories
            .entry(complaint.complaint_category.clone())
            .or_insert(0) += 1;
    }

    fn mean(&self, sum: f64) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            sum / self.count as f64
        }
    }

    fn avg_sentiment(&self) -> f64 {
        self.mean(self.sentiment_sum)
    }

    fn avg_likes(&self) -> f64 {
        self.mean(self.likes_sum)
    }

    fn avg_replies(&self) -> f64 {
        self.mean(self.replies_sum)
    }

    /// Highest-count category. BTreeMap iterates in ascending name order and
    /// only a strictly greater count replaces the leader, so ties go to the
    /// lexicographically smallest name.
    fn top_category(&self) -> String {
        let mut best: Option<(&String, i64)> = None;
        for (category, &count) in &self.categories {
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((category, count)),
            }
        }
        best.map(|(category, _)| category.clone()).unwrap_or_default()
    }
}

// ── Operations ───────────────────────────────────────────────────────────────

/// One row per (operator, date) that has at least one complaint, ordered by
/// operator then date.
pub fn compute_daily_health(complaints: &[ComplaintRecord]) -> Vec<DailyHealthRecord> {
    if complaints.is_empty() {
        log::warn!("daily health: empty complaint collection, producing empty table");
        return Vec::new();
    }

    let mut groups: BTreeMap<(&str, NaiveDate), GroupAccumulator> = BTreeMap::new();
    for complaint in complaints {
        groups
            .entry((complaint.operator.as_str(), complaint.date))
            .or_default()
            .add(complaint);
    }

    let max_daily_complaints = groups.values().map(|g| g.count).max().unwrap_or(0);

    let mut rows = Vec::with_capacity(groups.len());
    let mut window: VecDeque<i64> = VecDeque::with_capacity(TREND_WINDOW);
    let mut current_operator: Option<&str> = None;

    for ((operator, date), group) in &groups {
        if current_operator != Some(*operator) {
            window.clear();
            current_operator = Some(*operator);
        }
        window.push_back(group.count);
        if window.len() > TREND_WINDOW {
            window.pop_front();
        }
        let trend = window.iter().sum::<i64>() as f64 / window.len() as f64;

        let avg_sentiment = group.avg_sentiment();
        let avg_likes = group.avg_likes();
        let score = health_score(group.count, max_daily_complaints, avg_sentiment, avg_likes);

        rows.push(DailyHealthRecord {
            operator: operator.to_string(),
            date: *date,
            daily_complaints: group.count,
            avg_sentiment: round3(avg_sentiment),
            avg_likes: round3(avg_likes),
            avg_replies: round3(group.avg_replies()),
            network_health_score: round3(score),
            dominant_complaint_category: group.top_category(),
            complaint_trend_7d: round3(trend),
        });
    }

    log::info!(
        "daily health: {} rows from {} complaints (max daily count {})",
        rows.len(),
        complaints.len(),
        max_daily_complaints,
    );
    rows
}

/// One row per operator present in `complaints`, ordered by operator.
///
/// The mean health score is taken over the operator's rows in `daily_health`.
/// An operator with no daily rows is skipped with a warning; with a
/// `daily_health` table produced from the same complaints this never happens.
pub fn compute_operator_benchmarks(
    complaints: &[ComplaintRecord],
    daily_health: &[DailyHealthRecord],
) -> Vec<OperatorBenchmark> {
    if complaints.is_empty() {
        log::warn!("benchmarks: empty complaint collection, producing empty table");
        return Vec::new();
    }

    let mut groups: BTreeMap<&str, GroupAccumulator> = BTreeMap::new();
    for complaint in complaints {
        groups
            .entry(complaint.operator.as_str())
            .or_default()
            .add(complaint);
    }

    let mut health: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for row in daily_health {
        let entry = health.entry(row.operator.as_str()).or_insert((0.0, 0));
        entry.0 += row.network_health_score;
        entry.1 += 1;
    }

    let mut benchmarks = Vec::with_capacity(groups.len());
    for (operator, group) in &groups {
        let Some(&(score_sum, days)) = health.get(operator) else {
            log::warn!("benchmarks: operator '{operator}' has no daily health rows, skipping");
            continue;
        };
        // Rate the exact mean; only the stored score is rounded.
        let mean_score = score_sum / days as f64;

        benchmarks.push(OperatorBenchmark {
            operator: operator.to_string(),
            total_complaints: group.count,
            avg_sentiment: round3(group.avg_sentiment()),
            avg_likes: round3(group.avg_likes()),
            avg_replies: round3(group.avg_replies()),
            network_health_score: round3(mean_score),
            most_common_category: group.top_category(),
            performance_rating: PerformanceRating::from_score(mean_score),
        });
    }

    log::info!("benchmarks: {} operators rated", benchmarks.len());
    benchmarks
}
