//! Markdown rendering of the analytics layer.
//!
//! The report mirrors the dashboard layout: KPIs, operator comparison,
//! health timeline, category mix, geography, weekly trends, recent
//! complaints, an optional operator deep dive, and a data status footer.
//! Every section prints a placeholder line when its query comes back empty.
//! Operators are keyed by their configured brand color.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::{
    analytics::{
        Analytics, HealthPoint, QueryFilter, DEFAULT_GOVERNORATE_LIMIT, DEFAULT_RECENT_LIMIT,
        DEFAULT_WEEKLY_LIMIT,
    },
    config::OperatorConfig,
};

fn fmt_opt(value: Option<f64>, digits: usize) -> String {
    value
        .map(|v| format!("{v:.digits$}"))
        .unwrap_or_else(|| "n/a".to_string())
}

fn color_of<'a>(operators: &'a [OperatorConfig], id: &str) -> &'a str {
    operators
        .iter()
        .find(|op| op.id == id)
        .map_or("-", |op| op.color.as_str())
}

/// Per-operator summary of the daily score series: days, first, latest,
/// low, high. Missing scores count as days but not as values.
struct TimelineSummary {
    days: usize,
    first: Option<f64>,
    latest: Option<f64>,
    low: Option<f64>,
    high: Option<f64>,
}

fn summarize_timeline(points: &[HealthPoint]) -> BTreeMap<&str, TimelineSummary> {
    let mut summaries: BTreeMap<&str, TimelineSummary> = BTreeMap::new();
    for point in points {
        let summary = summaries
            .entry(point.operator.as_str())
            .or_insert(TimelineSummary {
                days: 0,
                first: None,
                latest: None,
                low: None,
                high: None,
            });
        summary.days += 1;
        if let Some(score) = point.health_score {
            summary.first.get_or_insert(score);
            summary.latest = Some(score);
            summary.low = Some(summary.low.map_or(score, |low| low.min(score)));
            summary.high = Some(summary.high.map_or(score, |high| high.max(score)));
        }
    }
    summaries
}

fn filter_label(filter: &QueryFilter) -> String {
    let operator = filter.operator.as_deref().unwrap_or("all operators");
    match (filter.from, filter.to) {
        (None, None) => operator.to_string(),
        (from, to) => format!(
            "{operator}, {} to {}",
            from.map(|d| d.to_string()).unwrap_or_else(|| "start".into()),
            to.map(|d| d.to_string()).unwrap_or_else(|| "end".into()),
        ),
    }
}

pub fn render_report(
    analytics: &Analytics<'_>,
    filter: &QueryFilter,
    operators: &[OperatorConfig],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Egyptian Telecom Complaint Analytics");
    let _ = writeln!(output, "Generated for {}", filter_label(filter));
    if let Some(bounds) = analytics.date_bounds() {
        let _ = writeln!(output, "Data covers {} to {}", bounds.min, bounds.max);
    }
    let available = analytics.available_operators();
    if !available.is_empty() {
        let _ = writeln!(output, "Operators: {}", available.join(", "));
    }

    // ── Key performance indicators
    let kpis = analytics.kpis(filter);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Key Performance Indicators");
    let _ = writeln!(output, "- Total complaints: {}", kpis.total_complaints);
    let _ = writeln!(
        output,
        "- Average sentiment: {}",
        fmt_opt(kpis.avg_sentiment, 3)
    );
    match &kpis.best_performer {
        Some(best) => {
            let _ = writeln!(
                output,
                "- Best performer: {} ({})",
                best.operator,
                fmt_opt(best.health_score, 1)
            );
        }
        None => {
            let _ = writeln!(output, "- Best performer: N/A");
        }
    }
    let _ = writeln!(
        output,
        "- Most common issue: {}",
        kpis.most_common_issue.as_deref().unwrap_or("N/A")
    );

    // ── Operator ranking
    let ranking = analytics.operator_ranking(filter);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Operator Performance Ranking");
    if ranking.is_empty() {
        let _ = writeln!(output, "No benchmark data available.");
    } else {
        let _ = writeln!(
            output,
            "| Operator | Color | Health | Rating | Complaints | Top Category | Sentiment |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|");
        for row in &ranking {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} |",
                row.operator,
                color_of(operators, &row.operator),
                fmt_opt(row.health_score, 2),
                row.performance_rating,
                row.total_complaints,
                row.most_common_category,
                fmt_opt(row.avg_sentiment, 3),
            );
        }
    }

    // ── Health timeline
    let timeline = analytics.health_timeline(filter);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Network Health Timeline");
    if timeline.is_empty() {
        let _ = writeln!(output, "No network health data available.");
    } else {
        for (operator, summary) in summarize_timeline(&timeline) {
            let _ = writeln!(
                output,
                "- {} ({}): {} days, first {}, latest {}, low {}, high {}",
                operator,
                color_of(operators, operator),
                summary.days,
                fmt_opt(summary.first, 2),
                fmt_opt(summary.latest, 2),
                fmt_opt(summary.low, 2),
                fmt_opt(summary.high, 2),
            );
        }
    }

    // ── Category mix
    let categories = analytics.category_breakdown(filter);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Complaint Category Breakdown");
    if categories.is_empty() {
        let _ = writeln!(output, "No complaint category data available.");
    } else {
        for share in &categories {
            let _ = writeln!(
                output,
                "- {}: {} complaints ({:.2}%), avg sentiment {}",
                share.category,
                share.complaint_count,
                share.percentage,
                fmt_opt(share.avg_sentiment, 3),
            );
        }
    }

    let by_operator = analytics.category_by_operator(filter);
    if !by_operator.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "### Categories by Operator");
        for cell in &by_operator {
            let _ = writeln!(
                output,
                "- {} / {}: {}",
                cell.operator, cell.category, cell.count
            );
        }
    }

    // ── Geography
    let governorates = analytics.governorate_breakdown(filter, DEFAULT_GOVERNORATE_LIMIT);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Complaints by Governorate");
    if governorates.is_empty() {
        let _ = writeln!(output, "No geographic data available.");
    } else {
        for row in &governorates {
            let _ = writeln!(
                output,
                "- {}: {} complaints, avg sentiment {} ({})",
                row.governorate,
                row.complaint_count,
                fmt_opt(row.avg_sentiment, 3),
                row.sentiment_label.as_str(),
            );
        }
    }

    let matrix = analytics.governorate_operator_matrix(filter);
    if !matrix.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "### Governorate x Operator");
        for cell in &matrix {
            let _ = writeln!(
                output,
                "- {} / {}: {} complaints, avg sentiment {}",
                cell.governorate,
                cell.operator,
                cell.complaints,
                fmt_opt(cell.avg_sentiment, 3),
            );
        }
    }

    // ── Weekly trends
    let weekly = analytics.weekly_trends(filter, DEFAULT_WEEKLY_LIMIT);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Performance Trends");
    if weekly.is_empty() {
        let _ = writeln!(output, "No network health data available.");
    } else {
        for trend in &weekly {
            let _ = writeln!(
                output,
                "- week of {} / {} ({}): health {}, {} complaints",
                trend.week_start,
                trend.operator,
                color_of(operators, &trend.operator),
                fmt_opt(trend.weekly_health_score, 2),
                trend.weekly_complaints,
            );
        }
    }

    // ── Recent complaints
    let recent = analytics.recent_complaints(filter, DEFAULT_RECENT_LIMIT);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Customer Complaints");
    if recent.is_empty() {
        let _ = writeln!(output, "No recent complaints data available.");
    } else {
        for complaint in &recent {
            let _ = writeln!(
                output,
                "- {} [{}] {} ({}, {}): {} [{}]",
                complaint.date,
                complaint.operator,
                complaint.category,
                complaint.governorate,
                fmt_opt(complaint.sentiment_score, 3),
                complaint.complaint_text,
                complaint.tone.as_str(),
            );
        }
    }

    // ── Deep dive
    if let Some(operator) = filter.operator.as_deref() {
        let rows = analytics.operator_deep_dive(operator, filter);
        let _ = writeln!(output);
        let _ = writeln!(output, "## Deep Dive: {}", operator.to_uppercase());
        if rows.is_empty() {
            let _ = writeln!(output, "No detailed data available for {operator}.");
        } else {
            let _ = writeln!(
                output,
                "| Date | Complaints | Sentiment | Health | Dominant | 7d Trend |"
            );
            let _ = writeln!(output, "|---|---|---|---|---|---|");
            for row in &rows {
                let _ = writeln!(
                    output,
                    "| {} | {} | {:.3} | {:.2} | {} | {:.3} |",
                    row.date,
                    row.daily_complaints,
                    row.avg_sentiment,
                    row.network_health_score,
                    row.dominant_complaint_category,
                    row.complaint_trend_7d,
                );
            }
        }
    }

    // ── Data status
    let _ = writeln!(output);
    let _ = writeln!(output, "## Data Status");
    for status in analytics.table_status() {
        match status.rows {
            Some(rows) => {
                let _ = writeln!(output, "- {}: {} rows", status.table, rows);
            }
            None => {
                let _ = writeln!(output, "- {}: Not found", status.table);
            }
        }
    }
    if let Some(run) = analytics.latest_run() {
        let _ = writeln!(
            output,
            "- last run: {} (seed {}, {} complaints) at {}",
            run.run_id,
            run.seed,
            run.complaint_count,
            run.started_at.format("%Y-%m-%d %H:%M"),
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(operator: &str, day: u32, score: Option<f64>) -> HealthPoint {
        HealthPoint {
            operator: operator.into(),
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            health_score: score,
        }
    }

    #[test]
    fn timeline_summary_skips_missing_scores() {
        let points = vec![
            point("orange", 1, Some(70.0)),
            point("we", 1, Some(55.5)),
            point("orange", 2, None),
            point("orange", 3, Some(64.25)),
            point("orange", 4, Some(81.0)),
        ];
        let summaries = summarize_timeline(&points);
        let orange = &summaries["orange"];
        assert_eq!(orange.days, 4);
        assert_eq!(orange.first, Some(70.0));
        assert_eq!(orange.latest, Some(81.0));
        assert_eq!(orange.low, Some(64.25));
        assert_eq!(orange.high, Some(81.0));
        assert_eq!(summaries["we"].days, 1);
    }
}
