//! Query layer over a loaded store, plus degradation on a bare one.

use chrono::{Days, NaiveDate, NaiveDateTime};
use telecom_pulse_core::{
    analytics::{Analytics, QueryFilter, SentimentLabel},
    config::PulseConfig,
    pipeline::{Pipeline, PipelineOutput},
    report::render_report,
    store::{PulseStore, DATA_TABLES},
    types::UNKNOWN_LOCATION,
};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 30)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn loaded(run_id: &str, seed: u64) -> (Pipeline, PipelineOutput) {
    let pipeline = Pipeline::build_test(run_id.into(), seed).unwrap();
    let output = pipeline.run(600, now()).unwrap();
    (pipeline, output)
}

/// A store with no tables answers every query with an empty result.
#[test]
fn queries_degrade_on_unmigrated_store() {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = PulseStore::in_memory().unwrap();
    let analytics = Analytics::new(&store);
    let filter = QueryFilter::all();

    assert_eq!(analytics.kpis(&filter).total_complaints, 0);
    assert!(analytics.kpis(&filter).best_performer.is_none());
    assert!(analytics.operator_ranking(&filter).is_empty());
    assert!(analytics.category_breakdown(&filter).is_empty());
    assert!(analytics.governorate_breakdown(&filter, 10).is_empty());
    assert!(analytics.governorate_operator_matrix(&filter).is_empty());
    assert!(analytics.weekly_trends(&filter, 12).is_empty());
    assert!(analytics.health_timeline(&filter).is_empty());
    assert!(analytics.category_by_operator(&filter).is_empty());
    assert!(analytics.recent_complaints(&filter, 15).is_empty());
    assert!(analytics.operator_deep_dive("vodafone", &filter).is_empty());
    assert!(analytics.available_operators().is_empty());
    assert!(analytics.date_bounds().is_none());
    assert!(analytics.latest_run().is_none());
    for status in analytics.table_status() {
        assert_eq!(status.rows, None, "{} should be missing", status.table);
    }
}

/// Migrated but empty: tables exist with zero rows.
#[test]
fn table_status_counts_rows() {
    let store = PulseStore::in_memory().unwrap();
    store.migrate().unwrap();
    let status = Analytics::new(&store).table_status();
    assert_eq!(status.len(), DATA_TABLES.len());
    assert!(status.iter().all(|s| s.rows == Some(0)));

    let (pipeline, output) = loaded("status-loaded", 8);
    let status = Analytics::new(pipeline.store()).table_status();
    assert_eq!(status[0].rows, Some(output.complaints.len() as i64));
    assert_eq!(status[1].rows, Some(output.daily_health.len() as i64));
    assert_eq!(status[2].rows, Some(output.benchmarks.len() as i64));
}

#[test]
fn kpis_match_loaded_data() {
    let (pipeline, output) = loaded("kpis", 42);
    let kpis = Analytics::new(pipeline.store()).kpis(&QueryFilter::all());
    assert_eq!(kpis.total_complaints, 600);

    let mean = output.complaints.iter().map(|c| c.sentiment_score).sum::<f64>() / 600.0;
    assert!((kpis.avg_sentiment.unwrap() - mean).abs() < 0.001);

    let best = kpis.best_performer.unwrap();
    let top = output
        .benchmarks
        .iter()
        .map(|b| b.network_health_score)
        .fold(f64::MIN, f64::max);
    assert!((best.health_score.unwrap() - top).abs() < 0.001);
    assert!(kpis.most_common_issue.is_some());
}

/// Ranking is sorted by health score, highest first.
#[test]
fn ranking_is_sorted_by_health() {
    let (pipeline, _) = loaded("ranking", 42);
    let ranking = Analytics::new(pipeline.store()).operator_ranking(&QueryFilter::all());
    assert_eq!(ranking.len(), 4);
    for pair in ranking.windows(2) {
        assert!(pair[0].health_score >= pair[1].health_score);
    }

    let only = Analytics::new(pipeline.store())
        .operator_ranking(&QueryFilter::all().with_operator("orange"));
    assert_eq!(only.len(), 1);
    assert_eq!(only[0].operator, "orange");
}

/// Category percentages sum to 100 (within rounding) and counts to the total.
#[test]
fn category_breakdown_partitions_complaints() {
    let (pipeline, _) = loaded("categories", 42);
    let shares = Analytics::new(pipeline.store()).category_breakdown(&QueryFilter::all());
    let count: i64 = shares.iter().map(|s| s.complaint_count).sum();
    let pct: f64 = shares.iter().map(|s| s.percentage).sum();
    assert_eq!(count, 600);
    assert!((pct - 100.0).abs() < 0.1);
    for pair in shares.windows(2) {
        assert!(pair[0].complaint_count >= pair[1].complaint_count);
    }
}

/// The Unknown sentinel never appears as a governorate; the limit holds.
#[test]
fn governorate_breakdown_excludes_unknown() {
    let (pipeline, _) = loaded("governorates", 42);
    let analytics = Analytics::new(pipeline.store());
    let rows = analytics.governorate_breakdown(&QueryFilter::all(), 10);
    assert!(!rows.is_empty() && rows.len() <= 10);
    for row in &rows {
        assert_ne!(row.governorate, UNKNOWN_LOCATION);
        assert_eq!(row.sentiment_label, SentimentLabel::from_average(row.avg_sentiment));
    }
    assert!(analytics
        .governorate_operator_matrix(&QueryFilter::all())
        .iter()
        .all(|c| c.governorate != UNKNOWN_LOCATION));
}

/// Operator and date filters narrow every complaint query.
#[test]
fn filters_apply_to_complaint_queries() {
    let (pipeline, output) = loaded("filters", 42);
    let analytics = Analytics::new(pipeline.store());
    let to = now().date();
    let from = to.checked_sub_days(Days::new(13)).unwrap();
    let filter = QueryFilter::all()
        .with_operator("vodafone")
        .between(Some(from), Some(to));

    let expected = output
        .complaints
        .iter()
        .filter(|c| c.operator == "vodafone" && c.date >= from && c.date <= to)
        .count() as i64;
    assert_eq!(analytics.kpis(&filter).total_complaints, expected);

    for complaint in analytics.recent_complaints(&filter, 15) {
        assert_eq!(complaint.operator, "vodafone");
        assert!(complaint.date >= from && complaint.date <= to);
    }
    for point in analytics.health_timeline(&filter) {
        assert_eq!(point.operator, "vodafone");
        assert!(point.date >= from);
    }
    for cell in analytics.category_by_operator(&filter) {
        assert_eq!(cell.operator, "vodafone");
    }
}

/// Recent complaints come newest first and respect the limit.
#[test]
fn recent_complaints_newest_first() {
    let (pipeline, _) = loaded("recent", 42);
    let recent = Analytics::new(pipeline.store()).recent_complaints(&QueryFilter::all(), 15);
    assert_eq!(recent.len(), 15);
    for pair in recent.windows(2) {
        assert!(pair[0].date >= pair[1].date);
    }
}

/// Weekly buckets start on Monday and sum the daily counts.
#[test]
fn weekly_trends_bucket_by_monday() {
    use chrono::{Datelike, Weekday};

    let (pipeline, output) = loaded("weekly", 42);
    let trends = Analytics::new(pipeline.store()).weekly_trends(&QueryFilter::all(), 12);
    assert_eq!(trends.len(), 12);
    for trend in &trends {
        assert_eq!(trend.week_start.weekday(), Weekday::Mon);
        let end = trend.week_start.checked_add_days(Days::new(6)).unwrap();
        let expected: i64 = output
            .daily_health
            .iter()
            .filter(|r| r.operator == trend.operator && r.date >= trend.week_start && r.date <= end)
            .map(|r| r.daily_complaints)
            .sum();
        assert_eq!(trend.weekly_complaints, expected);
    }
    for pair in trends.windows(2) {
        assert!(pair[0].week_start >= pair[1].week_start);
    }
}

/// The deep dive returns the operator's daily rows in date order.
#[test]
fn deep_dive_returns_operator_rows() {
    let (pipeline, output) = loaded("deep-dive", 42);
    let rows = Analytics::new(pipeline.store()).operator_deep_dive("we", &QueryFilter::all());
    let expected: Vec<_> = output
        .daily_health
        .iter()
        .filter(|r| r.operator == "we")
        .cloned()
        .collect();
    assert_eq!(rows, expected);
}

#[test]
fn filter_domains_reflect_loaded_data() {
    let (pipeline, output) = loaded("domains", 42);
    let analytics = Analytics::new(pipeline.store());
    assert_eq!(
        analytics.available_operators(),
        vec!["etisalat", "orange", "vodafone", "we"]
    );
    let bounds = analytics.date_bounds().unwrap();
    assert_eq!(bounds.min, output.complaints.iter().map(|c| c.date).min().unwrap());
    assert_eq!(bounds.max, output.complaints.iter().map(|c| c.date).max().unwrap());
    assert_eq!(analytics.latest_run().unwrap().run_id, "domains");
}

/// Every report section renders, with placeholders on an empty store.
#[test]
fn report_renders_sections() {
    let (pipeline, _) = loaded("report", 42);
    let filter = QueryFilter::all().with_operator("orange");
    let operators = PulseConfig::builtin().operators;
    let report = render_report(&Analytics::new(pipeline.store()), &filter, &operators);
    for heading in [
        "## Key Performance Indicators",
        "## Operator Performance Ranking",
        "## Network Health Timeline",
        "## Complaint Category Breakdown",
        "## Complaints by Governorate",
        "## Weekly Performance Trends",
        "## Recent Customer Complaints",
        "## Deep Dive: ORANGE",
        "## Data Status",
    ] {
        assert!(report.contains(heading), "missing {heading}");
    }
    assert!(report.contains("| orange | #FF6600 |"));
    assert!(report.contains("- orange (#FF6600): "));

    let empty = PulseStore::in_memory().unwrap();
    let report = render_report(&Analytics::new(&empty), &QueryFilter::all(), &operators);
    assert!(report.contains("No benchmark data available."));
    assert!(report.contains("customer_complaints: Not found"));
}
