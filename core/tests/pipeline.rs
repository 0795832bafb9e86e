//! End-to-end runs: event log, determinism, reloads, and CSV export.

use chrono::{NaiveDate, NaiveDateTime};
use telecom_pulse_core::{
    config::PulseConfig,
    complaint_generator::ComplaintRecord,
    csv_export::{
        self, BENCHMARKS_CSV, BENCHMARKS_HEADER, COMPLAINTS_CSV, COMPLAINTS_HEADER,
        DAILY_HEALTH_CSV, DAILY_HEALTH_HEADER,
    },
    event::PipelineEvent,
    pipeline::Pipeline,
    store::PulseStore,
};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 30)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("telecom-pulse-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

/// Each stage appends exactly one event, in execution order.
#[test]
fn run_records_stage_events_in_order() {
    let pipeline = Pipeline::build_test("events".into(), 42).unwrap();
    pipeline.run(120, now()).unwrap();
    let events = pipeline.events().unwrap();

    let types: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(
        types,
        vec![
            "run_initialized",
            "complaints_generated",
            "daily_health_computed",
            "benchmarks_computed",
            "tables_loaded",
        ]
    );
    match &events[4] {
        PipelineEvent::TablesLoaded { complaints, .. } => assert_eq!(*complaints, 120),
        other => panic!("unexpected last event {other:?}"),
    }
}

/// Two runs with the same seed produce identical tables.
#[test]
fn runs_are_reproducible() {
    let a = Pipeline::build_test("det-a".into(), 42).unwrap().run(300, now()).unwrap();
    let b = Pipeline::build_test("det-b".into(), 42).unwrap().run(300, now()).unwrap();
    assert_eq!(a.complaints, b.complaints);
    assert_eq!(a.daily_health, b.daily_health);
    assert_eq!(a.benchmarks, b.benchmarks);
}

/// Stored rows read back equal to what the run produced.
#[test]
fn loaded_tables_round_trip() {
    let pipeline = Pipeline::build_test("round-trip".into(), 17).unwrap();
    let output = pipeline.run(200, now()).unwrap();
    let store = pipeline.store();
    assert_eq!(store.all_complaints().unwrap(), output.complaints);
    assert_eq!(store.all_daily_health().unwrap(), output.daily_health);
    assert_eq!(store.all_benchmarks().unwrap(), output.benchmarks);
    assert_eq!(
        store.get_complaint(1).unwrap().as_ref(),
        output.complaints.first()
    );
    assert!(store.get_complaint(999).unwrap().is_none());
}

/// A second load replaces the previous contents instead of appending.
#[test]
fn reload_replaces_tables() {
    let first = Pipeline::build_test("reload-1".into(), 1).unwrap();
    first.run(300, now()).unwrap();
    let pipeline = Pipeline::new("reload-2".into(), 2, PulseConfig::builtin(), first.into_store());
    let second = pipeline.run(50, now()).unwrap();

    assert_eq!(second.loaded.complaints, 50);
    let store = pipeline.store();
    assert_eq!(store.table_row_count("customer_complaints").unwrap(), Some(50));
    assert_eq!(
        store.table_row_count("network_health_daily").unwrap(),
        Some(second.daily_health.len() as i64)
    );
}

/// A zero-count run loads empty tables and still succeeds.
#[test]
fn empty_run_loads_empty_tables() {
    let pipeline = Pipeline::build_test("empty".into(), 3).unwrap();
    let output = pipeline.run(0, now()).unwrap();
    assert!(output.complaints.is_empty());
    assert!(output.daily_health.is_empty());
    assert!(output.benchmarks.is_empty());
    assert_eq!(
        pipeline.store().table_row_count("operator_benchmarks").unwrap(),
        Some(0)
    );
}

/// The run is recorded and readable as the latest run.
#[test]
fn run_metadata_is_recorded() {
    let pipeline = Pipeline::build_test("meta".into(), 77).unwrap();
    pipeline.run(10, now()).unwrap();
    let run = pipeline.store().latest_run().unwrap().unwrap();
    assert_eq!(run.run_id, "meta");
    assert_eq!(run.seed, 77);
    assert_eq!(run.complaint_count, 10);
    assert_eq!(run.started_at, now());
}

/// Export writes three files with a header plus one line per row.
#[test]
fn csv_export_writes_three_tables() {
    let pipeline = Pipeline::build_test("csv".into(), 42).unwrap();
    let output = pipeline.run(80, now()).unwrap();
    let dir = scratch_dir("csv");

    let summary = pipeline.export(&output, &dir).unwrap();
    assert_eq!(summary.files.len(), 3);
    assert_eq!(
        summary.rows,
        output.complaints.len() + output.daily_health.len() + output.benchmarks.len()
    );

    let complaints = std::fs::read_to_string(dir.join(COMPLAINTS_CSV)).unwrap();
    let mut lines = complaints.lines();
    assert!(lines.next().unwrap().starts_with("complaint_id,operator,complaint_text"));
    assert!(dir.join(DAILY_HEALTH_CSV).exists());
    assert!(dir.join(BENCHMARKS_CSV).exists());

    let mut reader = csv::Reader::from_path(dir.join(BENCHMARKS_CSV)).unwrap();
    assert_eq!(reader.records().count(), output.benchmarks.len());

    let mut reader = csv::Reader::from_path(dir.join(COMPLAINTS_CSV)).unwrap();
    let read_back: Vec<ComplaintRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
    assert_eq!(read_back, output.complaints);

    assert!(matches!(
        pipeline.events().unwrap().last(),
        Some(PipelineEvent::CsvExported { files: 3, .. })
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

/// An empty run still exports each file with its header line.
#[test]
fn empty_export_writes_headers() {
    let pipeline = Pipeline::build_test("csv-empty".into(), 4).unwrap();
    let output = pipeline.run(0, now()).unwrap();
    let dir = scratch_dir("csv-empty");

    let summary = pipeline.export(&output, &dir).unwrap();
    assert_eq!(summary.rows, 0);
    for (file, header) in [
        (COMPLAINTS_CSV, COMPLAINTS_HEADER),
        (DAILY_HEALTH_CSV, DAILY_HEALTH_HEADER),
        (BENCHMARKS_CSV, BENCHMARKS_HEADER),
    ] {
        let content = std::fs::read_to_string(dir.join(file)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec![header.join(",")], "{file}");
    }

    let migrated = PulseStore::in_memory().unwrap();
    migrated.migrate().unwrap();
    let store_dir = scratch_dir("csv-empty-store");
    let summary = csv_export::export_store(&migrated, &store_dir).unwrap();
    assert_eq!(summary.files.len(), 3);
    let benchmarks = std::fs::read_to_string(store_dir.join(BENCHMARKS_CSV)).unwrap();
    assert_eq!(benchmarks.trim_end(), BENCHMARKS_HEADER.join(","));

    let _ = std::fs::remove_dir_all(&dir);
    let _ = std::fs::remove_dir_all(&store_dir);
}

/// Exporting from a store without tables skips them instead of failing.
#[test]
fn store_export_skips_missing_tables() {
    let store = PulseStore::in_memory().unwrap();
    let dir = scratch_dir("bare-export");
    let summary = csv_export::export_store(&store, &dir).unwrap();
    assert!(summary.files.is_empty());
    assert_eq!(summary.rows, 0);
    let _ = std::fs::remove_dir_all(&dir);
}

/// The event log survives on a file-backed store across handles.
#[test]
fn file_store_persists_across_handles() {
    let dir = scratch_dir("file-store");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("pulse.db");
    let path = path.to_str().unwrap();

    let store = PulseStore::open(path).unwrap();
    store.migrate().unwrap();
    let pipeline = Pipeline::new("file".into(), 9, PulseConfig::builtin(), store);
    pipeline.run(40, now()).unwrap();
    drop(pipeline);

    let reopened = PulseStore::open(path).unwrap();
    assert_eq!(reopened.table_row_count("customer_complaints").unwrap(), Some(40));
    assert_eq!(reopened.events_for_run("file").unwrap().len(), 5);
    let _ = std::fs::remove_dir_all(&dir);
}
