//! End-to-end run tests over the in-memory store and sink
//!
//! These exercise the full controller pipeline: window planning, cursor
//! draining, batching, serialization, emission, and the commit/rollback
//! boundary, including the best-effort contract that a run commits even
//! when individual windows fail.

use bson::doc;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use sluice_engine::{
    IncrementalConfig, JsonFlavor, MemorySink, MemoryStore, OutputFormat, RunConfig, RunController,
};

fn day(d: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
}

/// One record per day of January 2024, stamped at noon
fn daily_records(days: std::ops::Range<u32>) -> Vec<bson::Document> {
    days.map(|d| {
        doc! {
            "day": d as i32,
            "updated_at": bson::DateTime::from_chrono(
                Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap()
            ),
        }
    })
    .collect()
}

fn incremental_config(output: OutputFormat) -> RunConfig {
    RunConfig {
        source_uri: "memory://cdp.users".to_string(),
        results_per_unit: Some(99999),
        json_flavor: JsonFlavor::Normalized,
        incremental: Some(IncrementalConfig {
            range_field: "updated_at".to_string(),
            range_days: 1,
            from_date: Some("2024-01-01T00:00:00.000Z".to_string()),
            to_date: Some("2024-01-03T00:00:00.000Z".to_string()),
            output,
        }),
        ..RunConfig::default()
    }
}

#[test]
fn incremental_run_emits_one_unit_per_window() {
    let store = MemoryStore::new(daily_records(1..4));
    let mut sink = MemorySink::new();

    let report = RunController::new(incremental_config(OutputFormat::Json))
        .unwrap()
        .run(&store, &mut sink)
        .unwrap();

    assert_eq!(report.windows_planned, 3);
    assert_eq!(report.windows_processed, 3);
    assert_eq!(report.windows_failed, 0);
    assert_eq!(report.records_read, 3);
    assert_eq!(report.units_emitted, 3);
    assert_eq!(sink.commit_count, 1);
    assert_eq!(sink.committed().len(), 3);

    // Units arrive in window order, each holding its day's record.
    for (index, unit) in sink.committed().iter().enumerate() {
        let payload: Value = serde_json::from_slice(&unit.payload).unwrap();
        assert_eq!(payload[0]["day"], (index + 1) as i64);
        assert_eq!(
            unit.attributes.get("filename").unwrap(),
            &day(index as u32 + 1).format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
        );
    }
}

#[test]
fn empty_windows_emit_nothing_but_the_run_commits() {
    // Only day 2 has a record; days 1 and 3 produce empty payloads that are
    // dropped rather than emitted.
    let store = MemoryStore::new(daily_records(2..3));
    let mut sink = MemorySink::new();

    let report = RunController::new(incremental_config(OutputFormat::Json))
        .unwrap()
        .run(&store, &mut sink)
        .unwrap();

    assert_eq!(report.windows_processed, 3);
    assert_eq!(report.units_emitted, 1);
    assert_eq!(sink.commit_count, 1);
}

#[test]
fn failing_window_is_skipped_and_siblings_still_emit() {
    let store = MemoryStore::new(daily_records(1..4))
        .failing_window_containing(Utc.with_ymd_and_hms(2024, 1, 2, 6, 0, 0).unwrap());
    let mut sink = MemorySink::new();

    let report = RunController::new(incremental_config(OutputFormat::Json))
        .unwrap()
        .run(&store, &mut sink)
        .unwrap();

    assert_eq!(report.windows_processed, 2);
    assert_eq!(report.windows_failed, 1);
    assert_eq!(report.units_emitted, 2);
    // Best-effort: the run still commits with the surviving windows.
    assert_eq!(sink.commit_count, 1);
    assert_eq!(sink.rollback_count, 0);

    let days: Vec<i64> = sink
        .committed()
        .iter()
        .map(|u| serde_json::from_slice::<Value>(&u.payload).unwrap()[0]["day"].as_i64().unwrap())
        .collect();
    assert_eq!(days, vec![1, 3]);
}

#[test]
fn chunked_run_preserves_order_with_short_final_batch() {
    let records: Vec<bson::Document> = (0..5).map(|i| doc! {"i": i as i64}).collect();
    let store = MemoryStore::new(records);
    let mut sink = MemorySink::new();

    let config = RunConfig {
        source_uri: "memory://chunks".to_string(),
        results_per_unit: Some(2),
        json_flavor: JsonFlavor::Normalized,
        ..RunConfig::default()
    };
    let report = RunController::new(config).unwrap().run(&store, &mut sink).unwrap();

    assert_eq!(report.units_emitted, 3);
    assert_eq!(report.records_read, 5);

    let sizes: Vec<usize> = sink
        .committed()
        .iter()
        .map(|u| {
            serde_json::from_slice::<Value>(&u.payload)
                .unwrap()
                .as_array()
                .unwrap()
                .len()
        })
        .collect();
    assert_eq!(sizes, vec![2, 2, 1]);

    let flat: Vec<i64> = sink
        .committed()
        .iter()
        .flat_map(|u| {
            serde_json::from_slice::<Value>(&u.payload)
                .unwrap()
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v["i"].as_i64().unwrap())
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(flat, vec![0, 1, 2, 3, 4]);
}

#[test]
fn mid_iteration_cursor_failure_keeps_emitted_chunks() {
    let records: Vec<bson::Document> = (0..6).map(|i| doc! {"i": i as i64}).collect();
    let store = MemoryStore::new(records).failing_pull_after(3);
    let mut sink = MemorySink::new();

    let config = RunConfig {
        source_uri: "memory://partial".to_string(),
        results_per_unit: Some(2),
        ..RunConfig::default()
    };
    let report = RunController::new(config).unwrap().run(&store, &mut sink).unwrap();

    // The first chunk emitted before the cursor died; the window is marked
    // failed but the run commits and the emitted unit stands.
    assert_eq!(report.windows_failed, 1);
    assert_eq!(report.units_emitted, 1);
    assert_eq!(sink.commit_count, 1);
    assert_eq!(sink.committed().len(), 1);
}

#[test]
fn per_record_run_emits_each_record_with_address_attribute() {
    let store = MemoryStore::new(vec![
        doc! {"name": "a", "address": "12 Ba Trieu, Hanoi"},
        doc! {"name": "b"},
    ]);
    let mut sink = MemorySink::new();

    let config = RunConfig {
        source_uri: "memory://records".to_string(),
        ..RunConfig::default()
    };
    let report = RunController::new(config).unwrap().run(&store, &mut sink).unwrap();

    assert_eq!(report.units_emitted, 2);
    let units = sink.committed();
    assert_eq!(
        units[0].attributes.get("address").unwrap(),
        "12 Ba Trieu, Hanoi"
    );
    assert!(units[1].attributes.get("address").is_none());
}

#[test]
fn csv_run_produces_header_plus_row_per_record() {
    let store = MemoryStore::new(daily_records(1..2));
    let mut sink = MemorySink::new();

    let report = RunController::new(incremental_config(OutputFormat::Csv))
        .unwrap()
        .run(&store, &mut sink)
        .unwrap();

    assert_eq!(report.units_emitted, 1);
    let unit = &sink.committed()[0];
    assert_eq!(unit.attributes.get("mime.type").unwrap(), "text/csv");

    let text = String::from_utf8(unit.payload.clone()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "day,updated_at");
    assert!(lines[1].contains("2024-01-01T12:00:00.000Z"));
}

#[test]
fn malformed_filter_rejects_the_run_before_it_starts() {
    let config = RunConfig {
        source_uri: "memory://bad".to_string(),
        filter: Some("{broken".to_string()),
        ..RunConfig::default()
    };
    assert!(RunController::new(config).is_err());
}

#[test]
fn non_incremental_run_uses_a_single_implicit_window() {
    let store = MemoryStore::new(daily_records(1..4));
    let mut sink = MemorySink::new();

    let config = RunConfig {
        source_uri: "memory://single".to_string(),
        results_per_unit: Some(99999),
        json_flavor: JsonFlavor::Normalized,
        ..RunConfig::default()
    };
    let report = RunController::new(config).unwrap().run(&store, &mut sink).unwrap();

    assert_eq!(report.windows_planned, 1);
    assert_eq!(report.units_emitted, 1);
    let payload: Value = serde_json::from_slice(&sink.committed()[0].payload).unwrap();
    assert_eq!(payload.as_array().unwrap().len(), 3);
    // No window, no filename attribute.
    assert!(sink.committed()[0].attributes.get("filename").is_none());
}

#[test]
fn store_refusing_every_find_still_commits_an_empty_run() {
    // Failures inside the (implicit) window are transient by contract; only
    // conditions outside the loop roll a run back.
    let store = MemoryStore::new(daily_records(1..2)).failing_all_finds();
    let mut sink = MemorySink::new();

    let config = RunConfig {
        source_uri: "memory://refused".to_string(),
        ..RunConfig::default()
    };
    let report = RunController::new(config).unwrap().run(&store, &mut sink).unwrap();

    assert_eq!(report.windows_failed, 1);
    assert_eq!(report.units_emitted, 0);
    assert_eq!(sink.commit_count, 1);
}
