//! Integration tests for acisfp CLI commands.
//!
//! Uses tempfile for the commanded-state and catalog input files.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use acisfp::AppError;
use acisfp::cli::{
    build_source, cmd_classify, cmd_focal_plane, cmd_intervals, load_catalog_file, load_states,
    render_buckets, render_intervals, run,
};
use acisfp::config::Cli;
use acisfp_core::{
    CatalogAttributes, CatalogSource, Instrument, Obsid, ObsidInterval, OfflineCatalog,
    StaticCatalog, ThermalBuckets,
};
use clap::Parser;
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary directory for tests.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// One commanded-state record as JSON.
fn state(obsid: u32, power_cmd: &str, simpos: i64, t: u32) -> String {
    format!(
        r#"{{"obsid": {obsid}, "power_cmd": "{power_cmd}", "simpos": {simpos},
            "datestart": "2024:001:00:00:{t:02}", "datestop": "2024:001:00:00:{t:02}",
            "tstart": {t}.0, "tstop": {t}.0}}"#
    )
}

/// Three records that make one complete interval.
fn observation(obsid: u32, simpos: i64, t: u32) -> Vec<String> {
    vec![
        state(obsid, "WSPOW00000", simpos, t),
        state(obsid, "XTZ0000005", simpos, t + 1),
        state(obsid, "AA00000000", simpos, t + 2),
    ]
}

fn write_states(dir: &TempDir, records: &[String]) -> PathBuf {
    let path = dir.path().join("states.json");
    std::fs::write(&path, format!("[{}]", records.join(",\n"))).unwrap();
    path
}

/// ACIS-S, ACIS-I, a maneuver record, HRC-S ECS, HRC-I science.
fn create_states_json(dir: &TempDir) -> PathBuf {
    let mut records = Vec::new();
    records.extend(observation(100, 75_000, 0));
    records.extend(observation(200, 92_000, 10));
    records.push(state(40_000, "WSPOW00000", 75_000, 15));
    records.extend(observation(62_000, -99_616, 20));
    records.extend(observation(300, -50_000, 30));
    write_states(dir, &records)
}

/// Catalog file marking obsid 100 as a grating observation.
fn create_catalog_json(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("catalog.json");
    let content = r#"[
        {"obsid": 100, "grating": "HETG", "ccd_count": 6, "S3": "Y", "num_counts": 12000.0},
        {"obsid": 200, "grating": "NONE", "ccd_count": 4, "S3": "N", "num_counts": 9000.0}
    ]"#;
    std::fs::write(&path, content).unwrap();
    path
}

fn parse_json_intervals(text: &str) -> Vec<ObsidInterval> {
    serde_json::from_str(text).unwrap()
}

// =============================================================================
// INPUT TESTS
// =============================================================================

#[test]
fn test_load_states_reads_all_records() {
    let temp = create_temp_dir();
    let path = create_states_json(&temp);

    let states = load_states(&path).unwrap();
    assert_eq!(states.len(), 13);
    assert_eq!(states[9].obsid, Obsid(62_000));
}

#[test]
fn test_load_states_missing_file() {
    let temp = create_temp_dir();
    let result = load_states(&temp.path().join("missing.json"));
    assert!(matches!(result, Err(AppError::Io { .. })));
}

#[test]
fn test_load_states_invalid_json() {
    let temp = create_temp_dir();
    let path = temp.path().join("bad.json");
    std::fs::write(&path, r#"[{"obsid": "x"}]"#).unwrap();

    let result = load_states(&path);
    assert!(matches!(result, Err(AppError::Json { .. })));
}

#[test]
fn test_load_catalog_file() {
    let temp = create_temp_dir();
    let path = create_catalog_json(&temp);

    let catalog = load_catalog_file(&path).unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.get(Obsid(100)).unwrap().grating, "HETG");
    assert_eq!(catalog.get(Obsid(200)).unwrap().s3, "N");
}

// =============================================================================
// FOCAL PLANE COMMAND TESTS
// =============================================================================

#[test]
fn test_focal_plane_text() {
    assert_eq!(cmd_focal_plane(80_655, false).unwrap(), "ACIS-S\n");
    assert_eq!(cmd_focal_plane(92_904, false).unwrap(), "ACIS-I\n");
    assert_eq!(cmd_focal_plane(0, false).unwrap(), "launchlock\n");
}

#[test]
fn test_focal_plane_json() {
    let output = cmd_focal_plane(-99_616, true).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["simpos"], -99_616);
    assert_eq!(value["instrument"], "HRC-S");
}

// =============================================================================
// INTERVALS COMMAND TESTS
// =============================================================================

#[test]
fn test_intervals_offline() {
    let temp = create_temp_dir();
    let path = create_states_json(&temp);

    let output = cmd_intervals(&path, &OfflineCatalog, true).unwrap();
    let intervals = parse_json_intervals(&output);

    let obsids: Vec<u32> = intervals.iter().map(|i| i.obsid.0).collect();
    assert_eq!(obsids, vec![100, 200, 62_000, 300]);
    assert!(intervals.iter().all(|i| !i.is_enriched()));
    assert_eq!(intervals[0].instrument, Instrument::AcisS);
    assert_eq!(intervals[0].start_science, 1.0);
    assert_eq!(intervals[0].datestop, "2024:001:00:00:02");
}

#[test]
fn test_intervals_with_catalog_file() {
    let temp = create_temp_dir();
    let states = create_states_json(&temp);
    let catalog = StaticCatalog::new(load_catalog_file(&create_catalog_json(&temp)).unwrap());

    let output = cmd_intervals(&states, &catalog, true).unwrap();
    let intervals = parse_json_intervals(&output);

    let enriched: Vec<u32> = intervals
        .iter()
        .filter(|i| i.is_enriched())
        .map(|i| i.obsid.0)
        .collect();
    assert_eq!(enriched, vec![100, 200]);
}

#[test]
fn test_intervals_text_has_one_line_per_interval() {
    let temp = create_temp_dir();
    let path = create_states_json(&temp);

    let output = cmd_intervals(&path, &OfflineCatalog, false).unwrap();
    assert_eq!(output.lines().count(), 4);
    assert!(output.lines().next().unwrap().contains("ACIS-S"));
}

#[test]
fn test_intervals_drops_unterminated_tail() {
    let temp = create_temp_dir();
    let mut records = observation(100, 75_000, 0);
    records.push(state(101, "WSPOW00000", 75_000, 5));
    records.push(state(101, "XTZ0000005", 75_000, 6));
    let path = write_states(&temp, &records);

    let output = cmd_intervals(&path, &OfflineCatalog, true).unwrap();
    assert_eq!(parse_json_intervals(&output).len(), 1);
}

// =============================================================================
// CLASSIFY COMMAND TESTS
// =============================================================================

#[test]
fn test_classify_with_catalog_file() {
    let temp = create_temp_dir();
    let states = create_states_json(&temp);
    let catalog = StaticCatalog::new(load_catalog_file(&create_catalog_json(&temp)).unwrap());

    let output = cmd_classify(&states, &catalog, true).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();

    assert_eq!(value["acis_hot"][0]["obsid"], 100);
    assert_eq!(value["acis_i"][0]["obsid"], 200);
    assert_eq!(value["acis_s"].as_array().unwrap().len(), 0);
    assert_eq!(value["cold_ecs"][0]["obsid"], 62_000);
}

#[test]
fn test_classify_offline_nothing_is_hot() {
    let temp = create_temp_dir();
    let states = create_states_json(&temp);

    let output = cmd_classify(&states, &OfflineCatalog, false).unwrap();
    assert!(output.contains("acis_i (1)"));
    assert!(output.contains("acis_s (1)"));
    assert!(output.contains("acis_hot (0)"));
    assert!(output.contains("cold_ecs (1)"));
}

#[test]
fn test_classify_unclassifiable_exits_with_2() {
    let temp = create_temp_dir();
    // HRC-I engineering observation: survives the HRC filter, fits no bucket.
    let path = write_states(&temp, &observation(61_000, -50_000, 0));

    let err = cmd_classify(&path, &OfflineCatalog, false).unwrap_err();
    assert!(matches!(err, AppError::Classification(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_render_intervals_lines() {
    let plain = ObsidInterval {
        obsid: Obsid(62_000),
        datestart: "d0".to_string(),
        datestop: "d1".to_string(),
        tstart: 0.0,
        tstop: 1.0,
        start_science: 0.5,
        instrument: Instrument::HrcS,
        catalog: None,
    };
    let enriched = ObsidInterval {
        obsid: Obsid(100),
        instrument: Instrument::AcisS,
        catalog: Some(CatalogAttributes {
            grating: "HETG".to_string(),
            ccd_count: 6,
            s3: "Y".to_string(),
            num_counts: 12_000.0,
        }),
        ..plain.clone()
    };

    let output = render_intervals(&[plain, enriched]);
    assert_eq!(
        output,
        " 62000  d0  d1  HRC-S  \n   100  d0  d1  ACIS-S   grating=HETG ccds=6 S3=Y counts=12000\n"
    );
}

#[test]
fn test_render_empty_buckets() {
    let output = render_buckets(&ThermalBuckets::new());
    assert_eq!(output, "acis_i (0)\nacis_s (0)\nacis_hot (0)\ncold_ecs (0)\n");
}

// =============================================================================
// DISPATCH TESTS
// =============================================================================

#[test]
fn test_run_offline_classify() {
    let temp = create_temp_dir();
    let states = create_states_json(&temp);

    let cli = Cli::try_parse_from([
        "acisfp",
        "--offline",
        "--json",
        "classify",
        states.to_str().unwrap(),
    ])
    .unwrap();
    let output = run(&cli).unwrap();
    let buckets: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(buckets["acis_s"][0]["obsid"], 100);
}

#[test]
fn test_run_with_missing_catalog_file_fails() {
    let temp = create_temp_dir();
    let states = create_states_json(&temp);
    let missing = temp.path().join("missing.json");

    let cli = Cli::try_parse_from([
        "acisfp",
        "--catalog",
        missing.to_str().unwrap(),
        "intervals",
        states.to_str().unwrap(),
    ])
    .unwrap();
    let err = run(&cli).unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_build_source_offline_reports_offline() {
    let cli = Cli::try_parse_from(["acisfp", "--offline", "focal-plane", "0"]).unwrap();
    let source = build_source(&cli.catalog).unwrap();
    assert!(source.fetch_catalog(&[Obsid(1)]).is_err());
}
