//! CLI Round Trip Tests
//!
//! Drives the `query` and `explain` commands through files on disk:
//! - Workflows compiled in-process run identically when read back from JSON
//! - Config files change engine behaviour
//! - Bad inputs map to stable error codes

use std::fs;
use std::path::PathBuf;

use chartflow::cli::{explain, query, CliErrorCode};
use chartflow::schema::{Aggregation, Field, SemanticType};
use chartflow::workflow::{SortOrder, WorkflowBuilder};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn write(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, value.to_string()).unwrap();
    path
}

fn rows() -> Value {
    json!([
        {"day_of_week": "Sat", "hour": "09", "temp": 10.0, "activity_count": 5},
        {"day_of_week": "Sat", "hour": "10", "temp": 20.0, "activity_count": 15},
        {"day_of_week": "Sun", "hour": "09", "temp": 30.0, "activity_count": 12},
        {"day_of_week": "Sun", "hour": "11", "temp": 40.0, "activity_count": 3}
    ])
}

fn fields() -> Vec<Field> {
    vec![
        Field::dimension("day_of_week", SemanticType::Nominal),
        Field::dimension("hour", SemanticType::Nominal),
        Field::dimension("temp", SemanticType::Quantitative),
        Field::measure("activity_count", Aggregation::Sum),
    ]
}

fn explain_request(mark: Value) -> Value {
    let all = fields();
    let dimensions = vec![all[0].clone()];
    let measures = vec![all[3].clone()];
    json!({
        "allFields": all,
        "viewDimensions": dimensions,
        "viewMeasures": measures,
        "selectedMark": mark
    })
}

// =============================================================================
// Query Tests
// =============================================================================

/// A builder-compiled workflow written to disk runs through the CLI.
#[test]
fn test_query_with_compiled_workflow() {
    let dir = TempDir::new().unwrap();
    let all = fields();
    let steps = WorkflowBuilder::new(&all)
        .with_dimensions([&all[0]])
        .with_measures([&all[3]])
        .with_sort(vec!["activity_count_sum".into()], SortOrder::Descending)
        .build();

    let data = write(&dir, "rows.json", &rows());
    let workflow = write(&dir, "steps.json", &serde_json::to_value(&steps).unwrap());

    let out = query(&data, &workflow, None, None, None).unwrap();
    assert_eq!(
        out["rows"],
        json!([
            {"day_of_week": "Sat", "activity_count_sum": 20.0},
            {"day_of_week": "Sun", "activity_count_sum": 15.0}
        ])
    );
    assert_eq!(out["scanned_count"], json!(4));
}

/// Non-array data is rejected with an input error.
#[test]
fn test_query_rejects_bad_data() {
    let dir = TempDir::new().unwrap();
    let data = write(&dir, "rows.json", &json!({"not": "an array"}));
    let workflow = write(&dir, "steps.json", &json!([]));

    let err = query(&data, &workflow, None, None, None).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::InvalidInput);
    assert_eq!(err.code_str(), "CHART_CLI_INVALID_INPUT");
}

// =============================================================================
// Explain Tests
// =============================================================================

/// A selected mark yields ranked candidates for the unused dimensions.
#[test]
fn test_explain_selected_mark() {
    let dir = TempDir::new().unwrap();
    let data = write(&dir, "rows.json", &rows());
    let request = write(
        &dir,
        "request.json",
        &explain_request(json!({"day_of_week": "Sat"})),
    );

    let out = explain(&data, &request, None).unwrap();
    let candidates = out["candidates"].as_array().unwrap();
    let targets: Vec<&str> = candidates
        .iter()
        .map(|c| c["targetField"]["fid"].as_str().unwrap())
        .collect();

    assert_eq!(targets.len(), 2);
    assert!(targets.contains(&"hour") && targets.contains(&"temp"));
    assert_eq!(out["selection"]["isPartialSelection"], json!(false));
    assert_eq!(out["metrics"]["explain_runs"], json!(1));
}

/// A mark without any dimension value explains nothing and queries nothing.
#[test]
fn test_explain_without_valid_selection() {
    let dir = TempDir::new().unwrap();
    let data = write(&dir, "rows.json", &rows());
    let request = write(&dir, "request.json", &explain_request(json!({"day_of_week": ""})));

    let out = explain(&data, &request, None).unwrap();
    assert_eq!(out["candidates"], json!([]));
    assert_eq!(out["selection"]["matchedDimensions"], json!(0));
    assert_eq!(out["metrics"]["computation_calls"], json!(0));
}

/// The configured bin count controls how quantitative candidates are bucketed.
#[test]
fn test_explain_honors_bin_count() {
    let dir = TempDir::new().unwrap();
    let data = write(&dir, "rows.json", &rows());
    let request = write(
        &dir,
        "request.json",
        &explain_request(json!({"day_of_week": "Sat"})),
    );
    let config = write(&dir, "config.json", &json!({"bin_count": 2, "log_level": "warn"}));

    let out = explain(&data, &request, Some(&config)).unwrap();
    let temp = out["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["targetField"]["fid"] == json!("temp"))
        .unwrap();

    assert_eq!(temp["normalizedParent"].as_array().unwrap().len(), 2);
}

/// A missing request file is an I/O error.
#[test]
fn test_explain_missing_request() {
    let dir = TempDir::new().unwrap();
    let data = write(&dir, "rows.json", &rows());

    let err = explain(&data, &dir.path().join("missing.json"), None).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::IoError);
}
