//! CLI command implementations
//!
//! Each command loads configuration, reads its input files, does its work
//! and returns the `data` payload. `run_command` owns all stdout output so
//! that exactly one JSON object is printed per invocation.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::computation::LocalComputation;
use crate::config::EngineConfig;
use crate::context::EngineContext;
use crate::executor::{Row, WorkflowRunner};
use crate::insights::{
    build_explain_predicates, build_selection_context, ExplainEngine, ExplainRequest,
    ExplanationCandidate, SelectionContext,
};
use crate::observability::{MetricsSnapshot, ObservationScope, Severity};
use crate::workflow::WorkflowStep;

use super::args::{Cli, Command};
use super::errors::CliResult;
use super::io::{read_json, read_rows, write_error, write_response};

/// Explain request file: a request, optionally with the selected mark the
/// predicates should be derived from
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExplainInput {
    #[serde(flatten)]
    request: ExplainRequest,
    #[serde(default)]
    selected_mark: Option<Row>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExplainOutput {
    selection: SelectionContext,
    candidates: Vec<ExplanationCandidate>,
    metrics: MetricsSnapshot,
}

/// Parse arguments and run the chosen command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run a command, printing its response or error object
pub fn run_command(cmd: Command) -> CliResult<()> {
    let request_id = Uuid::new_v4().to_string();
    let scope = ObservationScope::with_fields(
        "COMMAND",
        Severity::Info,
        &[("command", cmd.name()), ("request_id", request_id.as_str())],
    );

    let result = match cmd {
        Command::Query {
            data,
            workflow,
            offset,
            limit,
            config,
        } => query(&data, &workflow, offset, limit, config.as_deref()),
        Command::Explain {
            data,
            request,
            config,
        } => explain(&data, &request, config.as_deref()),
    };

    match result {
        Ok(data) => {
            scope.complete();
            write_response(data)
        }
        Err(e) => {
            scope.fail(e.message());
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Loads the config file if given, else defaults, and applies its log level
pub fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.apply_logging();
    Ok(config)
}

/// Runs a workflow file over a dataset file
pub fn query(
    data_path: &Path,
    workflow_path: &Path,
    offset: Option<usize>,
    limit: Option<usize>,
    config_path: Option<&Path>,
) -> CliResult<Value> {
    load_config(config_path)?;

    let rows = read_rows(data_path)?;
    let steps: Vec<WorkflowStep> = read_json(workflow_path)?;
    WorkflowRunner::validate_workflow(&steps)?;

    let result = WorkflowRunner::new().execute(&rows, &steps, offset, limit);
    Ok(serde_json::to_value(result)?)
}

/// Explains a selection over a dataset file
pub fn explain(data_path: &Path, request_path: &Path, config_path: Option<&Path>) -> CliResult<Value> {
    let config = load_config(config_path)?;

    let rows = read_rows(data_path)?;
    let ExplainInput {
        mut request,
        selected_mark,
    } = read_json(request_path)?;

    if request.predicates.is_empty() {
        if let Some(mark) = &selected_mark {
            request.predicates = build_explain_predicates(&request.view_dimensions, mark);
        }
    }
    let selection = build_selection_context(&request.view_dimensions, &request.predicates);

    let ctx = EngineContext::new(config);
    let computation = LocalComputation::with_metrics(rows, Arc::clone(ctx.metrics()));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let candidates = runtime.block_on(ExplainEngine::new(&ctx, &computation).explain(&request))?;

    let output = ExplainOutput {
        selection,
        candidates,
        metrics: ctx.metrics().snapshot(),
    };
    ctx.dispose();

    Ok(serde_json::to_value(output)?)
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, value: Value) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, value.to_string()).unwrap();
        path
    }

    fn dataset(dir: &TempDir) -> std::path::PathBuf {
        write(
            dir,
            "rows.json",
            json!([
                {"day": "Sat", "hour": "09", "cnt": 5},
                {"day": "Sat", "hour": "10", "cnt": 15},
                {"day": "Sun", "hour": "09", "cnt": 12}
            ]),
        )
    }

    #[test]
    fn test_query_paginates() {
        let dir = TempDir::new().unwrap();
        let data = dataset(&dir);
        let workflow = write(
            &dir,
            "steps.json",
            json!([
                {"type": "view", "query": [{"op": "aggregate", "groupBy": ["hour"],
                    "measures": [{"field": "cnt", "agg": "sum", "asFieldKey": "cnt_sum"}]}]},
                {"type": "sort", "by": ["cnt_sum"], "sort": "descending"}
            ]),
        );

        let out = query(&data, &workflow, Some(0), Some(1), None).unwrap();
        assert_eq!(out["rows"], json!([{"hour": "09", "cnt_sum": 17.0}]));
        assert_eq!(out["total_count"], json!(2));
    }

    #[test]
    fn test_query_rejects_invalid_workflow() {
        let dir = TempDir::new().unwrap();
        let data = dataset(&dir);
        let workflow = write(&dir, "steps.json", json!([{"type": "sort", "by": [], "sort": "ascending"}]));

        let err = query(&data, &workflow, None, None, None).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::WorkflowInvalid);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = TempDir::new().unwrap();
        let data = dataset(&dir);
        let workflow = write(&dir, "steps.json", json!([]));
        let config = write(&dir, "config.json", json!({"bin_count": 0}));

        let err = query(&data, &workflow, None, None, Some(&config)).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_explain_from_selected_mark() {
        let dir = TempDir::new().unwrap();
        let data = dataset(&dir);
        let request = write(
            &dir,
            "request.json",
            json!({
                "allFields": [
                    {"fid": "day", "name": "day", "semanticType": "nominal", "analyticType": "dimension"},
                    {"fid": "hour", "name": "hour", "semanticType": "nominal", "analyticType": "dimension"},
                    {"fid": "cnt", "name": "cnt", "semanticType": "quantitative", "analyticType": "measure", "aggName": "sum"}
                ],
                "viewDimensions": [
                    {"fid": "day", "name": "day", "semanticType": "nominal", "analyticType": "dimension"}
                ],
                "viewMeasures": [
                    {"fid": "cnt", "name": "cnt", "semanticType": "quantitative", "analyticType": "measure", "aggName": "sum"}
                ],
                "selectedMark": {"day": "Sat", "cnt_sum": 20}
            }),
        );

        let out = explain(&data, &request, None).unwrap();
        assert_eq!(out["selection"]["matchedDimensions"], json!(1));
        let candidates = out["candidates"].as_array().unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0]["targetField"]["fid"], json!("hour"));
        assert_eq!(candidates[0]["measureKey"], json!("cnt_sum"));
    }
}
