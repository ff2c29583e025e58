//! Comparison rows for rendering an explanation
//!
//! Flattens a candidate's parent and subset distributions into one row set a
//! layered bar chart can consume directly.

use serde_json::Value;

use super::explain::ExplanationCandidate;
use crate::executor::{as_finite_f64, display_value, finite_field, Row};
use crate::schema::Field;

/// Category label column
pub const CATEGORY_FIELD: &str = "__explain_category";
/// `parent` or `child`
pub const SCOPE_FIELD: &str = "__explain_scope";

/// Label for the candidate's value in `row`.
///
/// Quantitative candidates carry a `[lower, upper]` bin.
pub fn category_name(row: &Row, field: &Field) -> String {
    let value = row.get(&field.fid);

    if field.is_quantitative() {
        return match value {
            Some(Value::Array(bounds)) if bounds.len() >= 2 => {
                match (as_finite_f64(&bounds[0]), as_finite_f64(&bounds[1])) {
                    (Some(lo), Some(hi)) => format!("{:.2}-{:.2}", lo, hi),
                    _ => "Unknown range".to_string(),
                }
            }
            _ => "Unknown range".to_string(),
        };
    }

    match value {
        None | Some(Value::Null) => "Unknown".to_string(),
        Some(Value::String(s)) if s.is_empty() => "Unknown".to_string(),
        Some(v) => display_value(v),
    }
}

/// Parent rows then child rows, each labelled with category and scope.
/// Rows whose measure is not finite are left out.
pub fn comparison_rows(candidate: &ExplanationCandidate) -> Vec<Row> {
    let label = |rows: &[Row], scope: &str| -> Vec<Row> {
        rows.iter()
            .filter(|row| finite_field(row, &candidate.measure_key).is_some())
            .map(|row| {
                let mut out = row.clone();
                out.insert(
                    CATEGORY_FIELD.to_string(),
                    Value::String(category_name(row, &candidate.target_field)),
                );
                out.insert(SCOPE_FIELD.to_string(), Value::String(scope.to_string()));
                out
            })
            .collect()
    };

    let mut rows = label(&candidate.normalized_parent, "parent");
    rows.extend(label(&candidate.normalized_subset, "child"));
    rows
}
