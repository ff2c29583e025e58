//! View queries: grouping with aggregation, and raw projection
//!
//! Groups are emitted in first-appearance order. Rows missing a group field
//! fall into the `null` group for that field.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use super::value::{finite_field, group_key, number, Row};
use crate::schema::Aggregation;
use crate::workflow::{MeasureSpec, ViewQuery};

/// Runs view queries
pub struct ViewExecutor;

impl ViewExecutor {
    /// Runs each query on the previous query's output
    pub fn apply(rows: Vec<Row>, queries: &[ViewQuery]) -> Vec<Row> {
        queries.iter().fold(rows, |rows, query| match query {
            ViewQuery::Aggregate { group_by, measures } => {
                Self::aggregate(&rows, group_by, measures)
            }
            ViewQuery::Raw { fields } => Self::project(rows, fields),
        })
    }

    /// One output row per distinct combination of `group_by` values
    pub fn aggregate(rows: &[Row], group_by: &[String], measures: &[MeasureSpec]) -> Vec<Row> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<Vec<&Row>> = Vec::new();

        for row in rows {
            let key = group_key(group_by.iter().map(|f| row.get(f)));
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(row);
        }

        groups
            .iter()
            .map(|members| {
                let mut out = Row::new();
                let first = members[0];
                for field in group_by {
                    out.insert(
                        field.clone(),
                        first.get(field).cloned().unwrap_or(Value::Null),
                    );
                }
                for measure in measures {
                    out.insert(
                        measure.as_field_key.clone(),
                        aggregate_values(members, &measure.field, measure.agg),
                    );
                }
                out
            })
            .collect()
    }

    /// Keeps only the listed fields
    pub fn project(rows: Vec<Row>, fields: &[String]) -> Vec<Row> {
        rows.into_iter()
            .map(|mut row| {
                let mut out = Row::new();
                for field in fields {
                    if let Some(v) = row.remove(field) {
                        out.insert(field.clone(), v);
                    }
                }
                out
            })
            .collect()
    }
}

/// Aggregates one field over a group.
///
/// Non-numeric values are skipped; with no numeric input the result is
/// `null`. `count` and `distinctCount` count rows and values instead.
pub fn aggregate_values(rows: &[&Row], field: &str, agg: Aggregation) -> Value {
    match agg {
        Aggregation::Count => Value::from(rows.len() as u64),
        Aggregation::DistinctCount => {
            let distinct: HashSet<String> = rows
                .iter()
                .filter_map(|row| row.get(field))
                .filter(|v| !v.is_null())
                .map(|v| group_key([Some(v)]))
                .collect();
            Value::from(distinct.len() as u64)
        }
        Aggregation::Expr => rows
            .first()
            .and_then(|row| row.get(field))
            .cloned()
            .unwrap_or(Value::Null),
        numeric => {
            let values: Vec<f64> = rows.iter().filter_map(|row| finite_field(row, field)).collect();
            if values.is_empty() {
                return Value::Null;
            }
            number(numeric_aggregate(&values, numeric))
        }
    }
}

fn numeric_aggregate(values: &[f64], agg: Aggregation) -> f64 {
    let n = values.len() as f64;
    match agg {
        Aggregation::Sum => values.iter().sum(),
        Aggregation::Mean => values.iter().sum::<f64>() / n,
        Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        Aggregation::Median => {
            let mut sorted = values.to_vec();
            sorted.sort_by(f64::total_cmp);
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 0 {
                (sorted[mid - 1] + sorted[mid]) / 2.0
            } else {
                sorted[mid]
            }
        }
        Aggregation::Variance | Aggregation::Stdev => {
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            if agg == Aggregation::Stdev {
                variance.sqrt()
            } else {
                variance
            }
        }
        Aggregation::Count | Aggregation::DistinctCount | Aggregation::Expr => n,
    }
}
