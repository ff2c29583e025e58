//! Distribution normalization
//!
//! Turns two aggregated populations (a selected subset and its parent) into
//! per-group mass fractions aligned on the same set of groups, so that they
//! can be compared with a divergence metric.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::executor::{finite_field, group_key, number, Row};

/// How the subset is scaled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizationMode {
    /// Each population divided by its own total (both sum to 1)
    #[default]
    Independent,
    /// The subset divided by the parent's total
    ParentScaled,
}

/// Aligned normalized populations
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPair {
    pub subset: Vec<Row>,
    pub parent: Vec<Row>,
}

/// Rows collapsed per group: group values plus summed absolute masses
struct Collapsed {
    order: Vec<String>,
    groups: HashMap<String, (Row, Vec<f64>)>,
    totals: Vec<f64>,
}

impl Collapsed {
    fn new(rows: &[Row], group_keys: &[String], measure_keys: &[String]) -> Self {
        let mut order = Vec::new();
        let mut groups: HashMap<String, (Row, Vec<f64>)> = HashMap::new();
        let mut totals = vec![0.0; measure_keys.len()];

        for row in rows {
            let key = group_key(group_keys.iter().map(|k| row.get(k)));
            let entry = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                let values = group_keys
                    .iter()
                    .map(|k| (k.clone(), row.get(k).cloned().unwrap_or(Value::Null)))
                    .collect();
                (values, vec![0.0; measure_keys.len()])
            });

            for (i, measure) in measure_keys.iter().enumerate() {
                if let Some(v) = finite_field(row, measure) {
                    entry.1[i] += v.abs();
                    totals[i] += v.abs();
                }
            }
        }

        Self {
            order,
            groups,
            totals,
        }
    }

    fn mass(&self, key: &str, measure: usize) -> f64 {
        self.groups.get(key).map_or(0.0, |(_, masses)| masses[measure])
    }
}

/// Normalizes `subset` against `parent` over the union of their groups.
///
/// Groups appear in parent order, then subset-only groups in subset order.
/// A group absent on one side gets mass `0` there. A population whose
/// total is zero yields `null` masses.
pub fn normalize_with_parent(
    subset: &[Row],
    parent: &[Row],
    group_keys: &[String],
    measure_keys: &[String],
    mode: NormalizationMode,
) -> NormalizedPair {
    let sub = Collapsed::new(subset, group_keys, measure_keys);
    let par = Collapsed::new(parent, group_keys, measure_keys);

    let mut union: Vec<&String> = par.order.iter().collect();
    union.extend(sub.order.iter().filter(|k| !par.groups.contains_key(*k)));

    let subset_totals: &[f64] = match mode {
        NormalizationMode::Independent => &sub.totals,
        NormalizationMode::ParentScaled => &par.totals,
    };

    let mut pair = NormalizedPair::default();
    for key in union {
        let values = par
            .groups
            .get(key)
            .or_else(|| sub.groups.get(key))
            .map(|(values, _)| values.clone())
            .unwrap_or_default();

        let mut sub_row = values.clone();
        let mut par_row = values;
        for (i, measure) in measure_keys.iter().enumerate() {
            sub_row.insert(measure.clone(), fraction(sub.mass(key, i), subset_totals[i]));
            par_row.insert(measure.clone(), fraction(par.mass(key, i), par.totals[i]));
        }
        pair.subset.push(sub_row);
        pair.parent.push(par_row);
    }
    pair
}

fn fraction(mass: f64, total: f64) -> Value {
    if total > 0.0 && total.is_finite() {
        number(mass / total)
    } else {
        Value::Null
    }
}
