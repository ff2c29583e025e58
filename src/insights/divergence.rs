//! Jensen–Shannon divergence between two grouped distributions
//!
//! Logarithms are base 2, so the score lies in `[0, 1]`.

use std::collections::HashMap;

use crate::executor::{finite_field, group_key, Row};

/// Scores how different `p_rows` and `q_rows` are over the union of groups.
///
/// Each side is rescaled to sum to 1 first. A side without positive finite
/// mass cannot form a distribution and scores `NaN`, which callers drop.
pub fn compare_distributions(
    p_rows: &[Row],
    q_rows: &[Row],
    group_keys: &[String],
    measure_key: &str,
) -> f64 {
    let mut order: Vec<String> = Vec::new();
    let mut masses: HashMap<String, (f64, f64)> = HashMap::new();

    let mut accumulate = |rows: &[Row], left: bool| {
        for row in rows {
            let Some(v) = finite_field(row, measure_key) else {
                continue;
            };
            let key = group_key(group_keys.iter().map(|k| row.get(k)));
            let entry = masses.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                (0.0, 0.0)
            });
            if left {
                entry.0 += v.abs();
            } else {
                entry.1 += v.abs();
            }
        }
    };
    accumulate(p_rows, true);
    accumulate(q_rows, false);

    let p_total: f64 = masses.values().map(|(p, _)| p).sum();
    let q_total: f64 = masses.values().map(|(_, q)| q).sum();
    if !(p_total > 0.0 && q_total > 0.0 && p_total.is_finite() && q_total.is_finite()) {
        return f64::NAN;
    }

    let (p, q): (Vec<f64>, Vec<f64>) = order
        .iter()
        .map(|k| {
            let (p, q) = masses[k];
            (p / p_total, q / q_total)
        })
        .unzip();

    jensen_shannon(&p, &q)
}

/// JS divergence of two aligned probability vectors
pub fn jensen_shannon(p: &[f64], q: &[f64]) -> f64 {
    let m: Vec<f64> = p.iter().zip(q).map(|(a, b)| (a + b) / 2.0).collect();
    let score = 0.5 * kl_divergence(p, &m) + 0.5 * kl_divergence(q, &m);
    // Rounding can push identical inputs a hair below zero
    score.max(0.0)
}

fn kl_divergence(p: &[f64], m: &[f64]) -> f64 {
    p.iter()
        .zip(m)
        .filter(|(pi, _)| **pi > 0.0)
        .map(|(pi, mi)| pi * (pi / mi).log2())
        .sum()
}
