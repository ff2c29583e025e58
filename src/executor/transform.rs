//! Derived-field computation
//!
//! Each transform writes its output key on every row and leaves the other
//! keys untouched. Transforms apply in order, so a later transform can read
//! an earlier one's output.

use serde_json::Value;

use super::temporal;
use super::value::{as_finite_f64, number, Row};
use crate::workflow::{FieldTransform, TransformExpr};

/// Applies transform definitions to rows
pub struct TransformExecutor;

impl TransformExecutor {
    /// Applies every transform to every row
    pub fn apply(mut rows: Vec<Row>, transforms: &[FieldTransform]) -> Vec<Row> {
        for transform in transforms {
            Self::apply_one(&mut rows, transform);
        }
        rows
    }

    fn apply_one(rows: &mut [Row], transform: &FieldTransform) {
        match &transform.expression {
            TransformExpr::Bin { field, num } => {
                let bins = Binning::over(rows, field, *num);
                for row in rows.iter_mut() {
                    let out = row
                        .get(field)
                        .and_then(as_finite_f64)
                        .zip(bins.as_ref())
                        .map_or(Value::Null, |(v, b)| b.bucket(v));
                    row.insert(transform.key.clone(), out);
                }
            }
            TransformExpr::Log { field, base } => {
                for row in rows.iter_mut() {
                    let out = row
                        .get(field)
                        .and_then(as_finite_f64)
                        .map_or(Value::Null, |v| log_value(v, *base));
                    row.insert(transform.key.clone(), out);
                }
            }
            TransformExpr::One => {
                for row in rows.iter_mut() {
                    row.insert(transform.key.clone(), Value::from(1));
                }
            }
            TransformExpr::DateTimeDrill {
                field,
                unit,
                offset,
            } => {
                for row in rows.iter_mut() {
                    let out = row
                        .get(field)
                        .and_then(|v| temporal::parse_timestamp(v, *offset))
                        .and_then(|dt| temporal::drill(&dt, *unit))
                        .map_or(Value::Null, Value::from);
                    row.insert(transform.key.clone(), out);
                }
            }
            TransformExpr::DateTimeFeature {
                field,
                unit,
                offset,
            } => {
                for row in rows.iter_mut() {
                    let out = row
                        .get(field)
                        .and_then(|v| temporal::parse_timestamp(v, *offset))
                        .map_or(Value::Null, |dt| Value::from(temporal::feature(&dt, *unit)));
                    row.insert(transform.key.clone(), out);
                }
            }
        }
    }
}

fn log_value(v: f64, base: f64) -> Value {
    if v <= 0.0 || base <= 0.0 || base == 1.0 {
        return Value::Null;
    }
    if base == 10.0 {
        number(v.log10())
    } else {
        number(v.log(base))
    }
}

/// Equal-width buckets over a field's finite extent
struct Binning {
    min: f64,
    max: f64,
    width: f64,
    count: usize,
}

impl Binning {
    fn over(rows: &[Row], field: &str, count: usize) -> Option<Self> {
        let (min, max) = rows
            .iter()
            .filter_map(|row| row.get(field).and_then(as_finite_f64))
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })?;

        let count = count.max(1);
        Some(Self {
            min,
            max,
            width: (max - min) / count as f64,
            count,
        })
    }

    fn bucket(&self, v: f64) -> Value {
        if self.width <= 0.0 || !self.width.is_finite() {
            return Value::Array(vec![number(v), number(v)]);
        }

        // The maximum lands in the last bucket
        let index = (((v - self.min) / self.width).floor() as usize).min(self.count - 1);
        let lower = self.min + index as f64 * self.width;
        let upper = if index + 1 == self.count {
            self.max
        } else {
            self.min + (index + 1) as f64 * self.width
        };
        Value::Array(vec![number(lower), number(upper)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::TimeUnit;
    use serde_json::json;

    fn rows(values: &[Value]) -> Vec<Row> {
        values
            .iter()
            .map(|v| {
                let mut row = Row::new();
                row.insert("x".into(), v.clone());
                row
            })
            .collect()
    }

    #[test]
    fn test_bin_equal_width() {
        let input = rows(&[json!(0), json!(5), json!(10), json!("n/a")]);
        let out = TransformExecutor::apply(
            input,
            &[FieldTransform::new("x_bin", TransformExpr::bin("x", 2))],
        );

        assert_eq!(out[0]["x_bin"], json!([0.0, 5.0]));
        assert_eq!(out[1]["x_bin"], json!([5.0, 10.0]));
        // Maximum belongs to the last bucket
        assert_eq!(out[2]["x_bin"], json!([5.0, 10.0]));
        assert_eq!(out[3]["x_bin"], Value::Null);
        // Source field untouched
        assert_eq!(out[0]["x"], json!(0));
    }

    #[test]
    fn test_bin_zero_width_extent() {
        let input = rows(&[json!(3), json!(3)]);
        let out = TransformExecutor::apply(
            input,
            &[FieldTransform::new("x", TransformExpr::bin("x", 10))],
        );
        assert_eq!(out[0]["x"], json!([3.0, 3.0]));
    }

    #[test]
    fn test_log_positive_only() {
        let input = rows(&[json!(100), json!(0), json!(-1)]);
        let out = TransformExecutor::apply(
            input,
            &[FieldTransform::new(
                "lx",
                TransformExpr::Log {
                    field: "x".into(),
                    base: 10.0,
                },
            )],
        );
        assert_eq!(out[0]["lx"], json!(2.0));
        assert_eq!(out[1]["lx"], Value::Null);
        assert_eq!(out[2]["lx"], Value::Null);
    }

    #[test]
    fn test_one_and_chaining() {
        let input = rows(&[json!(1), json!(2)]);
        let out = TransformExecutor::apply(
            input,
            &[
                FieldTransform::new("n", TransformExpr::One),
                FieldTransform::new("n_bin", TransformExpr::bin("n", 4)),
            ],
        );
        assert_eq!(out[1]["n"], json!(1));
        assert_eq!(out[1]["n_bin"], json!([1.0, 1.0]));
    }

    #[test]
    fn test_date_time_drill_and_feature() {
        let input = rows(&[json!("2024-05-17 13:45:10"), json!("garbage")]);
        let out = TransformExecutor::apply(
            input,
            &[
                FieldTransform::new(
                    "x_year",
                    TransformExpr::DateTimeDrill {
                        field: "x".into(),
                        unit: TimeUnit::Year,
                        offset: None,
                    },
                ),
                FieldTransform::new(
                    "x_month",
                    TransformExpr::DateTimeFeature {
                        field: "x".into(),
                        unit: TimeUnit::Month,
                        offset: None,
                    },
                ),
            ],
        );

        let jan_first = temporal::parse_epoch_ms(&json!("2024-01-01"), None).unwrap();
        assert_eq!(out[0]["x_year"], json!(jan_first));
        assert_eq!(out[0]["x_month"], json!(5));
        assert_eq!(out[1]["x_year"], Value::Null);
        assert_eq!(out[1]["x_month"], Value::Null);
    }
}
