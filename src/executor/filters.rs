//! Predicate filtering for workflow execution
//!
//! All predicates combine with AND. An empty predicate set matches every row.
//! Patterns compile once per filter pass; an invalid pattern matches nothing.

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use super::temporal;
use super::value::{as_finite_f64, display_value, values_equal, Row};
use crate::observability::{log_event_with_fields, Event};
use crate::workflow::{BoundKind, FilterRule, Predicate};

/// Evaluates predicates against rows
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if a row matches all predicates
    pub fn matches(row: &Row, predicates: &[Predicate]) -> bool {
        CompiledFilter::compile(predicates).matches(row)
    }

    /// Keeps the rows matching all predicates, in their original order
    pub fn filter_rows(rows: Vec<Row>, predicates: &[Predicate]) -> Vec<Row> {
        if predicates.is_empty() {
            return rows;
        }
        let compiled = CompiledFilter::compile(predicates);
        rows.into_iter().filter(|row| compiled.matches(row)).collect()
    }
}

/// Predicates with their patterns compiled
struct CompiledFilter<'a> {
    predicates: Vec<(&'a Predicate, Option<Regex>)>,
}

impl<'a> CompiledFilter<'a> {
    fn compile(predicates: &'a [Predicate]) -> Self {
        let predicates = predicates
            .iter()
            .map(|pred| {
                let regex = match &pred.rule {
                    FilterRule::Regexp {
                        value,
                        case_sensitive,
                    } => Self::compile_pattern(&pred.field, value, *case_sensitive),
                    _ => None,
                };
                (pred, regex)
            })
            .collect();
        Self { predicates }
    }

    fn compile_pattern(field: &str, pattern: &str, case_sensitive: bool) -> Option<Regex> {
        match RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
        {
            Ok(regex) => Some(regex),
            Err(err) => {
                let reason = err.to_string();
                log_event_with_fields(
                    Event::InvalidPattern,
                    &[("field", field), ("pattern", pattern), ("reason", reason.as_str())],
                );
                None
            }
        }
    }

    fn matches(&self, row: &Row) -> bool {
        self.predicates
            .iter()
            .all(|(pred, regex)| Self::matches_predicate(row, pred, regex.as_ref()))
    }

    fn matches_predicate(row: &Row, predicate: &Predicate, regex: Option<&Regex>) -> bool {
        let value = row.get(&predicate.field);

        match &predicate.rule {
            FilterRule::OneOf { value: members } => {
                value.map_or(false, |v| Self::is_member(v, members))
            }
            // Rows without the field are never excluded
            FilterRule::NotIn { value: members } => {
                value.map_or(true, |v| !Self::is_member(v, members))
            }
            FilterRule::Range {
                value: [lower, upper],
                upper: bound,
            } => value
                .and_then(as_finite_f64)
                .map_or(false, |v| Self::in_range(v, *lower, *upper, *bound)),
            FilterRule::TemporalRange {
                value: [start, end],
                offset,
            } => value
                .and_then(|v| temporal::parse_epoch_ms(v, *offset))
                .map_or(false, |t| *start <= t && t <= *end),
            FilterRule::Regexp { .. } => match (value, regex) {
                (Some(v), Some(re)) if !v.is_null() => re.is_match(&display_value(v)),
                _ => false,
            },
        }
    }

    fn is_member(value: &Value, members: &[Value]) -> bool {
        members.iter().any(|m| values_equal(value, m))
    }

    fn in_range(v: f64, lower: f64, upper: f64, bound: BoundKind) -> bool {
        if v < lower {
            return false;
        }
        match bound {
            BoundKind::Inclusive => v <= upper,
            BoundKind::Exclusive => v < upper,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    #[test]
    fn test_one_of_match() {
        let r = row(json!({"day": "Saturday", "cnt": 3}));

        assert!(PredicateFilter::matches(
            &r,
            &[Predicate::one_of("day", vec![json!("Saturday"), json!("Sunday")])]
        ));
        assert!(!PredicateFilter::matches(
            &r,
            &[Predicate::one_of("day", vec![json!("Monday")])]
        ));
    }

    #[test]
    fn test_falsy_members_are_distinct() {
        let zero = row(json!({"flag": 0}));
        let empty = row(json!({"flag": ""}));
        let no = row(json!({"flag": false}));

        let pred = [Predicate::one_of("flag", vec![json!(0)])];
        assert!(PredicateFilter::matches(&zero, &pred));
        assert!(!PredicateFilter::matches(&empty, &pred));
        assert!(!PredicateFilter::matches(&no, &pred));

        let pred = [Predicate::one_of("flag", vec![json!(false), json!("")])];
        assert!(!PredicateFilter::matches(&zero, &pred));
        assert!(PredicateFilter::matches(&empty, &pred));
        assert!(PredicateFilter::matches(&no, &pred));
    }

    #[test]
    fn test_no_type_coercion() {
        let r = row(json!({"value": 123}));

        // String "123" does not match integer 123
        assert!(!PredicateFilter::matches(
            &r,
            &[Predicate::one_of("value", vec![json!("123")])]
        ));
        assert!(PredicateFilter::matches(
            &r,
            &[Predicate::one_of("value", vec![json!(123.0)])]
        ));
    }

    #[test]
    fn test_not_in_keeps_missing_values() {
        let missing = row(json!({"other": 1}));
        let present = row(json!({"day": "Monday"}));

        let pred = [Predicate::not_in("day", vec![json!("Monday")])];
        assert!(PredicateFilter::matches(&missing, &pred));
        assert!(!PredicateFilter::matches(&present, &pred));
    }

    #[test]
    fn test_range_bounds() {
        let at_upper = row(json!({"age": 30}));

        assert!(PredicateFilter::matches(
            &at_upper,
            &[Predicate::range("age", 18.0, 30.0)]
        ));
        assert!(!PredicateFilter::matches(
            &at_upper,
            &[Predicate::half_open("age", 18.0, 30.0)]
        ));
        assert!(PredicateFilter::matches(
            &at_upper,
            &[Predicate::half_open("age", 30.0, 31.0)]
        ));
    }

    #[test]
    fn test_range_rejects_non_numeric() {
        let text = row(json!({"age": "25"}));
        let null = row(json!({"age": null}));
        let pred = [Predicate::range("age", 0.0, 100.0)];

        assert!(!PredicateFilter::matches(&text, &pred));
        assert!(!PredicateFilter::matches(&null, &pred));
    }

    #[test]
    fn test_temporal_range() {
        let epoch = row(json!({"ts": 1_000}));
        let text = row(json!({"ts": "1970-01-01 00:00:01"}));
        let outside = row(json!({"ts": 5_000}));

        let pred = [Predicate::temporal_range("ts", 0, 1_000, None)];
        assert!(PredicateFilter::matches(&epoch, &pred));
        assert!(PredicateFilter::matches(&text, &pred));
        assert!(!PredicateFilter::matches(&outside, &pred));

        // Read one hour east, the string lands an hour earlier in UTC
        let shifted = [Predicate::temporal_range("ts", -3_600_000, -3_599_000, Some(60))];
        assert!(PredicateFilter::matches(&text, &shifted));
    }

    #[test]
    fn test_regexp_case_sensitivity() {
        let r = row(json!({"city": "Berlin"}));

        assert!(PredicateFilter::matches(
            &r,
            &[Predicate::regexp("city", "^ber", false)]
        ));
        assert!(!PredicateFilter::matches(
            &r,
            &[Predicate::regexp("city", "^ber", true)]
        ));
    }

    #[test]
    fn test_invalid_pattern_matches_nothing() {
        let rows = vec![row(json!({"city": "Berlin"})), row(json!({"city": "("}))];
        let out = PredicateFilter::filter_rows(rows, &[Predicate::regexp("city", "(", true)]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_multiple_predicates_and() {
        let r = row(json!({"age": 25, "active": true}));

        let preds = vec![
            Predicate::range("age", 18.0, 99.0),
            Predicate::one_of("active", vec![json!(true)]),
        ];
        assert!(PredicateFilter::matches(&r, &preds));

        let preds = vec![
            Predicate::range("age", 18.0, 99.0),
            Predicate::one_of("active", vec![json!(false)]),
        ];
        assert!(!PredicateFilter::matches(&r, &preds));
    }

    #[test]
    fn test_missing_field_no_match() {
        let r = row(json!({"name": "Alice"}));
        assert!(!PredicateFilter::matches(
            &r,
            &[Predicate::one_of("age", vec![json!(30)])]
        ));
    }

    #[test]
    fn test_filter_rows_preserves_order() {
        let rows: Vec<Row> = (0..6).map(|i| row(json!({"i": i, "even": i % 2 == 0}))).collect();
        let out = PredicateFilter::filter_rows(rows, &[Predicate::one_of("even", vec![json!(true)])]);

        let ids: Vec<i64> = out.iter().map(|r| r["i"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![0, 2, 4]);
    }

    #[test]
    fn test_empty_predicates_match_all() {
        let rows = vec![row(json!({"a": 1})), row(json!({"a": 2}))];
        assert_eq!(PredicateFilter::filter_rows(rows.clone(), &[]), rows);
    }
}
