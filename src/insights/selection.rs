//! Selected-mark resolution
//!
//! A selected mark is a row-shaped object produced by the renderer. Its keys
//! may be a field's id, display name or base name depending on how the chart
//! was encoded, so each dimension is looked up in that fixed order.

use serde::Serialize;
use serde_json::Value;

use crate::executor::Row;
use crate::schema::Field;
use crate::workflow::Predicate;

/// How much of the chart's dimensions a selection pins down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionContext {
    pub matched_dimensions: usize,
    pub total_dimensions: usize,
    /// Some but not all dimensions matched
    pub is_partial_selection: bool,
}

fn is_valid_selection_value(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64().is_some_and(f64::is_finite),
        Value::String(s) => !s.is_empty(),
        Value::Bool(_) => true,
        _ => false,
    }
}

/// Resolves the mark's value for `field`.
///
/// Tries `fid`, then `name`, then `basename`. The first key present with a
/// valid value wins; a present but invalid value falls through to the next key.
pub fn resolve_selection_value(field: &Field, mark: &Row) -> Option<Value> {
    [Some(field.fid.as_str()), Some(field.name.as_str()), field.basename.as_deref()]
        .into_iter()
        .flatten()
        .filter(|key| !key.is_empty())
        .filter_map(|key| mark.get(key))
        .find(|value| is_valid_selection_value(value))
        .cloned()
}

/// One `one of` predicate per dimension the mark carries a value for
pub fn build_explain_predicates(view_dimensions: &[Field], mark: &Row) -> Vec<Predicate> {
    view_dimensions
        .iter()
        .filter_map(|field| {
            resolve_selection_value(field, mark).map(|v| Predicate::one_of(&field.fid, vec![v]))
        })
        .collect()
}

pub fn build_selection_context(view_dimensions: &[Field], predicates: &[Predicate]) -> SelectionContext {
    let total_dimensions = view_dimensions.len();
    let matched_dimensions = predicates.len();
    SelectionContext {
        matched_dimensions,
        total_dimensions,
        is_partial_selection: matched_dimensions > 0 && matched_dimensions < total_dimensions,
    }
}

/// Stable signature of the resolved selection: a JSON list of
/// `[fid, value]` pairs in dimension order, with `null` for unresolved
/// dimensions. Changes exactly when the resolved selection changes.
pub fn selection_signature(view_dimensions: &[Field], mark: &Row) -> String {
    let pairs: Vec<(&str, Option<Value>)> = view_dimensions
        .iter()
        .map(|field| (field.fid.as_str(), resolve_selection_value(field, mark)))
        .collect();
    serde_json::to_string(&pairs).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SemanticType;
    use crate::workflow::FilterRule;
    use serde_json::json;

    fn mark(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("mark must be an object"),
        }
    }

    fn day() -> Field {
        Field::dimension("fid_day", SemanticType::Nominal)
            .with_name("Day")
            .with_basename("day")
    }

    #[test]
    fn test_fid_takes_priority() {
        let m = mark(json!({"fid_day": "Sat", "Day": "Sun"}));
        assert_eq!(resolve_selection_value(&day(), &m), Some(json!("Sat")));
    }

    #[test]
    fn test_falls_back_to_name_then_basename() {
        let by_name = mark(json!({"Day": "Sun"}));
        assert_eq!(resolve_selection_value(&day(), &by_name), Some(json!("Sun")));

        let by_basename = mark(json!({"fid_day": "", "Day": null, "day": "Mon"}));
        assert_eq!(resolve_selection_value(&day(), &by_basename), Some(json!("Mon")));
    }

    #[test]
    fn test_invalid_values_resolve_to_none() {
        let m = mark(json!({"fid_day": null, "Day": "", "day": {"nested": 1}}));
        assert_eq!(resolve_selection_value(&day(), &m), None);

        let flag = mark(json!({"fid_day": false}));
        assert_eq!(resolve_selection_value(&day(), &flag), Some(json!(false)));

        let zero = mark(json!({"fid_day": 0}));
        assert_eq!(resolve_selection_value(&day(), &zero), Some(json!(0)));
    }

    #[test]
    fn test_predicates_and_partial_context() {
        let dims = vec![day(), Field::dimension("hour", SemanticType::Ordinal)];
        let m = mark(json!({"Day": "Sat"}));

        let predicates = build_explain_predicates(&dims, &m);
        assert_eq!(predicates.len(), 1);
        assert_eq!(predicates[0].field, "fid_day");
        assert_eq!(predicates[0].rule, FilterRule::OneOf { value: vec![json!("Sat")] });

        let ctx = build_selection_context(&dims, &predicates);
        assert_eq!(ctx.matched_dimensions, 1);
        assert_eq!(ctx.total_dimensions, 2);
        assert!(ctx.is_partial_selection);

        let none = build_selection_context(&dims, &[]);
        assert!(!none.is_partial_selection);
    }

    #[test]
    fn test_signature() {
        let dims = vec![day(), Field::dimension("hour", SemanticType::Ordinal)];
        let m = mark(json!({"fid_day": "Sat", "hour": 9}));
        assert_eq!(
            selection_signature(&dims, &m),
            r#"[["fid_day","Sat"],["hour",9]]"#
        );

        let partial = mark(json!({"fid_day": "Sat"}));
        assert_eq!(
            selection_signature(&dims, &partial),
            r#"[["fid_day","Sat"],["hour",null]]"#
        );
    }

    #[test]
    fn test_signature_keeps_value_types_and_separators() {
        let dims = vec![Field::dimension("hour", SemanticType::Ordinal)];
        let text = mark(json!({"hour": "9"}));
        let num = mark(json!({"hour": 9}));
        assert_ne!(selection_signature(&dims, &text), selection_signature(&dims, &num));

        let pair = vec![
            Field::dimension("a", SemanticType::Nominal),
            Field::dimension("b", SemanticType::Nominal),
        ];
        let joined = mark(json!({"a": "x|b:y"}));
        let split = mark(json!({"a": "x", "b": "y"}));
        assert_ne!(selection_signature(&pair, &joined), selection_signature(&pair, &split));
    }
}
