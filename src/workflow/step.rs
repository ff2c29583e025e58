//! Workflow step structures
//!
//! Defines the compiled representation consumed by the executor. The wire
//! format is JSON with a `type` tag per step.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::schema::Aggregation;

/// Bucket count used when a bin expression does not specify one
pub const DEFAULT_BIN_COUNT: usize = 10;

fn default_bin_count() -> usize {
    DEFAULT_BIN_COUNT
}

fn default_log_base() -> f64 {
    10.0
}

/// Upper bound handling for numeric ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundKind {
    /// `value <= upper`
    #[default]
    Inclusive,
    /// `value < upper`
    Exclusive,
}

/// Constraint applied to a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FilterRule {
    /// Value must be a member of the set
    #[serde(rename = "one of")]
    OneOf { value: Vec<Value> },
    /// Value must not be a member of the set
    #[serde(rename = "not in")]
    NotIn { value: Vec<Value> },
    /// Numeric bounds, lower always inclusive
    #[serde(rename = "range")]
    Range {
        value: [f64; 2],
        #[serde(default)]
        upper: BoundKind,
    },
    /// Epoch-millisecond bounds, both inclusive
    #[serde(rename = "temporal range")]
    TemporalRange {
        value: [i64; 2],
        /// Minutes east of UTC used for zone-less date strings
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offset: Option<i32>,
    },
    /// Pattern match on the value's string form
    #[serde(rename = "regexp")]
    Regexp {
        value: String,
        #[serde(default, rename = "caseSensitive")]
        case_sensitive: bool,
    },
}

impl FilterRule {
    /// Returns the rule name for logs and errors
    pub fn rule_name(&self) -> &'static str {
        match self {
            FilterRule::OneOf { .. } => "one of",
            FilterRule::NotIn { .. } => "not in",
            FilterRule::Range { .. } => "range",
            FilterRule::TemporalRange { .. } => "temporal range",
            FilterRule::Regexp { .. } => "regexp",
        }
    }

    /// Returns true for set-membership rules
    pub fn is_discrete(&self) -> bool {
        matches!(self, FilterRule::OneOf { .. } | FilterRule::NotIn { .. })
    }
}

/// A single predicate (field + rule)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// Field identifier
    #[serde(rename = "fid")]
    pub field: String,
    /// Rule applied to the field's value
    pub rule: FilterRule,
}

impl Predicate {
    /// Create a discrete membership predicate
    pub fn one_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            rule: FilterRule::OneOf { value: values },
        }
    }

    /// Create an exclusion predicate
    pub fn not_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            rule: FilterRule::NotIn { value: values },
        }
    }

    /// Create an inclusive numeric range predicate
    pub fn range(field: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            field: field.into(),
            rule: FilterRule::Range {
                value: [lower, upper],
                upper: BoundKind::Inclusive,
            },
        }
    }

    /// Create a half-open numeric range predicate: `lower <= v < upper`
    pub fn half_open(field: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            field: field.into(),
            rule: FilterRule::Range {
                value: [lower, upper],
                upper: BoundKind::Exclusive,
            },
        }
    }

    /// Create a temporal range predicate over epoch milliseconds
    pub fn temporal_range(
        field: impl Into<String>,
        start_ms: i64,
        end_ms: i64,
        offset: Option<i32>,
    ) -> Self {
        Self {
            field: field.into(),
            rule: FilterRule::TemporalRange {
                value: [start_ms, end_ms],
                offset,
            },
        }
    }

    /// Create a regular expression predicate
    pub fn regexp(field: impl Into<String>, pattern: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            field: field.into(),
            rule: FilterRule::Regexp {
                value: pattern.into(),
                case_sensitive,
            },
        }
    }

    /// Returns true if this is a discrete predicate
    pub fn is_discrete(&self) -> bool {
        self.rule.is_discrete()
    }
}

/// Calendar unit for date drills and features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    /// Day of week, Monday = 1 (features only; drills treat it as `day`)
    Weekday,
    Hour,
    Minute,
    Second,
}

/// Derived-field expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum TransformExpr {
    /// Equal-width binning into `num` buckets, producing `[lower, upper]`
    Bin {
        field: String,
        #[serde(default = "default_bin_count")]
        num: usize,
    },
    /// Logarithm in the given base
    Log {
        field: String,
        #[serde(default = "default_log_base")]
        base: f64,
    },
    /// The constant 1
    One,
    /// Truncates a temporal value to the start of its unit (epoch ms)
    DateTimeDrill {
        field: String,
        unit: TimeUnit,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offset: Option<i32>,
    },
    /// Extracts a calendar component as a number
    DateTimeFeature {
        field: String,
        unit: TimeUnit,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offset: Option<i32>,
    },
}

impl TransformExpr {
    /// Create a bin expression
    pub fn bin(field: impl Into<String>, num: usize) -> Self {
        TransformExpr::Bin {
            field: field.into(),
            num,
        }
    }

    /// Returns the field the expression reads, if any
    pub fn source_field(&self) -> Option<&str> {
        match self {
            TransformExpr::Bin { field, .. }
            | TransformExpr::Log { field, .. }
            | TransformExpr::DateTimeDrill { field, .. }
            | TransformExpr::DateTimeFeature { field, .. } => Some(field),
            TransformExpr::One => None,
        }
    }
}

/// A derived field written under `key`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTransform {
    /// Output key
    pub key: String,
    /// Expression producing the value
    pub expression: TransformExpr,
}

impl FieldTransform {
    pub fn new(key: impl Into<String>, expression: TransformExpr) -> Self {
        Self {
            key: key.into(),
            expression,
        }
    }
}

/// One aggregated measure in a view query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureSpec {
    /// Source field
    pub field: String,
    /// Aggregation
    pub agg: Aggregation,
    /// Output key
    #[serde(rename = "asFieldKey")]
    pub as_field_key: String,
}

/// A grouping/aggregation or projection query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ViewQuery {
    /// One row per distinct combination of `group_by` values
    Aggregate {
        #[serde(rename = "groupBy")]
        group_by: Vec<String>,
        measures: Vec<MeasureSpec>,
    },
    /// Unaggregated rows projected to `fields`
    Raw { fields: Vec<String> },
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

/// One step of a workflow
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowStep {
    /// Drop rows not matching every predicate
    Filter { filters: Vec<Predicate> },
    /// Add derived fields
    Transform { transform: Vec<FieldTransform> },
    /// Run view queries in order
    View { query: Vec<ViewQuery> },
    /// Stable sort
    Sort { by: Vec<String>, sort: SortOrder },
    /// Step kind this engine does not recognize
    Unknown { kind: String },
}

impl WorkflowStep {
    /// Create a filter step
    pub fn filter(filters: Vec<Predicate>) -> Self {
        WorkflowStep::Filter { filters }
    }

    /// Create a transform step
    pub fn transform(transform: Vec<FieldTransform>) -> Self {
        WorkflowStep::Transform { transform }
    }

    /// Create a view step
    pub fn view(query: Vec<ViewQuery>) -> Self {
        WorkflowStep::View { query }
    }

    /// Create a sort step
    pub fn sort(by: Vec<String>, sort: SortOrder) -> Self {
        WorkflowStep::Sort { by, sort }
    }

    /// Returns the step kind as written on the wire
    pub fn kind(&self) -> &str {
        match self {
            WorkflowStep::Filter { .. } => "filter",
            WorkflowStep::Transform { .. } => "transform",
            WorkflowStep::View { .. } => "view",
            WorkflowStep::Sort { .. } => "sort",
            WorkflowStep::Unknown { kind } => kind,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaggedStepRef<'a> {
    Filter { filters: &'a [Predicate] },
    Transform { transform: &'a [FieldTransform] },
    View { query: &'a [ViewQuery] },
    Sort { by: &'a [String], sort: SortOrder },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaggedStep {
    Filter { filters: Vec<Predicate> },
    Transform { transform: Vec<FieldTransform> },
    View { query: Vec<ViewQuery> },
    Sort { by: Vec<String>, sort: SortOrder },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StepRepr {
    Known(TaggedStep),
    Other {
        #[serde(rename = "type")]
        kind: String,
    },
}

impl Serialize for WorkflowStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WorkflowStep::Filter { filters } => TaggedStepRef::Filter {
                filters: filters.as_slice(),
            }
            .serialize(serializer),
            WorkflowStep::Transform { transform } => TaggedStepRef::Transform {
                transform: transform.as_slice(),
            }
            .serialize(serializer),
            WorkflowStep::View { query } => TaggedStepRef::View {
                query: query.as_slice(),
            }
            .serialize(serializer),
            WorkflowStep::Sort { by, sort } => TaggedStepRef::Sort {
                by: by.as_slice(),
                sort: *sort,
            }
            .serialize(serializer),
            WorkflowStep::Unknown { kind } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("type", kind)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for WorkflowStep {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match StepRepr::deserialize(deserializer)? {
            StepRepr::Known(TaggedStep::Filter { filters }) => WorkflowStep::Filter { filters },
            StepRepr::Known(TaggedStep::Transform { transform }) => {
                WorkflowStep::Transform { transform }
            }
            StepRepr::Known(TaggedStep::View { query }) => WorkflowStep::View { query },
            StepRepr::Known(TaggedStep::Sort { by, sort }) => WorkflowStep::Sort { by, sort },
            StepRepr::Other { kind } => WorkflowStep::Unknown { kind },
        })
    }
}
