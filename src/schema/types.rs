//! Field type definitions
//!
//! Wire names follow the chart description format:
//! - semanticType: quantitative | nominal | ordinal | temporal
//! - analyticType: dimension | measure
//! - aggName: sum | mean | median | max | min | count | variance | stdev | distinctCount | expr

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::workflow::TransformExpr;

/// Semantic type of a field's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    /// Continuous numeric values
    Quantitative,
    /// Unordered categories
    Nominal,
    /// Ordered categories
    Ordinal,
    /// Dates and timestamps
    Temporal,
}

impl SemanticType {
    /// Returns the wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Quantitative => "quantitative",
            SemanticType::Nominal => "nominal",
            SemanticType::Ordinal => "ordinal",
            SemanticType::Temporal => "temporal",
        }
    }
}

/// Analytic role of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticType {
    /// Grouping axis
    Dimension,
    /// Aggregated value
    Measure,
}

/// Aggregation applied to a measure in a view query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Aggregation {
    Sum,
    Mean,
    Median,
    Max,
    Min,
    Count,
    Variance,
    Stdev,
    DistinctCount,
    /// Value already aggregated by a computed expression
    Expr,
}

impl Aggregation {
    /// Returns the wire name, also used as the aggregation key suffix
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
            Aggregation::Median => "median",
            Aggregation::Max => "max",
            Aggregation::Min => "min",
            Aggregation::Count => "count",
            Aggregation::Variance => "variance",
            Aggregation::Stdev => "stdev",
            Aggregation::DistinctCount => "distinctCount",
            Aggregation::Expr => "expr",
        }
    }

    /// Parses a wire name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sum" => Some(Aggregation::Sum),
            "mean" => Some(Aggregation::Mean),
            "median" => Some(Aggregation::Median),
            "max" => Some(Aggregation::Max),
            "min" => Some(Aggregation::Min),
            "count" => Some(Aggregation::Count),
            "variance" => Some(Aggregation::Variance),
            "stdev" => Some(Aggregation::Stdev),
            "distinctCount" => Some(Aggregation::DistinctCount),
            "expr" => Some(Aggregation::Expr),
            _ => None,
        }
    }
}

impl Default for Aggregation {
    fn default() -> Self {
        Aggregation::Sum
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derives the row key an aggregated measure is written under.
///
/// Deterministic in (fid, aggregation) so renderers can re-derive it
/// without re-running the workflow.
pub fn aggregation_key(fid: &str, agg: Aggregation) -> String {
    format!("{}_{}", fid, agg.as_str())
}

/// A dataset field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Field identifier, unique within the dataset
    pub fid: String,
    /// Display name
    pub name: String,
    /// Alternate name reported by some mark payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basename: Option<String>,
    /// Semantic type
    pub semantic_type: SemanticType,
    /// Analytic role
    pub analytic_type: AnalyticType,
    /// Aggregation for measures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agg_name: Option<Aggregation>,
    /// Expression for computed fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<TransformExpr>,
}

impl Field {
    /// Creates a dimension field whose name equals its fid
    pub fn dimension(fid: impl Into<String>, semantic_type: SemanticType) -> Self {
        let fid = fid.into();
        Self {
            name: fid.clone(),
            fid,
            basename: None,
            semantic_type,
            analytic_type: AnalyticType::Dimension,
            agg_name: None,
            expression: None,
        }
    }

    /// Creates a quantitative measure field with the given aggregation
    pub fn measure(fid: impl Into<String>, agg: Aggregation) -> Self {
        let fid = fid.into();
        Self {
            name: fid.clone(),
            fid,
            basename: None,
            semantic_type: SemanticType::Quantitative,
            analytic_type: AnalyticType::Measure,
            agg_name: Some(agg),
            expression: None,
        }
    }

    /// Sets the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the alias name
    pub fn with_basename(mut self, basename: impl Into<String>) -> Self {
        self.basename = Some(basename.into());
        self
    }

    /// Marks the field as computed from an expression
    pub fn with_expression(mut self, expression: TransformExpr) -> Self {
        self.expression = Some(expression);
        self
    }

    /// Returns true for dimension fields
    pub fn is_dimension(&self) -> bool {
        self.analytic_type == AnalyticType::Dimension
    }

    /// Returns true for measure fields
    pub fn is_measure(&self) -> bool {
        self.analytic_type == AnalyticType::Measure
    }

    /// Returns true for quantitative fields
    pub fn is_quantitative(&self) -> bool {
        self.semantic_type == SemanticType::Quantitative
    }

    /// Aggregation to use, falling back to `default` when unset
    pub fn aggregation_or(&self, default: Aggregation) -> Aggregation {
        self.agg_name.unwrap_or(default)
    }

    /// Row key for this measure under its effective aggregation
    pub fn aggregation_key_or(&self, default: Aggregation) -> String {
        aggregation_key(&self.fid, self.aggregation_or(default))
    }
}
