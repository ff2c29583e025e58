//! Compiles a chart view into workflow steps
//!
//! Step order (strict):
//! 1. Transform step for computed fields referenced by the view
//! 2. Filter step for configured view filters
//! 3. View step (aggregate or raw)
//! 4. Sort step (if specified)

use serde::{Deserialize, Serialize};

use crate::schema::{Aggregation, Field};

use super::step::{
    FieldTransform, FilterRule, MeasureSpec, Predicate, SortOrder, ViewQuery, WorkflowStep,
};

/// A filter configured on the chart. Filters without a rule are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewFilter {
    /// Filtered field
    pub fid: String,
    /// Configured rule
    #[serde(default)]
    pub rule: Option<FilterRule>,
}

impl ViewFilter {
    pub fn new(fid: impl Into<String>, rule: FilterRule) -> Self {
        Self {
            fid: fid.into(),
            rule: Some(rule),
        }
    }
}

/// Builder for view workflows
#[derive(Debug, Clone)]
pub struct WorkflowBuilder<'a> {
    all_fields: &'a [Field],
    filters: &'a [ViewFilter],
    dimensions: Vec<&'a Field>,
    measures: Vec<&'a Field>,
    default_aggregated: bool,
    default_aggregation: Aggregation,
    sort: Option<(Vec<String>, SortOrder)>,
    timezone_offset: Option<i32>,
}

impl<'a> WorkflowBuilder<'a> {
    /// Creates a builder over the dataset's fields
    pub fn new(all_fields: &'a [Field]) -> Self {
        Self {
            all_fields,
            filters: &[],
            dimensions: Vec::new(),
            measures: Vec::new(),
            default_aggregated: true,
            default_aggregation: Aggregation::Sum,
            sort: None,
            timezone_offset: None,
        }
    }

    /// Sets the view filters
    pub fn with_filters(mut self, filters: &'a [ViewFilter]) -> Self {
        self.filters = filters;
        self
    }

    /// Appends grouping dimensions
    pub fn with_dimensions<I>(mut self, dimensions: I) -> Self
    where
        I: IntoIterator<Item = &'a Field>,
    {
        self.dimensions.extend(dimensions);
        self
    }

    /// Appends measures
    pub fn with_measures<I>(mut self, measures: I) -> Self
    where
        I: IntoIterator<Item = &'a Field>,
    {
        self.measures.extend(measures);
        self
    }

    /// Aggregate (true) or return raw rows (false)
    pub fn aggregated(mut self, default_aggregated: bool) -> Self {
        self.default_aggregated = default_aggregated;
        self
    }

    /// Aggregation for measures without an `aggName`
    pub fn with_default_aggregation(mut self, agg: Aggregation) -> Self {
        self.default_aggregation = agg;
        self
    }

    /// Adds a sort step
    pub fn with_sort(mut self, by: Vec<String>, order: SortOrder) -> Self {
        self.sort = Some((by, order));
        self
    }

    /// Offset applied to temporal rules that do not carry their own
    pub fn with_timezone_offset(mut self, offset: Option<i32>) -> Self {
        self.timezone_offset = offset;
        self
    }

    /// Compiles the workflow
    pub fn build(&self) -> Vec<WorkflowStep> {
        let mut steps = Vec::with_capacity(4);

        let transforms = self.computed_transforms();
        if !transforms.is_empty() {
            steps.push(WorkflowStep::transform(transforms));
        }

        let filters = self.compiled_filters();
        if !filters.is_empty() {
            steps.push(WorkflowStep::filter(filters));
        }

        steps.push(WorkflowStep::view(vec![self.view_query()]));

        if let Some((by, order)) = &self.sort {
            if !by.is_empty() {
                steps.push(WorkflowStep::sort(by.clone(), *order));
            }
        }

        steps
    }

    /// Transforms for every computed field the view touches, in first-use order
    fn computed_transforms(&self) -> Vec<FieldTransform> {
        let mut seen: Vec<&str> = Vec::new();
        let referenced = self
            .filters
            .iter()
            .filter(|f| f.rule.is_some())
            .map(|f| f.fid.as_str())
            .chain(self.dimensions.iter().map(|f| f.fid.as_str()))
            .chain(self.measures.iter().map(|f| f.fid.as_str()));

        let mut transforms = Vec::new();
        for fid in referenced {
            if seen.contains(&fid) {
                continue;
            }
            seen.push(fid);

            let expression = self
                .dimensions
                .iter()
                .chain(self.measures.iter())
                .copied()
                .chain(self.all_fields.iter())
                .find(|f| f.fid == fid)
                .and_then(|f| f.expression.clone());

            if let Some(expression) = expression {
                transforms.push(FieldTransform::new(fid, expression));
            }
        }
        transforms
    }

    fn compiled_filters(&self) -> Vec<Predicate> {
        self.filters
            .iter()
            .filter_map(|f| {
                let rule = match f.rule.clone()? {
                    FilterRule::TemporalRange { value, offset } => FilterRule::TemporalRange {
                        value,
                        offset: offset.or(self.timezone_offset),
                    },
                    other => other,
                };
                Some(Predicate {
                    field: f.fid.clone(),
                    rule,
                })
            })
            .collect()
    }

    fn view_query(&self) -> ViewQuery {
        if self.default_aggregated {
            ViewQuery::Aggregate {
                group_by: self.dimensions.iter().map(|f| f.fid.clone()).collect(),
                measures: self
                    .measures
                    .iter()
                    .map(|f| {
                        let agg = f.aggregation_or(self.default_aggregation);
                        MeasureSpec {
                            field: f.fid.clone(),
                            agg,
                            as_field_key: f.aggregation_key_or(self.default_aggregation),
                        }
                    })
                    .collect(),
            }
        } else {
            ViewQuery::Raw {
                fields: self
                    .dimensions
                    .iter()
                    .chain(self.measures.iter())
                    .map(|f| f.fid.clone())
                    .collect(),
            }
        }
    }
}
