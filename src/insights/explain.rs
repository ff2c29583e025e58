//! Selection explanation search
//!
//! For a selected mark, tests every dimension not on the chart as a
//! breakdown and scores how differently the selection distributes over it
//! compared with the whole dataset.
//!
//! # Per (candidate, measure) pair
//!
//! 1. Quantitative candidates are binned first
//! 2. "overall" rows: view filters, grouped by the candidate only
//! 3. "view" rows: view filters, grouped by view dimensions + candidate
//! 4. Subset = view rows matching the selection predicates
//! 5. Skip on empty populations or zero/non-finite mass
//! 6. Normalize, score with JS divergence, emit
//!
//! Pairs are evaluated concurrently. Any computation failure fails the
//! whole search; no partial results are returned.

use futures_util::future::{try_join, try_join_all};
use serde::{Deserialize, Serialize};

use super::divergence::compare_distributions;
use super::errors::{ExplainError, ExplainResult};
use super::normalization::{normalize_with_parent, NormalizationMode};
use super::ranking::rank_candidates;
use crate::computation::{data_query, ComputationFunction};
use crate::context::EngineContext;
use crate::executor::{finite_field, PredicateFilter, Row};
use crate::observability::{log_event_with_fields, Event, ObservationScope, Severity};
use crate::schema::{aggregation_key, Field};
use crate::workflow::{
    FieldTransform, Predicate, TransformExpr, ViewFilter, WorkflowBuilder, WorkflowStep,
};

/// Input to one explain search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainRequest {
    /// Selection predicates, one per selected dimension value
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub view_filters: Vec<ViewFilter>,
    /// Every field of the dataset
    pub all_fields: Vec<Field>,
    pub view_measures: Vec<Field>,
    pub view_dimensions: Vec<Field>,
    /// Minutes east of UTC for zone-less temporal values
    #[serde(default)]
    pub timezone_offset: Option<i32>,
}

impl ExplainRequest {
    /// Dataset dimensions not already on the chart, in dataset order
    pub fn candidate_dimensions(&self) -> Vec<&Field> {
        self.all_fields
            .iter()
            .filter(|f| f.is_dimension())
            .filter(|f| !self.view_dimensions.iter().any(|d| d.fid == f.fid))
            .collect()
    }

    fn validate(&self) -> ExplainResult<()> {
        if let Some(p) = self.predicates.iter().find(|p| p.field.is_empty()) {
            return Err(ExplainError::InvalidRequest(format!(
                "{} predicate has an empty field id",
                p.rule.rule_name()
            )));
        }
        if self.view_measures.iter().any(|m| m.fid.is_empty()) {
            return Err(ExplainError::InvalidRequest(
                "view measure with an empty field id".into(),
            ));
        }
        Ok(())
    }
}

/// One explanation: how a candidate dimension splits the selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationCandidate {
    /// JS divergence, higher is more explanatory
    pub score: f64,
    /// Aggregation key of the measure column in the normalized rows
    pub measure_key: String,
    pub measure_field: Field,
    /// The candidate dimension
    pub target_field: Field,
    pub normalized_subset: Vec<Row>,
    pub normalized_parent: Vec<Row>,
}

/// Runs explain searches against a computation function
pub struct ExplainEngine<'a> {
    ctx: &'a EngineContext,
    computation: &'a dyn ComputationFunction,
}

impl<'a> ExplainEngine<'a> {
    pub fn new(ctx: &'a EngineContext, computation: &'a dyn ComputationFunction) -> Self {
        Self { ctx, computation }
    }

    pub fn context(&self) -> &'a EngineContext {
        self.ctx
    }

    /// Searches all (candidate, measure) pairs and returns ranked explanations
    pub async fn explain(&self, request: &ExplainRequest) -> ExplainResult<Vec<ExplanationCandidate>> {
        if request.predicates.is_empty() {
            return Ok(Vec::new());
        }
        request.validate()?;

        self.ctx.metrics().increment_explain_runs();
        let predicate_count = request.predicates.len().to_string();
        let scope = ObservationScope::with_fields(
            "EXPLAIN",
            Severity::Info,
            &[("predicates", predicate_count.as_str())],
        );

        let pairs: Vec<(&Field, &Field)> = request
            .candidate_dimensions()
            .into_iter()
            .flat_map(|target| request.view_measures.iter().map(move |m| (target, m)))
            .collect();

        let evaluated = try_join_all(
            pairs
                .iter()
                .map(|(target, measure)| self.evaluate_pair(request, target, measure)),
        )
        .await;

        match evaluated {
            Ok(found) => {
                let ranked = rank_candidates(found.into_iter().flatten().collect());
                self.ctx.metrics().add_candidates_emitted(ranked.len() as u64);

                let pairs_count = pairs.len().to_string();
                let candidates = ranked.len().to_string();
                scope.complete_with_fields(&[
                    ("pairs", pairs_count.as_str()),
                    ("candidates", candidates.as_str()),
                ]);
                Ok(ranked)
            }
            Err(err) => {
                scope.fail(&err.to_string());
                Err(err)
            }
        }
    }

    async fn evaluate_pair(
        &self,
        request: &ExplainRequest,
        target: &Field,
        measure: &Field,
    ) -> ExplainResult<Option<ExplanationCandidate>> {
        let config = self.ctx.config();
        let measure_key = aggregation_key(
            &measure.fid,
            measure.aggregation_or(config.default_aggregation),
        );

        let prelude = if target.is_quantitative() {
            vec![WorkflowStep::transform(vec![FieldTransform::new(
                &target.fid,
                TransformExpr::bin(&target.fid, config.bin_count),
            )])]
        } else {
            Vec::new()
        };

        let builder = WorkflowBuilder::new(&request.all_fields)
            .with_filters(&request.view_filters)
            .with_measures([measure])
            .with_default_aggregation(config.default_aggregation)
            .with_timezone_offset(request.timezone_offset);

        let overall: Vec<WorkflowStep> = prelude
            .iter()
            .cloned()
            .chain(builder.clone().with_dimensions([target]).build())
            .collect();
        let view: Vec<WorkflowStep> = prelude
            .into_iter()
            .chain(
                builder
                    .with_dimensions(request.view_dimensions.iter().chain([target]))
                    .build(),
            )
            .collect();

        let (overall_rows, view_rows) = try_join(
            data_query(self.ctx, self.computation, overall),
            data_query(self.ctx, self.computation, view),
        )
        .await?;

        if overall_rows.is_empty() {
            return Ok(self.skip(target, measure, "overall rows empty"));
        }
        if view_rows.is_empty() {
            return Ok(self.skip(target, measure, "view rows empty"));
        }

        let subset = PredicateFilter::filter_rows(view_rows, &request.predicates);
        if subset.is_empty() {
            return Ok(self.skip(target, measure, "selection matched no rows"));
        }

        let parent = finite_rows(overall_rows, &measure_key);
        let subset = finite_rows(subset, &measure_key);
        if parent.is_empty() || subset.is_empty() {
            return Ok(self.skip(target, measure, "no finite measure values"));
        }

        if !has_mass(&parent, &measure_key) || !has_mass(&subset, &measure_key) {
            return Ok(self.skip(target, measure, "zero mass"));
        }

        let group_keys = [target.fid.clone()];
        let pair = normalize_with_parent(
            &subset,
            &parent,
            &group_keys,
            std::slice::from_ref(&measure_key),
            NormalizationMode::Independent,
        );
        let normalized_subset = finite_rows(pair.subset, &measure_key);
        let normalized_parent = finite_rows(pair.parent, &measure_key);
        if normalized_subset.is_empty() || normalized_parent.is_empty() {
            return Ok(self.skip(target, measure, "normalization left no finite rows"));
        }

        let score = compare_distributions(
            &normalized_subset,
            &normalized_parent,
            &group_keys,
            &measure_key,
        );
        if !score.is_finite() {
            return Ok(self.skip(target, measure, "non-finite score"));
        }

        let shown = score.to_string();
        log_event_with_fields(
            Event::CandidateEmitted,
            &[
                ("measure", measure.fid.as_str()),
                ("score", shown.as_str()),
                ("target", target.fid.as_str()),
            ],
        );

        Ok(Some(ExplanationCandidate {
            score,
            measure_key,
            measure_field: measure.clone(),
            target_field: target.clone(),
            normalized_subset,
            normalized_parent,
        }))
    }

    fn skip(&self, target: &Field, measure: &Field, reason: &str) -> Option<ExplanationCandidate> {
        self.ctx.metrics().increment_candidates_skipped();
        log_event_with_fields(
            Event::CandidateSkipped,
            &[
                ("measure", measure.fid.as_str()),
                ("reason", reason),
                ("target", target.fid.as_str()),
            ],
        );
        None
    }
}

fn finite_rows(rows: Vec<Row>, measure_key: &str) -> Vec<Row> {
    rows.into_iter()
        .filter(|row| finite_field(row, measure_key).is_some())
        .collect()
}

/// True when the total absolute mass is positive and finite
fn has_mass(rows: &[Row], measure_key: &str) -> bool {
    let total: f64 = rows
        .iter()
        .filter_map(|row| finite_field(row, measure_key))
        .map(f64::abs)
        .sum();
    total > 0.0 && total.is_finite()
}
