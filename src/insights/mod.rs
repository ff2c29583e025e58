//! Selection explanations
//!
//! Given a selected mark, finds the unused dimensions whose breakdown of the
//! selection differs most from the breakdown of the whole dataset.
//!
//! Flow: selection → predicates → session → engine → (per pair) queries,
//! normalization, divergence → ranking.

mod divergence;
mod errors;
mod explain;
mod normalization;
mod presentation;
mod ranking;
mod selection;
mod session;

pub use divergence::{compare_distributions, jensen_shannon};
pub use errors::{ExplainError, ExplainResult};
pub use explain::{ExplainEngine, ExplainRequest, ExplanationCandidate};
pub use normalization::{normalize_with_parent, NormalizationMode, NormalizedPair};
pub use presentation::{category_name, comparison_rows, CATEGORY_FIELD, SCOPE_FIELD};
pub use ranking::rank_candidates;
pub use selection::{
    build_explain_predicates, build_selection_context, resolve_selection_value,
    selection_signature, SelectionContext,
};
pub use session::{EmptyReason, ExplainSession, ExplainStatus, RequestToken};
