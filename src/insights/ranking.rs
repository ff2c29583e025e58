//! Deterministic candidate ordering

use std::cmp::Ordering;

use super::explain::ExplanationCandidate;

/// Orders candidates by score (descending), then target fid, then measure fid.
///
/// Candidates with non-finite scores are dropped.
pub fn rank_candidates(mut candidates: Vec<ExplanationCandidate>) -> Vec<ExplanationCandidate> {
    candidates.retain(|c| c.score.is_finite());
    candidates.sort_by(compare_candidates);
    candidates
}

fn compare_candidates(a: &ExplanationCandidate, b: &ExplanationCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.target_field.fid.cmp(&b.target_field.fid))
        .then_with(|| a.measure_field.fid.cmp(&b.measure_field.fid))
}
