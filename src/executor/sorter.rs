//! Row sorting for workflow execution
//!
//! Sort is stable and deterministic: ties keep their prior order, and
//! sorting an already sorted collection changes nothing.

use std::cmp::Ordering;

use super::value::{compare_values, Row};
use crate::workflow::SortOrder;

/// Sorts result rows
pub struct ResultSorter;

impl ResultSorter {
    /// Sorts rows by each field in turn, in the given direction.
    pub fn sort(rows: &mut [Row], by: &[String], order: SortOrder) {
        rows.sort_by(|a, b| {
            let ordering = Self::compare_rows(a, b, by);
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
    }

    fn compare_rows(a: &Row, b: &Row, by: &[String]) -> Ordering {
        by.iter()
            .map(|field| compare_values(a.get(field), b.get(field)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}
