//! Field metadata for chart datasets
//!
//! A dataset is described by a flat list of fields. Each field carries:
//! - A stable identifier (`fid`) unique within the dataset
//! - A semantic type (quantitative, nominal, ordinal, temporal)
//! - An analytic role (dimension or measure)
//! - An optional aggregation and computed-field expression
//!
//! Fields are immutable once resolved for a dataset version.

mod types;

pub use types::{aggregation_key, Aggregation, AnalyticType, Field, SemanticType};
