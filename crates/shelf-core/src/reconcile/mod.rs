//! Reconciliation of destination columns against field templates

pub mod diff;
pub mod engine;
pub mod matcher;

pub use diff::{PropertyDiff, diff_property};
pub use engine::{
    BatchOutcome, BatchSummary, EnsureOptions, EnsureOutcome, FieldFailure, FieldOperation,
    FieldReconciler,
};
pub use matcher::{ColumnMatch, ExactNameMatcher, FieldMatcher, ScoredMatcher, matcher_for};
