//! Locating an existing column for a template

use std::collections::BTreeSet;

use shelf_schema::{FieldKind, FieldTemplate};

use crate::config::MatcherKind;
use crate::destination::Column;

/// A column chosen for a template, with the matcher's confidence in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnMatch<'a> {
    pub column: &'a Column,
    pub confidence: f64,
}

impl ColumnMatch<'_> {
    pub fn is_exact(&self) -> bool {
        self.confidence >= 1.0
    }
}

pub trait FieldMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn find<'a>(&self, template: &FieldTemplate, columns: &'a [Column]) -> Option<ColumnMatch<'a>>;
}

/// Case-sensitive equality on the logical column name.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactNameMatcher;

impl FieldMatcher for ExactNameMatcher {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn find<'a>(&self, template: &FieldTemplate, columns: &'a [Column]) -> Option<ColumnMatch<'a>> {
        columns
            .iter()
            .find(|c| c.name == template.name)
            .map(|column| ColumnMatch {
                column,
                confidence: 1.0,
            })
    }
}

/// Legacy heuristic matcher tolerating renamed columns.
///
/// Combines normalized-name equality, keyword overlap and edit distance,
/// scaled by how compatible the column's type is with the template.
#[derive(Debug, Clone, Copy)]
pub struct ScoredMatcher {
    threshold: f64,
}

impl ScoredMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Confidence that `column` holds `template`'s data.
    pub fn score(&self, template: &FieldTemplate, column: &Column) -> f64 {
        if column.name == template.name {
            return type_factor(template.kind, column.kind());
        }

        let wanted = normalize(&template.name);
        let found = normalize(&column.name);
        let name_score = if !wanted.is_empty() && wanted == found {
            0.95
        } else {
            let edit = strsim::normalized_levenshtein(&wanted, &found);
            let overlap = keyword_overlap(&template.name, &column.name);
            0.6 * edit + 0.4 * overlap
        };

        name_score * type_factor(template.kind, column.kind())
    }
}

impl Default for ScoredMatcher {
    fn default() -> Self {
        Self::new(0.7)
    }
}

impl FieldMatcher for ScoredMatcher {
    fn name(&self) -> &'static str {
        "scored"
    }

    fn find<'a>(&self, template: &FieldTemplate, columns: &'a [Column]) -> Option<ColumnMatch<'a>> {
        let mut best: Option<ColumnMatch<'a>> = None;
        for column in columns {
            let confidence = self.score(template, column);
            if confidence < self.threshold {
                continue;
            }
            if best.is_none_or(|b| confidence > b.confidence) {
                best = Some(ColumnMatch { column, confidence });
            }
        }
        best
    }
}

/// Matcher selected by configuration.
pub fn matcher_for(kind: MatcherKind, threshold: f64) -> Box<dyn FieldMatcher> {
    match kind {
        MatcherKind::Exact => Box::new(ExactNameMatcher),
        MatcherKind::Scored => Box::new(ScoredMatcher::new(threshold)),
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn keywords(name: &str) -> BTreeSet<String> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard similarity of the word sets.
fn keyword_overlap(a: &str, b: &str) -> f64 {
    let a = keywords(a);
    let b = keywords(b);
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

fn type_factor(wanted: FieldKind, found: Option<FieldKind>) -> f64 {
    match found {
        Some(kind) if kind == wanted => 1.0,
        // Text can carry urls and option names without data loss
        Some(FieldKind::Text) if matches!(wanted, FieldKind::Url | FieldKind::SingleSelect) => 0.8,
        _ => 0.5,
    }
}
