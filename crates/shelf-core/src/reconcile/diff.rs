//! Comparison of a live column's configuration against its template

use shelf_schema::{FieldKind, FieldProperty, FieldTemplate};

/// Properties that differ, and the configuration that corrects them.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDiff {
    pub changed: Vec<&'static str>,
    pub corrected: FieldProperty,
}

/// Diff only the properties the template specifies for its kind.
///
/// Select options are merged: template options missing from the column are
/// appended and options the user added are kept. Returns `None` when the
/// column already satisfies the template.
pub fn diff_property(template: &FieldTemplate, live: &FieldProperty) -> Option<PropertyDiff> {
    let wanted = &template.property;
    let mut corrected = live.clone();
    let mut changed = Vec::new();

    match template.kind {
        FieldKind::SingleSelect => {
            let missing: Vec<_> = wanted
                .options
                .iter()
                .filter(|o| !live.options.iter().any(|l| l.name == o.name))
                .cloned()
                .collect();
            if !missing.is_empty() {
                corrected.options.extend(missing);
                changed.push("options");
            }
        }
        FieldKind::Number => {
            if differs(wanted.min, live.min) {
                corrected.min = wanted.min;
                changed.push("min");
            }
            if differs(wanted.max, live.max) {
                corrected.max = wanted.max;
                changed.push("max");
            }
            if wanted.formatter.is_some() && wanted.formatter != live.formatter {
                corrected.formatter.clone_from(&wanted.formatter);
                changed.push("formatter");
            }
        }
        FieldKind::DateTime => {
            if wanted.date_format.is_some() && wanted.date_format != live.date_format {
                corrected.date_format.clone_from(&wanted.date_format);
                changed.push("date_format");
            }
        }
        FieldKind::Text => {
            if wanted.auto_wrap == Some(true) && live.auto_wrap != Some(true) {
                corrected.auto_wrap = Some(true);
                changed.push("auto_wrap");
            }
        }
        FieldKind::Url => {}
    }

    (!changed.is_empty()).then_some(PropertyDiff { changed, corrected })
}

fn differs(wanted: Option<f64>, live: Option<f64>) -> bool {
    match (wanted, live) {
        (Some(w), Some(l)) => (w - l).abs() > f64::EPSILON,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shelf_schema::{FieldKey, SelectOption};

    #[test]
    fn satisfied_column_has_no_diff() {
        let template = FieldTemplate::rating(FieldKey::MyRating, "My Rating", 1.0, 5.0, "0");
        assert_eq!(diff_property(&template, &template.property), None);
    }

    #[test]
    fn numeric_range_is_corrected() {
        let template = FieldTemplate::rating(FieldKey::MyRating, "My Rating", 1.0, 5.0, "0");
        let live = FieldProperty {
            min: Some(0.0),
            max: Some(5.0),
            formatter: Some("0".into()),
            ..FieldProperty::default()
        };

        let diff = diff_property(&template, &live).unwrap();
        assert_eq!(diff.changed, vec!["min"]);
        assert_eq!(diff.corrected.min, Some(1.0));
    }

    #[test]
    fn user_select_options_are_preserved() {
        let template = FieldTemplate::single_select(
            FieldKey::MyStatus,
            "My Status",
            vec![SelectOption::new("Wish", 0), SelectOption::new("Read", 2)],
        );
        let live = FieldProperty {
            options: vec![SelectOption::new("Read", 5), SelectOption::new("Abandoned", 7)],
            ..FieldProperty::default()
        };

        let diff = diff_property(&template, &live).unwrap();
        let names: Vec<_> = diff.corrected.options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Read", "Abandoned", "Wish"]);
        // Existing option colors are the user's choice
        assert_eq!(diff.corrected.options[0].color, 5);
    }

    #[test]
    fn long_text_gains_auto_wrap() {
        let template = FieldTemplate::long_text(FieldKey::MyComment, "My Comment");
        let diff = diff_property(&template, &FieldProperty::default()).unwrap();
        assert_eq!(diff.changed, vec!["auto_wrap"]);
    }
}
