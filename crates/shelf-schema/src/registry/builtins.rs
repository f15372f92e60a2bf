//! Built-in template sets, one per content category
//!
//! Templates only change with code. The subject id template is always
//! first so that bootstrapping creates the identity column before anything else.

use crate::category::ContentCategory;
use crate::field::FieldKey;
use crate::template::{FieldTemplate, SelectOption};

/// Template count per category, in `ContentCategory::ALL` order.
pub const BUILTIN_COUNTS: [usize; 4] = [18, 18, 15, 16];

fn status_template(category: ContentCategory) -> FieldTemplate {
    let options = category
        .status_options()
        .iter()
        .map(|opt| SelectOption::new(opt.name, opt.color_index))
        .collect();
    FieldTemplate::single_select(FieldKey::MyStatus, "My Status", options)
}

fn leading_templates(category: ContentCategory) -> Vec<FieldTemplate> {
    vec![
        FieldTemplate::text(FieldKey::SubjectId, "Subject ID"),
        FieldTemplate::text(FieldKey::Title, "Title"),
        status_template(category),
        FieldTemplate::rating(FieldKey::MyRating, "My Rating", 1.0, 5.0, "0"),
        FieldTemplate::text(FieldKey::MyTags, "My Tags"),
        FieldTemplate::long_text(FieldKey::MyComment, "My Comment"),
        FieldTemplate::date_time(FieldKey::MarkedAt, "Marked At"),
    ]
}

fn trailing_templates() -> Vec<FieldTemplate> {
    vec![
        FieldTemplate::rating(FieldKey::AverageRating, "Rating", 0.0, 10.0, "0.0"),
        FieldTemplate::url(FieldKey::SubjectUrl, "Subject URL"),
        FieldTemplate::url(FieldKey::CoverUrl, "Cover"),
        FieldTemplate::date_time(FieldKey::SyncedAt, "Synced At"),
    ]
}

fn specific_templates(category: ContentCategory) -> Vec<FieldTemplate> {
    match category {
        ContentCategory::Book => vec![
            FieldTemplate::text(FieldKey::OriginalTitle, "Original Title"),
            FieldTemplate::text(FieldKey::Author, "Author"),
            FieldTemplate::text(FieldKey::Translator, "Translator"),
            FieldTemplate::text(FieldKey::Publisher, "Publisher"),
            FieldTemplate::text(FieldKey::PublishDate, "Publish Date"),
            FieldTemplate::text(FieldKey::Isbn, "ISBN"),
            FieldTemplate::number(FieldKey::Pages, "Pages", "0"),
        ],
        ContentCategory::Movie => vec![
            FieldTemplate::text(FieldKey::OriginalTitle, "Original Title"),
            FieldTemplate::text(FieldKey::Director, "Director"),
            FieldTemplate::text(FieldKey::Cast, "Cast"),
            FieldTemplate::text(FieldKey::Genre, "Genre"),
            FieldTemplate::text(FieldKey::Country, "Country"),
            FieldTemplate::text(FieldKey::ReleaseDate, "Release Date"),
            FieldTemplate::text(FieldKey::Duration, "Duration"),
        ],
        ContentCategory::Music => vec![
            FieldTemplate::text(FieldKey::Artist, "Artist"),
            FieldTemplate::text(FieldKey::Label, "Label"),
            FieldTemplate::text(FieldKey::Genre, "Genre"),
            FieldTemplate::text(FieldKey::ReleaseDate, "Release Date"),
        ],
        ContentCategory::Game => vec![
            FieldTemplate::text(FieldKey::Developer, "Developer"),
            FieldTemplate::text(FieldKey::Publisher, "Publisher"),
            FieldTemplate::text(FieldKey::Platform, "Platform"),
            FieldTemplate::text(FieldKey::Genre, "Genre"),
            FieldTemplate::text(FieldKey::ReleaseDate, "Release Date"),
        ],
    }
}

/// Returns the full ordered template set for a category.
pub fn builtin_templates(category: ContentCategory) -> Vec<FieldTemplate> {
    let mut templates = leading_templates(category);
    templates.extend(specific_templates(category));
    templates.extend(trailing_templates());
    templates
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_counts() {
        for (category, expected) in ContentCategory::ALL.iter().zip(BUILTIN_COUNTS) {
            assert_eq!(builtin_templates(*category).len(), expected, "{category}");
        }
    }

    #[test]
    fn test_subject_id_comes_first() {
        for category in ContentCategory::ALL {
            assert_eq!(builtin_templates(category)[0].key, FieldKey::SubjectId);
        }
    }

    #[test]
    fn test_no_duplicate_keys_or_names() {
        for category in ContentCategory::ALL {
            let templates = builtin_templates(category);
            let keys: HashSet<_> = templates.iter().map(|t| t.key).collect();
            let names: HashSet<_> = templates.iter().map(|t| t.name.as_str()).collect();
            assert_eq!(keys.len(), templates.len(), "duplicate key in {category}");
            assert_eq!(names.len(), templates.len(), "duplicate name in {category}");
        }
    }
}
