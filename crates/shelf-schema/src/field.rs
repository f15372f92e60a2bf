//! Abstract field keys
//!
//! A field key names a content attribute independently of how the
//! destination table calls its column. Bindings map keys to column ids.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Closed set of abstract content attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    SubjectId,
    Title,
    OriginalTitle,
    MyStatus,
    MyRating,
    MyTags,
    MyComment,
    MarkedAt,
    SubjectUrl,
    CoverUrl,
    AverageRating,
    Author,
    Translator,
    Publisher,
    PublishDate,
    Isbn,
    Pages,
    Director,
    Cast,
    Genre,
    Country,
    ReleaseDate,
    Duration,
    Artist,
    Label,
    Developer,
    Platform,
    SyncedAt,
}

impl FieldKey {
    pub const ALL: [FieldKey; 28] = [
        FieldKey::SubjectId,
        FieldKey::Title,
        FieldKey::OriginalTitle,
        FieldKey::MyStatus,
        FieldKey::MyRating,
        FieldKey::MyTags,
        FieldKey::MyComment,
        FieldKey::MarkedAt,
        FieldKey::SubjectUrl,
        FieldKey::CoverUrl,
        FieldKey::AverageRating,
        FieldKey::Author,
        FieldKey::Translator,
        FieldKey::Publisher,
        FieldKey::PublishDate,
        FieldKey::Isbn,
        FieldKey::Pages,
        FieldKey::Director,
        FieldKey::Cast,
        FieldKey::Genre,
        FieldKey::Country,
        FieldKey::ReleaseDate,
        FieldKey::Duration,
        FieldKey::Artist,
        FieldKey::Label,
        FieldKey::Developer,
        FieldKey::Platform,
        FieldKey::SyncedAt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::SubjectId => "subject_id",
            FieldKey::Title => "title",
            FieldKey::OriginalTitle => "original_title",
            FieldKey::MyStatus => "my_status",
            FieldKey::MyRating => "my_rating",
            FieldKey::MyTags => "my_tags",
            FieldKey::MyComment => "my_comment",
            FieldKey::MarkedAt => "marked_at",
            FieldKey::SubjectUrl => "subject_url",
            FieldKey::CoverUrl => "cover_url",
            FieldKey::AverageRating => "average_rating",
            FieldKey::Author => "author",
            FieldKey::Translator => "translator",
            FieldKey::Publisher => "publisher",
            FieldKey::PublishDate => "publish_date",
            FieldKey::Isbn => "isbn",
            FieldKey::Pages => "pages",
            FieldKey::Director => "director",
            FieldKey::Cast => "cast",
            FieldKey::Genre => "genre",
            FieldKey::Country => "country",
            FieldKey::ReleaseDate => "release_date",
            FieldKey::Duration => "duration",
            FieldKey::Artist => "artist",
            FieldKey::Label => "label",
            FieldKey::Developer => "developer",
            FieldKey::Platform => "platform",
            FieldKey::SyncedAt => "synced_at",
        }
    }

    /// Bookkeeping keys written by the engine itself.
    ///
    /// Metadata keys never take part in change detection.
    pub fn is_metadata(&self) -> bool {
        matches!(self, FieldKey::SyncedAt)
    }

    /// The key correlating a content record with a destination record.
    pub fn is_identity(&self) -> bool {
        matches!(self, FieldKey::SubjectId)
    }
}

impl FromStr for FieldKey {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let needle = s.trim();
        FieldKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == needle)
            .ok_or_else(|| Error::UnsupportedField {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
