//! Content categories and their reading/watching status options

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Category of a catalog subject.
///
/// Each category is synchronized into its own destination table and has
/// its own template set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Book,
    Movie,
    Music,
    Game,
}

/// One entry of a category's status enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusOption {
    /// Stable code used by the content source (e.g. "wish", "collect")
    pub code: &'static str,
    /// Option name written to the destination select column
    pub name: &'static str,
    /// Color index of the select option
    pub color_index: u8,
}

const BOOK_STATUS: &[StatusOption] = &[
    StatusOption { code: "wish", name: "Want to Read", color_index: 0 },
    StatusOption { code: "do", name: "Reading", color_index: 1 },
    StatusOption { code: "collect", name: "Read", color_index: 2 },
];

// Movies and music only distinguish "wanted" from "done".
const MOVIE_STATUS: &[StatusOption] = &[
    StatusOption { code: "wish", name: "Want to Watch", color_index: 0 },
    StatusOption { code: "collect", name: "Watched", color_index: 2 },
];

const MUSIC_STATUS: &[StatusOption] = &[
    StatusOption { code: "wish", name: "Want to Listen", color_index: 0 },
    StatusOption { code: "collect", name: "Listened", color_index: 2 },
];

const GAME_STATUS: &[StatusOption] = &[
    StatusOption { code: "wish", name: "Want to Play", color_index: 0 },
    StatusOption { code: "do", name: "Playing", color_index: 1 },
    StatusOption { code: "collect", name: "Played", color_index: 2 },
];

impl ContentCategory {
    /// All categories in a fixed order.
    pub const ALL: [ContentCategory; 4] = [
        ContentCategory::Book,
        ContentCategory::Movie,
        ContentCategory::Music,
        ContentCategory::Game,
    ];

    /// Lowercase identifier used in configuration and persisted bindings.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Book => "book",
            ContentCategory::Movie => "movie",
            ContentCategory::Music => "music",
            ContentCategory::Game => "game",
        }
    }

    /// Ordered status options for this category.
    pub fn status_options(&self) -> &'static [StatusOption] {
        match self {
            ContentCategory::Book => BOOK_STATUS,
            ContentCategory::Movie => MOVIE_STATUS,
            ContentCategory::Music => MUSIC_STATUS,
            ContentCategory::Game => GAME_STATUS,
        }
    }

    /// Resolve a status code or display name to its option.
    pub fn status_option(&self, code_or_name: &str) -> Option<&'static StatusOption> {
        let needle = code_or_name.trim();
        self.status_options()
            .iter()
            .find(|opt| opt.code.eq_ignore_ascii_case(needle) || opt.name == needle)
    }
}

impl FromStr for ContentCategory {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "book" | "books" => Ok(ContentCategory::Book),
            "movie" | "movies" => Ok(ContentCategory::Movie),
            "music" => Ok(ContentCategory::Music),
            "game" | "games" => Ok(ContentCategory::Game),
            _ => Err(Error::UnsupportedCategory {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
