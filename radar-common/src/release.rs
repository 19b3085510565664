//! Release models and normalization
//!
//! A [`ReleaseCandidate`] is what the catalog reports as the most recent
//! release of one category for one artist. Dates are always carried as
//! full `YYYY-MM-DD` strings, whatever precision upstream reported.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date used for "no release" and for unset stored dates
pub const EPOCH_DATE: &str = "1910-01-01";

/// Release category, tracked independently per artist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseCategory {
    Single,
    Album,
}

impl ReleaseCategory {
    pub const ALL: [ReleaseCategory; 2] = [ReleaseCategory::Single, ReleaseCategory::Album];

    /// Catalog API name (`include_groups` value)
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseCategory::Single => "single",
            ReleaseCategory::Album => "album",
        }
    }

    /// Capitalized tag used in notifications ("Single", "Album")
    pub fn tag(&self) -> &'static str {
        match self {
            ReleaseCategory::Single => "Single",
            ReleaseCategory::Album => "Album",
        }
    }
}

impl fmt::Display for ReleaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Precision of an upstream release date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
    Year,
    Month,
    Day,
}

/// Most recent release of one category, as fetched from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseCandidate {
    /// Catalog release id; empty for the sentinel
    pub id: String,
    pub name: String,
    /// Normalized `YYYY-MM-DD`
    pub release_date: String,
    pub category: ReleaseCategory,
    /// Contributing artist names, in catalog order
    pub artists: Vec<String>,
    /// Cover image URL (largest image)
    pub cover_url: Option<String>,
    /// Link to the release on the catalog platform
    pub external_url: String,
}

impl ReleaseCandidate {
    /// "No release found" placeholder
    ///
    /// Its epoch date makes every comparison against stored state total and
    /// never newer than anything already recorded.
    pub fn sentinel(category: ReleaseCategory) -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            release_date: EPOCH_DATE.to_string(),
            category,
            artists: Vec::new(),
            cover_url: None,
            external_url: String::new(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.id.is_empty()
    }

    /// Parsed release date, `None` when the stored string is malformed
    pub fn date(&self) -> Option<NaiveDate> {
        parse_date(&self.release_date)
    }
}

/// Normalize an upstream date to a full `YYYY-MM-DD` calendar date
///
/// Year precision gets `-01-01`, month precision gets `-01`. Without an
/// explicit precision it is inferred from the length (4 = year, 7 = month).
/// The result is truncated to 10 characters.
pub fn normalize_release_date(raw: &str, precision: Option<DatePrecision>) -> String {
    let raw = raw.trim();
    let precision = precision.unwrap_or(match raw.len() {
        4 => DatePrecision::Year,
        7 => DatePrecision::Month,
        _ => DatePrecision::Day,
    });

    let mut date = match precision {
        DatePrecision::Year => format!("{}-01-01", raw),
        DatePrecision::Month => format!("{}-01", raw),
        DatePrecision::Day => raw.to_string(),
    };

    if let Some((idx, _)) = date.char_indices().nth(10) {
        date.truncate(idx);
    }
    date
}

/// Replace typographic double quotes and trim surrounding whitespace
pub fn normalize_release_name(raw: &str) -> String {
    raw.replace(['\u{201C}', '\u{201D}'], "\"").trim().to_string()
}

/// Parse a normalized `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// The epoch as a date
pub fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1910, 1, 1).unwrap_or(NaiveDate::MIN)
}
