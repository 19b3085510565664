//! Database models

use crate::release::{self, ReleaseCategory};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Messaging platform chat identifier
pub type RecipientId = i64;

/// Last known release of one category for a tracked artist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRelease {
    /// Empty when the artist had no release of this category at seeding
    pub release_id: String,
    pub release_date: Option<NaiveDate>,
    pub release_name: String,
}

impl StoredRelease {
    /// Stored date, with an unset date reading as the epoch
    pub fn effective_date(&self) -> NaiveDate {
        self.release_date.unwrap_or_else(release::epoch)
    }

    pub fn is_empty(&self) -> bool {
        self.release_id.is_empty()
    }
}

/// One row of the artists table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistReleaseState {
    pub artist_id: String,
    pub last_single: StoredRelease,
    pub last_album: StoredRelease,
}

impl ArtistReleaseState {
    pub fn get(&self, category: ReleaseCategory) -> &StoredRelease {
        match category {
            ReleaseCategory::Single => &self.last_single,
            ReleaseCategory::Album => &self.last_album,
        }
    }
}
