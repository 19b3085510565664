//! Release differ
//!
//! Decides, per artist and per category, whether the catalog's latest
//! release is genuinely new compared to the stored state, and records it
//! exactly once when it is.
//!
//! A candidate is new only when all of these hold:
//! - its id differs from the stored id
//! - its name differs from the stored name (same name under a new id is a
//!   reissue or metadata churn)
//! - its date is strictly after the stored date (unset reads as 1910-01-01)

use radar_common::db::{artists, subscriptions, StoredRelease};
use radar_common::seed::{seed_artist, SeedOutcome};
use radar_common::{Error, RadarContext, ReleaseCandidate, ReleaseCategory, Result};
use tracing::{debug, error, info, warn};

/// Why a candidate was or was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    New,
    /// Same id, or same name under a different id
    Unchanged,
    /// Different release, but not dated after the stored one
    NotNewer,
}

/// Compare a fetched candidate with the stored release of its category
pub fn judge(stored: &StoredRelease, candidate: &ReleaseCandidate) -> Verdict {
    if candidate.id == stored.release_id || candidate.name == stored.release_name {
        return Verdict::Unchanged;
    }

    match candidate.date() {
        Some(date) if date > stored.effective_date() => Verdict::New,
        Some(_) => Verdict::NotNewer,
        None => {
            warn!(
                release_id = %candidate.id,
                date = %candidate.release_date,
                "Candidate has an unparseable release date"
            );
            Verdict::NotNewer
        }
    }
}

/// Outcome of evaluating one artist
#[derive(Debug, Default)]
pub struct Evaluation {
    /// The artist had no state and was seeded (never comes with events)
    pub seeded: bool,
    pub single: Option<ReleaseCandidate>,
    pub album: Option<ReleaseCandidate>,
    /// State writes that failed; releases of other categories still stand
    pub write_failures: Vec<Error>,
}

impl Evaluation {
    /// New releases found, singles first
    pub fn events(&self) -> impl Iterator<Item = &ReleaseCandidate> {
        self.single.iter().chain(self.album.iter())
    }

    fn set(&mut self, release: ReleaseCandidate) {
        match release.category {
            ReleaseCategory::Single => self.single = Some(release),
            ReleaseCategory::Album => self.album = Some(release),
        }
    }
}

/// Evaluate one artist against the catalog
///
/// Untracked artists with subscribers are seeded without events. Otherwise
/// both categories are fetched without region scope before anything is
/// written, so a failed fetch leaves the stored state untouched. Each new
/// release is then persisted with a compare-and-set write; a write that lost
/// a race with another writer yields no event, and a write that failed is
/// reported in [`Evaluation::write_failures`] without discarding the other
/// category's event.
pub async fn evaluate(ctx: &RadarContext, artist_id: &str) -> Result<Evaluation> {
    let Some(state) = artists::load_artist(&ctx.db, artist_id).await? else {
        if subscriptions::count_for_artist(&ctx.db, artist_id).await? == 0 {
            debug!(artist_id = %artist_id, "Artist untracked since listing, skipping");
            return Ok(Evaluation::default());
        }
        let outcome = seed_artist(ctx, artist_id).await?;
        return Ok(Evaluation {
            seeded: outcome == SeedOutcome::Seeded,
            ..Evaluation::default()
        });
    };

    let mut candidates = Vec::with_capacity(ReleaseCategory::ALL.len());
    for category in ReleaseCategory::ALL {
        candidates.push(ctx.fetch_latest(artist_id, category, false).await?);
    }

    let mut evaluation = Evaluation::default();

    for candidate in candidates {
        let category = candidate.category;
        let stored = state.get(category);

        match judge(stored, &candidate) {
            Verdict::New => {}
            verdict => {
                debug!(artist_id = %artist_id, category = %category, ?verdict, "No new release");
                continue;
            }
        }

        let applied = match artists::update_release(&ctx.db, artist_id, stored, &candidate).await {
            Ok(applied) => applied,
            Err(e) => {
                error!(artist_id = %artist_id, category = %category, "Failed to record release: {}", e);
                evaluation.write_failures.push(e);
                continue;
            }
        };
        if !applied {
            warn!(
                artist_id = %artist_id,
                category = %category,
                "State changed concurrently, dropping release {}",
                candidate.id
            );
            continue;
        }

        info!(
            artist_id = %artist_id,
            category = %category,
            release_id = %candidate.id,
            date = %candidate.release_date,
            "New {} found: {} - {}",
            category,
            candidate.artists.first().map(String::as_str).unwrap_or("Unknown"),
            candidate.name
        );
        evaluation.set(candidate);
    }

    Ok(evaluation)
}
