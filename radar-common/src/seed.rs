//! Baseline state for newly tracked artists
//!
//! Seeding records the artist's current latest single and album without
//! notifying anyone, so the next sweep only reports what appears afterwards.

use crate::context::RadarContext;
use crate::db::artists;
use crate::release::ReleaseCategory;
use crate::Result;
use tracing::{debug, info};

/// Whether a seeding call created the row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded,
    AlreadyTracked,
}

/// Seed the artist's state row from region-scoped fetches
///
/// A row created concurrently by another writer wins; this call then
/// reports [`SeedOutcome::AlreadyTracked`] and changes nothing.
pub async fn seed_artist(ctx: &RadarContext, artist_id: &str) -> Result<SeedOutcome> {
    let single = ctx.fetch_latest(artist_id, ReleaseCategory::Single, true).await?;
    let album = ctx.fetch_latest(artist_id, ReleaseCategory::Album, true).await?;

    if artists::insert_artist(&ctx.db, artist_id, &single, &album).await? {
        info!(
            artist_id = %artist_id,
            single = %single.id,
            single_date = %single.release_date,
            album = %album.id,
            album_date = %album.release_date,
            "Artist is now tracked"
        );
        Ok(SeedOutcome::Seeded)
    } else {
        debug!(artist_id = %artist_id, "Artist already tracked, seed discarded");
        Ok(SeedOutcome::AlreadyTracked)
    }
}
