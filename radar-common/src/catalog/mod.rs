//! Catalog client adapter
//!
//! [`Catalog`] is the raw, single-attempt view of the music catalog.
//! [`fetch_latest`] layers the policy the release engine relies on: retry
//! transient failures forever with a fixed delay, replace "no release" with
//! the epoch sentinel, and normalize dates and names.

pub mod spotify;

pub use spotify::SpotifyClient;

use crate::release::{normalize_release_date, normalize_release_name, ReleaseCandidate, ReleaseCategory};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum number of ids per bulk artist lookup
pub const ARTIST_LOOKUP_CHUNK: usize = 50;

/// Catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network failure, throttling, upstream 5xx, expired token
    #[error("Transient catalog failure: {reason}")]
    Transient {
        reason: String,
        retry_after: Option<Duration>,
    },

    /// Permanent rejection, e.g. unknown artist id
    #[error("Catalog rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Artist metadata used for replies and subscription listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistInfo {
    pub id: String,
    pub name: String,
    pub external_url: String,
}

/// Read-only music catalog
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Most recent release of a category, one attempt
    ///
    /// `market` restricts results to a region. `Ok(None)` when the artist has
    /// no release of that category.
    async fn latest_release(
        &self,
        artist_id: &str,
        category: ReleaseCategory,
        market: Option<&str>,
    ) -> Result<Option<ReleaseCandidate>, CatalogError>;

    /// Single artist lookup
    async fn artist(&self, artist_id: &str) -> Result<ArtistInfo, CatalogError>;

    /// Bulk artist lookup, at most [`ARTIST_LOOKUP_CHUNK`] ids; unknown ids are skipped
    async fn artists(&self, artist_ids: &[String]) -> Result<Vec<ArtistInfo>, CatalogError>;

    /// Release details by id
    async fn release(&self, release_id: &str) -> Result<ReleaseCandidate, CatalogError>;
}

/// Fetch the latest release of a category, retrying transient failures
///
/// Never returns a transient error: it keeps retrying every `retry_delay`
/// (or the upstream's requested wait, if longer). Permanent rejections are
/// returned immediately.
pub async fn fetch_latest(
    catalog: &dyn Catalog,
    artist_id: &str,
    category: ReleaseCategory,
    market: Option<&str>,
    retry_delay: Duration,
) -> Result<ReleaseCandidate, CatalogError> {
    let mut attempt: u64 = 0;
    let found = loop {
        attempt += 1;
        match catalog.latest_release(artist_id, category, market).await {
            Ok(found) => break found,
            Err(CatalogError::Transient { reason, retry_after }) => {
                let wait = retry_after.map_or(retry_delay, |after| after.max(retry_delay));
                warn!(
                    artist_id = %artist_id,
                    category = %category,
                    attempt,
                    "Catalog request failed ({}), retrying in {:?}",
                    reason,
                    wait
                );
                tokio::time::sleep(wait).await;
            }
            Err(e) => return Err(e),
        }
    };

    let mut candidate = match found {
        Some(candidate) => candidate,
        None => {
            debug!(artist_id = %artist_id, category = %category, "No release found, using sentinel");
            return Ok(ReleaseCandidate::sentinel(category));
        }
    };

    candidate.category = category;
    candidate.release_date = normalize_release_date(&candidate.release_date, None);
    candidate.name = normalize_release_name(&candidate.name);
    Ok(candidate)
}

/// Release details by id, retrying transient failures like [`fetch_latest`]
pub async fn fetch_release(
    catalog: &dyn Catalog,
    release_id: &str,
    retry_delay: Duration,
) -> Result<ReleaseCandidate, CatalogError> {
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        match catalog.release(release_id).await {
            Err(CatalogError::Transient { reason, retry_after }) => {
                let wait = retry_after.map_or(retry_delay, |after| after.max(retry_delay));
                warn!(
                    release_id = %release_id,
                    attempt,
                    "Catalog request failed ({}), retrying in {:?}",
                    reason,
                    wait
                );
                tokio::time::sleep(wait).await;
            }
            other => return other,
        }
    }
}

/// Look up any number of artists, chunked to the per-request ceiling
pub async fn lookup_artists(
    catalog: &dyn Catalog,
    artist_ids: &[String],
) -> Result<Vec<ArtistInfo>, CatalogError> {
    let mut found = Vec::with_capacity(artist_ids.len());
    for chunk in artist_ids.chunks(ARTIST_LOOKUP_CHUNK) {
        found.extend(catalog.artists(chunk).await?);
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{candidate, FakeCatalog};

    #[tokio::test]
    async fn test_empty_upstream_yields_sentinel() {
        let catalog = FakeCatalog::new();

        let release = fetch_latest(&catalog, "A1", ReleaseCategory::Single, None, Duration::ZERO)
            .await
            .unwrap();

        assert!(release.is_sentinel());
        assert_eq!(release.release_date, "1910-01-01");
        assert_eq!(release.category, ReleaseCategory::Single);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let catalog = FakeCatalog::new();
        catalog.set_latest("A1", ReleaseCategory::Album, candidate("a1", "Album", "2021", ReleaseCategory::Album));
        catalog.fail_transiently(3);

        let release = fetch_latest(&catalog, "A1", ReleaseCategory::Album, None, Duration::from_millis(1))
            .await
            .unwrap();

        assert_eq!(release.id, "a1");
        assert_eq!(release.release_date, "2021-01-01");
        assert_eq!(catalog.latest_calls().len(), 4);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let catalog = FakeCatalog::new();
        catalog.reject_artist("bogus");

        let err = fetch_latest(&catalog, "bogus", ReleaseCategory::Single, None, Duration::ZERO)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Rejected { status: 404, .. }));
        assert_eq!(catalog.latest_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_names_and_market_are_passed_through() {
        let catalog = FakeCatalog::new();
        catalog.set_latest(
            "A1",
            ReleaseCategory::Single,
            candidate("s1", " \u{201C}Hi\u{201D} ", "2020-05", ReleaseCategory::Single),
        );

        let release = fetch_latest(&catalog, "A1", ReleaseCategory::Single, Some("IT"), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(release.name, "\"Hi\"");
        assert_eq!(release.release_date, "2020-05-01");
        assert_eq!(
            catalog.latest_calls(),
            vec![("A1".to_string(), ReleaseCategory::Single, Some("IT".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_release_lookup_retries_transient_failures() {
        let catalog = FakeCatalog::new();
        catalog.set_latest("A1", ReleaseCategory::Single, candidate("s1", "One", "2023-01-10", ReleaseCategory::Single));
        catalog.fail_transiently(2);

        let release = fetch_release(&catalog, "s1", Duration::ZERO).await.unwrap();

        assert_eq!(release.id, "s1");
    }

    #[tokio::test]
    async fn test_release_lookup_returns_rejection() {
        let catalog = FakeCatalog::new();

        let err = fetch_release(&catalog, "missing", Duration::ZERO).await.unwrap_err();

        assert!(matches!(err, CatalogError::Rejected { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_lookup_artists_chunks_requests() {
        let catalog = FakeCatalog::new();
        let ids: Vec<String> = (0..120).map(|i| format!("artist{i}")).collect();
        for id in &ids {
            catalog.set_artist_name(id, &format!("Name of {id}"));
        }

        let found = lookup_artists(&catalog, &ids).await.unwrap();

        assert_eq!(found.len(), 120);
        assert_eq!(catalog.bulk_lookup_sizes(), vec![50, 50, 20]);
    }
}
