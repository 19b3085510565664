//! Test doubles for the catalog and messaging seams
//!
//! Available to this crate's tests and, through the `test-support` feature,
//! to the sweep and bot crates.

use crate::catalog::{ArtistInfo, Catalog, CatalogError};
use crate::context::{RadarContext, RadarSettings};
use crate::db::{self, RecipientId};
use crate::messaging::{LinkButton, Media, Messenger, TextFormat, TransportError};
use crate::release::{ReleaseCandidate, ReleaseCategory};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Single-connection in-memory database with the schema applied
///
/// One connection only: every `sqlite::memory:` connection is its own database.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    db::create_tables(&pool)
        .await
        .expect("Schema initialization failed");
    pool
}

/// Context over an in-memory database with zero delays and market "IT"
pub async fn fake_context(catalog: Arc<FakeCatalog>, messenger: Arc<FakeMessenger>) -> RadarContext {
    let settings = RadarSettings {
        market: "IT".to_string(),
        catalog_retry_delay: Duration::ZERO,
        send_pacing: Duration::ZERO,
        latest_pacing: Duration::ZERO,
    };
    RadarContext::new(memory_pool().await, catalog, messenger, settings)
}

/// Release candidate with a cover and one artist
pub fn candidate(id: &str, name: &str, date: &str, category: ReleaseCategory) -> ReleaseCandidate {
    ReleaseCandidate {
        id: id.to_string(),
        name: name.to_string(),
        release_date: date.to_string(),
        category,
        artists: vec!["Test Artist".to_string()],
        cover_url: Some(format!("https://covers.example/{}.jpg", id)),
        external_url: format!("https://open.spotify.com/album/{}", id),
    }
}

type LatestKey = (String, ReleaseCategory, Option<String>);

#[derive(Default)]
struct CatalogState {
    latest: HashMap<LatestKey, ReleaseCandidate>,
    artist_names: HashMap<String, String>,
    rejected: HashSet<String>,
    rejected_latest: HashSet<(String, ReleaseCategory)>,
    transient_failures: usize,
    latest_calls: Vec<LatestKey>,
    bulk_lookup_sizes: Vec<usize>,
}

/// Scriptable in-memory catalog
#[derive(Default)]
pub struct FakeCatalog {
    state: Mutex<CatalogState>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest release returned regardless of market (unless a market-specific one is set)
    pub fn set_latest(&self, artist_id: &str, category: ReleaseCategory, release: ReleaseCandidate) {
        let mut state = self.state.lock().unwrap();
        state.latest.insert((artist_id.to_string(), category, None), release);
    }

    /// Latest release returned only for queries scoped to `market`
    pub fn set_latest_in_market(
        &self,
        artist_id: &str,
        category: ReleaseCategory,
        market: &str,
        release: ReleaseCandidate,
    ) {
        let mut state = self.state.lock().unwrap();
        state
            .latest
            .insert((artist_id.to_string(), category, Some(market.to_string())), release);
    }

    /// Forget the latest release (upstream returns no items)
    pub fn clear_latest(&self, artist_id: &str, category: ReleaseCategory) {
        let mut state = self.state.lock().unwrap();
        state.latest.retain(|(id, cat, _), _| !(id == artist_id && *cat == category));
    }

    pub fn set_artist_name(&self, artist_id: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.artist_names.insert(artist_id.to_string(), name.to_string());
    }

    /// Every request about this artist is permanently rejected (404)
    pub fn reject_artist(&self, artist_id: &str) {
        self.state.lock().unwrap().rejected.insert(artist_id.to_string());
    }

    /// Latest-release requests for one category of this artist are rejected (403)
    pub fn reject_latest(&self, artist_id: &str, category: ReleaseCategory) {
        let mut state = self.state.lock().unwrap();
        state.rejected_latest.insert((artist_id.to_string(), category));
    }

    /// Undo [`FakeCatalog::reject_latest`]
    pub fn allow_latest(&self, artist_id: &str, category: ReleaseCategory) {
        let mut state = self.state.lock().unwrap();
        state.rejected_latest.remove(&(artist_id.to_string(), category));
    }

    /// The next `count` latest-release or release-detail requests fail transiently
    pub fn fail_transiently(&self, count: usize) {
        self.state.lock().unwrap().transient_failures = count;
    }

    /// (artist, category, market) of every latest-release request, in order
    pub fn latest_calls(&self) -> Vec<LatestKey> {
        self.state.lock().unwrap().latest_calls.clone()
    }

    /// Number of ids in each bulk artist request
    pub fn bulk_lookup_sizes(&self) -> Vec<usize> {
        self.state.lock().unwrap().bulk_lookup_sizes.clone()
    }

    fn not_found(id: &str) -> CatalogError {
        CatalogError::Rejected {
            status: 404,
            message: format!("non existing id: {}", id),
        }
    }

    fn info(state: &CatalogState, artist_id: &str) -> ArtistInfo {
        ArtistInfo {
            id: artist_id.to_string(),
            name: state
                .artist_names
                .get(artist_id)
                .cloned()
                .unwrap_or_else(|| artist_id.to_string()),
            external_url: format!("https://open.spotify.com/artist/{}", artist_id),
        }
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn latest_release(
        &self,
        artist_id: &str,
        category: ReleaseCategory,
        market: Option<&str>,
    ) -> Result<Option<ReleaseCandidate>, CatalogError> {
        let mut state = self.state.lock().unwrap();
        state
            .latest_calls
            .push((artist_id.to_string(), category, market.map(str::to_string)));

        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(CatalogError::Transient {
                reason: "simulated outage".to_string(),
                retry_after: None,
            });
        }
        if state.rejected.contains(artist_id) {
            return Err(Self::not_found(artist_id));
        }
        if state.rejected_latest.contains(&(artist_id.to_string(), category)) {
            return Err(CatalogError::Rejected {
                status: 403,
                message: format!("{} releases of {} unavailable", category, artist_id),
            });
        }

        let scoped = market.and_then(|m| {
            state
                .latest
                .get(&(artist_id.to_string(), category, Some(m.to_string())))
        });
        let any = state.latest.get(&(artist_id.to_string(), category, None));
        Ok(scoped.or(any).cloned())
    }

    async fn artist(&self, artist_id: &str) -> Result<ArtistInfo, CatalogError> {
        let state = self.state.lock().unwrap();
        if state.rejected.contains(artist_id) {
            return Err(Self::not_found(artist_id));
        }
        Ok(Self::info(&state, artist_id))
    }

    async fn artists(&self, artist_ids: &[String]) -> Result<Vec<ArtistInfo>, CatalogError> {
        let mut state = self.state.lock().unwrap();
        state.bulk_lookup_sizes.push(artist_ids.len());
        Ok(artist_ids
            .iter()
            .filter(|id| !state.rejected.contains(*id))
            .map(|id| Self::info(&state, id))
            .collect())
    }

    async fn release(&self, release_id: &str) -> Result<ReleaseCandidate, CatalogError> {
        let mut state = self.state.lock().unwrap();
        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(CatalogError::Transient {
                reason: "simulated outage".to_string(),
                retry_after: None,
            });
        }
        state
            .latest
            .values()
            .find(|release| release.id == release_id)
            .cloned()
            .ok_or_else(|| Self::not_found(release_id))
    }
}

/// Failure a [`FakeMessenger`] returns instead of delivering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedFailure {
    RetryAfter(Duration),
    Rejected(i64, String),
}

impl From<ScriptedFailure> for TransportError {
    fn from(failure: ScriptedFailure) -> Self {
        match failure {
            ScriptedFailure::RetryAfter(wait) => TransportError::RetryAfter(wait),
            ScriptedFailure::Rejected(code, description) => TransportError::Rejected { code, description },
        }
    }
}

/// A delivered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        recipient: RecipientId,
        text: String,
        format: TextFormat,
    },
    Photo {
        recipient: RecipientId,
        media: Media,
        caption: String,
        link: Option<LinkButton>,
    },
}

impl Sent {
    pub fn recipient(&self) -> RecipientId {
        match self {
            Sent::Text { recipient, .. } | Sent::Photo { recipient, .. } => *recipient,
        }
    }
}

#[derive(Default)]
struct MessengerState {
    sent: Vec<Sent>,
    attempts: usize,
    failures: HashMap<RecipientId, VecDeque<ScriptedFailure>>,
    next_handle: usize,
}

/// Recording messenger with scriptable per-recipient failures
#[derive(Default)]
pub struct FakeMessenger {
    state: Mutex<MessengerState>,
}

impl FakeMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure for the next send to `recipient`
    pub fn fail_next(&self, recipient: RecipientId, failure: ScriptedFailure) {
        let mut state = self.state.lock().unwrap();
        state.failures.entry(recipient).or_default().push_back(failure);
    }

    /// Delivered messages, in order
    pub fn sent(&self) -> Vec<Sent> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Delivered texts, in order
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Text { text, .. } => Some(text),
                Sent::Photo { .. } => None,
            })
            .collect()
    }

    /// Send attempts, including failed ones
    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }

    fn attempt(&self, recipient: RecipientId) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.attempts += 1;
        match state.failures.get_mut(&recipient).and_then(VecDeque::pop_front) {
            Some(failure) => Err(failure.into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn send_text(
        &self,
        recipient: RecipientId,
        text: &str,
        format: TextFormat,
    ) -> Result<(), TransportError> {
        self.attempt(recipient)?;
        self.state.lock().unwrap().sent.push(Sent::Text {
            recipient,
            text: text.to_string(),
            format,
        });
        Ok(())
    }

    async fn send_photo(
        &self,
        recipient: RecipientId,
        media: &Media,
        caption: &str,
        link: Option<&LinkButton>,
    ) -> Result<String, TransportError> {
        self.attempt(recipient)?;
        let mut state = self.state.lock().unwrap();
        state.sent.push(Sent::Photo {
            recipient,
            media: media.clone(),
            caption: caption.to_string(),
            link: link.cloned(),
        });
        // Reused handles come back unchanged, like the real platform
        let handle = match media {
            Media::Handle(handle) => handle.clone(),
            Media::Url(_) => {
                state.next_handle += 1;
                format!("file-{}", state.next_handle)
            }
        };
        Ok(handle)
    }
}
