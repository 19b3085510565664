//! Explicitly passed process context
//!
//! Bundles the store handle, catalog client and messaging transport so the
//! release engine never reaches for globals.

use crate::catalog::{self, Catalog, CatalogError};
use crate::config::RadarConfig;
use crate::messaging::Messenger;
use crate::release::{ReleaseCandidate, ReleaseCategory};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Tunables of the release engine
#[derive(Debug, Clone)]
pub struct RadarSettings {
    /// Region used for scoped fetches at seeding time
    pub market: String,
    /// Fixed delay between catalog retries
    pub catalog_retry_delay: Duration,
    /// Delay between consecutive sends of a fan-out
    pub send_pacing: Duration,
    /// Delay between the two replies of a "latest" request
    pub latest_pacing: Duration,
}

impl Default for RadarSettings {
    fn default() -> Self {
        Self {
            market: crate::config::DEFAULT_MARKET.to_string(),
            catalog_retry_delay: Duration::from_millis(crate::config::DEFAULT_CATALOG_RETRY_DELAY_MS),
            send_pacing: Duration::from_millis(crate::config::DEFAULT_SEND_PACING_MS),
            latest_pacing: Duration::from_millis(crate::config::DEFAULT_LATEST_PACING_MS),
        }
    }
}

impl From<&RadarConfig> for RadarSettings {
    fn from(config: &RadarConfig) -> Self {
        Self {
            market: config.market.clone(),
            catalog_retry_delay: Duration::from_millis(config.catalog_retry_delay_ms),
            send_pacing: Duration::from_millis(config.send_pacing_ms),
            latest_pacing: Duration::from_millis(config.latest_pacing_ms),
        }
    }
}

/// Shared state for one process
#[derive(Clone)]
pub struct RadarContext {
    pub db: SqlitePool,
    pub catalog: Arc<dyn Catalog>,
    pub messenger: Arc<dyn Messenger>,
    pub settings: RadarSettings,
}

impl RadarContext {
    pub fn new(
        db: SqlitePool,
        catalog: Arc<dyn Catalog>,
        messenger: Arc<dyn Messenger>,
        settings: RadarSettings,
    ) -> Self {
        Self {
            db,
            catalog,
            messenger,
            settings,
        }
    }

    /// Latest release of a category, retried until the catalog answers
    ///
    /// `region_scoped` restricts the query to the configured market.
    pub async fn fetch_latest(
        &self,
        artist_id: &str,
        category: ReleaseCategory,
        region_scoped: bool,
    ) -> Result<ReleaseCandidate, CatalogError> {
        let market = region_scoped.then_some(self.settings.market.as_str());
        catalog::fetch_latest(
            self.catalog.as_ref(),
            artist_id,
            category,
            market,
            self.settings.catalog_retry_delay,
        )
        .await
    }

    /// Release details by id, retried until the catalog answers
    pub async fn fetch_release(&self, release_id: &str) -> Result<ReleaseCandidate, CatalogError> {
        catalog::fetch_release(self.catalog.as_ref(), release_id, self.settings.catalog_retry_delay).await
    }
}
