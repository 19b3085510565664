//! Subscription manager
//!
//! Toggling drives the lifecycle of the artist's state row: the first
//! subscriber of an untracked artist seeds it, the last one to leave deletes it.

use radar_common::db::subscriptions::{self, EdgeChange};
use radar_common::db::{artists, RecipientId};
use radar_common::seed::seed_artist;
use radar_common::{RadarContext, Result};
use tracing::info;

/// Result of a toggle, from the recipient's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Subscribed,
    Unsubscribed,
}

/// Flip the (recipient, artist) subscription
///
/// A seeding failure after subscribing is returned to the caller; the edge
/// stays, and the next sweep seeds the artist.
pub async fn toggle(ctx: &RadarContext, recipient: RecipientId, artist_id: &str) -> Result<ToggleOutcome> {
    match subscriptions::toggle(&ctx.db, recipient, artist_id).await? {
        EdgeChange::Deleted => {
            info!(recipient, artist_id = %artist_id, "Unsubscribed");
            if artists::remove_artist_if_unsubscribed(&ctx.db, artist_id).await? {
                info!(artist_id = %artist_id, "Artist is no longer tracked");
            }
            Ok(ToggleOutcome::Unsubscribed)
        }
        EdgeChange::Created => {
            info!(recipient, artist_id = %artist_id, "Subscribed");
            if !artists::is_tracked(&ctx.db, artist_id).await? {
                seed_artist(ctx, artist_id).await?;
            }
            Ok(ToggleOutcome::Subscribed)
        }
    }
}
