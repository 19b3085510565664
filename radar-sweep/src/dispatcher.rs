//! Notification fan-out
//!
//! A release is rendered once and sent to every subscriber of the artist.
//! The first successful photo send uploads the cover from its URL; every
//! later recipient gets the platform handle returned by that send.

use radar_common::db::{subscriptions, RecipientId};
use radar_common::messaging::{retry_rate_limited, Media, TextFormat, TransportError};
use radar_common::render::{render_release, RenderedRelease};
use radar_common::{RadarContext, ReleaseCandidate, Result};
use tracing::{debug, info, warn};

/// A recipient the notification could not be delivered to
#[derive(Debug)]
pub struct DeliveryFailure {
    pub recipient: RecipientId,
    pub error: TransportError,
}

/// Outcome of one fan-out
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub recipients: usize,
    pub delivered: usize,
    /// Sends that uploaded the cover from its URL
    pub uploads: usize,
    /// Sends that reused a handle from an earlier send
    pub reused: usize,
    pub failures: Vec<DeliveryFailure>,
}

/// Notify every current subscriber of `artist_id` about `release`
///
/// Rate limiting retries the same send after the requested wait. Any other
/// failure is recorded for that recipient and the fan-out moves on.
pub async fn dispatch(
    ctx: &RadarContext,
    artist_id: &str,
    release: &ReleaseCandidate,
) -> Result<DispatchReport> {
    let recipients = subscriptions::recipients_for_artist(&ctx.db, artist_id).await?;
    let rendered = render_release(release);

    let mut report = DispatchReport {
        recipients: recipients.len(),
        ..DispatchReport::default()
    };
    let mut media = rendered.cover_url.clone().map(Media::Url);

    for (index, recipient) in recipients.into_iter().enumerate() {
        if index > 0 && !ctx.settings.send_pacing.is_zero() {
            tokio::time::sleep(ctx.settings.send_pacing).await;
        }

        match send_with_retry(ctx, recipient, &rendered, media.as_ref()).await {
            Ok(handle) => {
                report.delivered += 1;
                match media.as_ref() {
                    Some(Media::Url(_)) => report.uploads += 1,
                    Some(Media::Handle(_)) => report.reused += 1,
                    None => {}
                }
                if let Some(handle) = handle {
                    media = Some(Media::Handle(handle));
                }
                debug!(recipient, release_id = %release.id, "Notification delivered");
            }
            Err(error) => {
                warn!(
                    recipient,
                    release_id = %release.id,
                    "Failed to deliver notification: {}",
                    error
                );
                report.failures.push(DeliveryFailure { recipient, error });
            }
        }
    }

    info!(
        artist_id = %artist_id,
        release_id = %release.id,
        recipients = report.recipients,
        delivered = report.delivered,
        failed = report.failures.len(),
        "Release dispatched"
    );

    Ok(report)
}

/// Send one notification, waiting out rate limits
///
/// Returns the photo handle when the release has a cover.
async fn send_with_retry(
    ctx: &RadarContext,
    recipient: RecipientId,
    rendered: &RenderedRelease,
    media: Option<&Media>,
) -> std::result::Result<Option<String>, TransportError> {
    match media {
        Some(media) => retry_rate_limited(|| {
            ctx.messenger
                .send_photo(recipient, media, &rendered.caption, Some(&rendered.link))
        })
        .await
        .map(Some),
        None => retry_rate_limited(|| {
            ctx.messenger
                .send_text(recipient, &rendered.caption, TextFormat::MarkdownV2)
        })
        .await
        .map(|()| None),
    }
}
