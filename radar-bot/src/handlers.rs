//! Command handlers
//!
//! Every reply goes to the chat the message came from; the chat id is the
//! subscription recipient.

use crate::commands::Command;
use crate::subscriptions::{toggle, ToggleOutcome};
use radar_common::catalog::{lookup_artists, CatalogError};
use radar_common::db::{artists, subscriptions, RecipientId, StoredRelease};
use radar_common::link::parse_artist_id;
use radar_common::messaging::{retry_rate_limited, Media, TextFormat};
use radar_common::render::{render_release, render_subscriptions};
use radar_common::{Error, RadarContext, ReleaseCategory, Result};
use tracing::{info, warn};

pub const GREETING: &str = "Hey!\n\
Send me the Spotify link of an artist you want to follow and I'll notify you when something new comes out.\n\
Send the same link again to stop following them.";

/// Run one parsed command for `chat`
pub async fn handle(ctx: &RadarContext, chat: RecipientId, command: Command) -> Result<()> {
    match command {
        Command::Start => reply(ctx, chat, GREETING, TextFormat::Plain).await,
        Command::Subscriptions => show_subscriptions(ctx, chat).await,
        Command::Latest(arg) => show_latest(ctx, chat, &arg).await,
        Command::Toggle(link) => toggle_link(ctx, chat, &link).await,
    }
}

async fn show_subscriptions(ctx: &RadarContext, chat: RecipientId) -> Result<()> {
    let artist_ids = subscriptions::artists_for_recipient(&ctx.db, chat).await?;
    let artists = lookup_artists(ctx.catalog.as_ref(), &artist_ids).await?;
    reply(ctx, chat, &render_subscriptions(&artists), TextFormat::MarkdownV2).await
}

async fn show_latest(ctx: &RadarContext, chat: RecipientId, arg: &str) -> Result<()> {
    let artist_id = parse_artist_id(arg).unwrap_or_else(|_| arg.trim().to_string());

    let Some(state) = artists::load_artist(&ctx.db, &artist_id).await? else {
        let text = format!(
            "{} is not tracked, you should add it before checking the latest releases!",
            artist_id
        );
        return reply(ctx, chat, &text, TextFormat::Plain).await;
    };

    send_stored_release(ctx, chat, &state.last_single, ReleaseCategory::Single).await?;
    if !ctx.settings.latest_pacing.is_zero() {
        tokio::time::sleep(ctx.settings.latest_pacing).await;
    }
    send_stored_release(ctx, chat, &state.last_album, ReleaseCategory::Album).await
}

async fn send_stored_release(
    ctx: &RadarContext,
    chat: RecipientId,
    stored: &StoredRelease,
    category: ReleaseCategory,
) -> Result<()> {
    if stored.release_id.is_empty() {
        let text = format!("No last {} recorded", category.as_str());
        return reply(ctx, chat, &text, TextFormat::Plain).await;
    }

    let release = ctx.fetch_release(&stored.release_id).await?;
    let rendered = render_release(&release);
    match rendered.cover_url {
        Some(cover) => {
            let media = Media::Url(cover);
            retry_rate_limited(|| {
                ctx.messenger
                    .send_photo(chat, &media, &rendered.caption, Some(&rendered.link))
            })
            .await?;
            Ok(())
        }
        None => reply(ctx, chat, &rendered.caption, TextFormat::MarkdownV2).await,
    }
}

async fn toggle_link(ctx: &RadarContext, chat: RecipientId, link: &str) -> Result<()> {
    let artist_id = match parse_artist_id(link) {
        Ok(artist_id) => artist_id,
        Err(Error::InvalidInput(reason)) => {
            warn!(chat, "Rejected link: {}", reason);
            let text = format!("{} is not a valid artist link", link.trim());
            return reply(ctx, chat, &text, TextFormat::Plain).await;
        }
        Err(e) => return Err(e),
    };

    let artist = match ctx.catalog.artist(&artist_id).await {
        Ok(artist) => artist,
        Err(CatalogError::Rejected { status, message }) => {
            warn!(chat, artist_id = %artist_id, status, "Artist lookup rejected: {}", message);
            let text = format!("{} is not a known artist", artist_id);
            return reply(ctx, chat, &text, TextFormat::Plain).await;
        }
        Err(e) => return Err(e.into()),
    };

    let text = match toggle(ctx, chat, &artist_id).await? {
        ToggleOutcome::Subscribed => format!("You've subscribed to {}", artist.name),
        ToggleOutcome::Unsubscribed => format!("You've unsubscribed from {}", artist.name),
    };
    info!(chat, artist_id = %artist_id, "{}", text);
    reply(ctx, chat, &text, TextFormat::Plain).await
}

async fn reply(ctx: &RadarContext, chat: RecipientId, text: &str, format: TextFormat) -> Result<()> {
    retry_rate_limited(|| ctx.messenger.send_text(chat, text, format)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_common::testing::{candidate, fake_context, FakeCatalog, FakeMessenger, ScriptedFailure, Sent};
    use radar_common::ReleaseCandidate;
    use std::sync::Arc;
    use std::time::Duration;

    async fn context() -> (RadarContext, Arc<FakeCatalog>, Arc<FakeMessenger>) {
        let catalog = Arc::new(FakeCatalog::new());
        let messenger = Arc::new(FakeMessenger::new());
        let ctx = fake_context(catalog.clone(), messenger.clone()).await;
        (ctx, catalog, messenger)
    }

    #[tokio::test]
    async fn test_start_sends_greeting() {
        let (ctx, _, messenger) = context().await;

        handle(&ctx, 7, Command::Start).await.unwrap();

        assert_eq!(messenger.texts(), vec![GREETING.to_string()]);
    }

    #[tokio::test]
    async fn test_link_toggles_and_replies_with_artist_name() {
        let (ctx, catalog, messenger) = context().await;
        catalog.set_artist_name("abc123", "The Band");
        let link = "https://open.spotify.com/artist/abc123?si=x".to_string();

        handle(&ctx, 7, Command::Toggle(link.clone())).await.unwrap();
        handle(&ctx, 7, Command::Toggle(link)).await.unwrap();

        assert_eq!(
            messenger.texts(),
            vec![
                "You've subscribed to The Band".to_string(),
                "You've unsubscribed from The Band".to_string(),
            ]
        );
        assert!(!subscriptions::exists(&ctx.db, 7, "abc123").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_artist_gets_informational_reply() {
        let (ctx, catalog, messenger) = context().await;
        catalog.reject_artist("nope");

        handle(&ctx, 7, Command::Toggle("spotify:artist:nope".to_string()))
            .await
            .unwrap();

        assert_eq!(messenger.texts(), vec!["nope is not a known artist".to_string()]);
        assert!(!subscriptions::exists(&ctx.db, 7, "nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_link_gets_informational_reply() {
        let (ctx, catalog, messenger) = context().await;

        handle(&ctx, 7, Command::Toggle("spotify:artist:ab-c".to_string()))
            .await
            .unwrap();

        assert_eq!(
            messenger.texts(),
            vec!["spotify:artist:ab-c is not a valid artist link".to_string()]
        );
        assert!(catalog.latest_calls().is_empty());
        assert_eq!(subscriptions::count_for_artist(&ctx.db, "ab-c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_subscriptions_listing() {
        let (ctx, catalog, messenger) = context().await;
        catalog.set_artist_name("a1", "First");
        subscriptions::insert(&ctx.db, 7, "a1").await.unwrap();

        handle(&ctx, 7, Command::Subscriptions).await.unwrap();

        match &messenger.sent()[0] {
            Sent::Text { text, format, .. } => {
                assert_eq!(*format, TextFormat::MarkdownV2);
                assert_eq!(
                    text,
                    "*Currently subscribed to:*\n\\- [First](https://open.spotify.com/artist/a1)\n"
                );
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_subscriptions_listing_is_chunked() {
        let (ctx, catalog, messenger) = context().await;
        for i in 0..120 {
            subscriptions::insert(&ctx.db, 7, &format!("a{:03}", i)).await.unwrap();
        }

        handle(&ctx, 7, Command::Subscriptions).await.unwrap();

        assert_eq!(catalog.bulk_lookup_sizes(), vec![50, 50, 20]);
        assert_eq!(messenger.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_subscriptions_listing() {
        let (ctx, _, messenger) = context().await;

        handle(&ctx, 7, Command::Subscriptions).await.unwrap();

        assert_eq!(messenger.texts(), vec!["*Currently subscribed to:*\n_No One_".to_string()]);
    }

    #[tokio::test]
    async fn test_latest_for_untracked_artist() {
        let (ctx, _, messenger) = context().await;

        handle(&ctx, 7, Command::Latest("spotify:artist:zzz".to_string()))
            .await
            .unwrap();

        assert_eq!(
            messenger.texts(),
            vec!["zzz is not tracked, you should add it before checking the latest releases!".to_string()]
        );
    }

    #[tokio::test]
    async fn test_latest_sends_recorded_releases() {
        let (ctx, catalog, messenger) = context().await;
        let single = candidate("s1", "X", "2023-01-10", ReleaseCategory::Single);
        catalog.set_latest("A1", ReleaseCategory::Single, single.clone());
        let album = ReleaseCandidate::sentinel(ReleaseCategory::Album);
        artists::insert_artist(&ctx.db, "A1", &single, &album).await.unwrap();

        handle(&ctx, 7, Command::Latest("A1".to_string())).await.unwrap();

        let sent = messenger.sent();
        assert_eq!(sent.len(), 2);
        match &sent[0] {
            Sent::Photo { caption, media, .. } => {
                assert!(caption.contains("*X*"));
                assert!(media.is_upload());
            }
            other => panic!("expected photo, got {:?}", other),
        }
        assert_eq!(messenger.texts(), vec!["No last album recorded".to_string()]);
    }

    #[tokio::test]
    async fn test_latest_waits_out_transient_catalog_failures() {
        let (ctx, catalog, messenger) = context().await;
        let single = candidate("s1", "X", "2023-01-10", ReleaseCategory::Single);
        catalog.set_latest("A1", ReleaseCategory::Single, single.clone());
        let album = ReleaseCandidate::sentinel(ReleaseCategory::Album);
        artists::insert_artist(&ctx.db, "A1", &single, &album).await.unwrap();
        catalog.fail_transiently(2);

        handle(&ctx, 7, Command::Latest("A1".to_string())).await.unwrap();

        let sent = messenger.sent();
        assert_eq!(sent.len(), 2);
        assert!(matches!(&sent[0], Sent::Photo { .. }));
    }

    #[tokio::test]
    async fn test_reply_waits_out_rate_limit() {
        let (ctx, _, messenger) = context().await;
        messenger.fail_next(7, ScriptedFailure::RetryAfter(Duration::from_millis(5)));

        handle(&ctx, 7, Command::Start).await.unwrap();

        assert_eq!(messenger.attempts(), 2);
        assert_eq!(messenger.texts().len(), 1);
    }
}
