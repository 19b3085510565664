//! Subscription edge persistence

use super::models::RecipientId;
use crate::Result;
use sqlx::SqlitePool;

/// Outcome of flipping a (recipient, artist) edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeChange {
    Created,
    Deleted,
}

/// Add an edge; returns `false` if it already existed
pub async fn insert(pool: &SqlitePool, recipient_id: RecipientId, artist_id: &str) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO subscriptions (recipient_id, artist_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(recipient_id)
    .bind(artist_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Remove an edge; returns `false` if there was none
pub async fn delete(pool: &SqlitePool, recipient_id: RecipientId, artist_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE recipient_id = ? AND artist_id = ?")
        .bind(recipient_id)
        .bind(artist_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete the edge if present, otherwise create it, in one transaction
pub async fn toggle(pool: &SqlitePool, recipient_id: RecipientId, artist_id: &str) -> Result<EdgeChange> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM subscriptions WHERE recipient_id = ? AND artist_id = ?")
        .bind(recipient_id)
        .bind(artist_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let change = if deleted > 0 {
        EdgeChange::Deleted
    } else {
        sqlx::query("INSERT INTO subscriptions (recipient_id, artist_id) VALUES (?, ?)")
            .bind(recipient_id)
            .bind(artist_id)
            .execute(&mut *tx)
            .await?;
        EdgeChange::Created
    };

    tx.commit().await?;
    Ok(change)
}

/// Whether the edge exists
pub async fn exists(pool: &SqlitePool, recipient_id: RecipientId, artist_id: &str) -> Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM subscriptions WHERE recipient_id = ? AND artist_id = ?")
            .bind(recipient_id)
            .bind(artist_id)
            .fetch_optional(pool)
            .await?;
    Ok(found.is_some())
}

/// Recipients subscribed to an artist, in a stable order
pub async fn recipients_for_artist(pool: &SqlitePool, artist_id: &str) -> Result<Vec<RecipientId>> {
    let recipients = sqlx::query_scalar(
        "SELECT recipient_id FROM subscriptions WHERE artist_id = ? ORDER BY recipient_id",
    )
    .bind(artist_id)
    .fetch_all(pool)
    .await?;
    Ok(recipients)
}

/// Artists a recipient subscribes to, in a stable order
pub async fn artists_for_recipient(pool: &SqlitePool, recipient_id: RecipientId) -> Result<Vec<String>> {
    let artists = sqlx::query_scalar(
        "SELECT artist_id FROM subscriptions WHERE recipient_id = ? ORDER BY artist_id",
    )
    .bind(recipient_id)
    .fetch_all(pool)
    .await?;
    Ok(artists)
}

/// Number of recipients subscribed to an artist
pub async fn count_for_artist(pool: &SqlitePool, artist_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE artist_id = ?")
        .bind(artist_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
