//! Artist release state persistence
//!
//! Every write here is a single statement whose WHERE clause carries its own
//! precondition, so concurrent writers (sweep and bot run as separate
//! processes) serialize on the row instead of overwriting each other.

use super::models::{ArtistReleaseState, StoredRelease};
use crate::release::{self, ReleaseCandidate, ReleaseCategory};
use crate::Result;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::warn;

/// (id, date, name) column names for a category
fn columns(category: ReleaseCategory) -> (&'static str, &'static str, &'static str) {
    match category {
        ReleaseCategory::Single => ("last_single_id", "last_single_date", "last_single_name"),
        ReleaseCategory::Album => ("last_album_id", "last_album_date", "last_album_name"),
    }
}

fn stored_release(row: &SqliteRow, category: ReleaseCategory) -> StoredRelease {
    let (id_col, date_col, name_col) = columns(category);
    let release_id: Option<String> = row.get(id_col);
    let raw_date: Option<String> = row.get(date_col);
    let release_name: Option<String> = row.get(name_col);

    let release_date = raw_date.as_deref().and_then(|raw| {
        let parsed = release::parse_date(raw);
        if parsed.is_none() {
            warn!(date = %raw, column = date_col, "Ignoring malformed stored release date");
        }
        parsed
    });

    StoredRelease {
        release_id: release_id.unwrap_or_default(),
        release_date,
        release_name: release_name.unwrap_or_default(),
    }
}

/// Load the release state of one artist
pub async fn load_artist(pool: &SqlitePool, artist_id: &str) -> Result<Option<ArtistReleaseState>> {
    let row = sqlx::query(
        r#"
        SELECT artist_id, last_single_id, last_single_date, last_single_name,
               last_album_id, last_album_date, last_album_name
        FROM artists
        WHERE artist_id = ?
        "#,
    )
    .bind(artist_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| ArtistReleaseState {
        artist_id: row.get("artist_id"),
        last_single: stored_release(&row, ReleaseCategory::Single),
        last_album: stored_release(&row, ReleaseCategory::Album),
    }))
}

/// Whether the artist currently has a state row
pub async fn is_tracked(pool: &SqlitePool, artist_id: &str) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM artists WHERE artist_id = ?")
        .bind(artist_id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// All tracked artist ids, in a stable order
///
/// Includes subscribed artists whose seeding never completed, so the next
/// sweep seeds them.
pub async fn list_artist_ids(pool: &SqlitePool) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar(
        r#"
        SELECT artist_id FROM artists
        UNION
        SELECT artist_id FROM subscriptions
        ORDER BY artist_id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Insert the baseline row for an artist
///
/// Returns `false` when a row already existed; the existing row is left
/// untouched so a concurrent seeding never clobbers a newer update.
pub async fn insert_artist(
    pool: &SqlitePool,
    artist_id: &str,
    single: &ReleaseCandidate,
    album: &ReleaseCandidate,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO artists (
            artist_id, last_single_id, last_single_date, last_single_name,
            last_album_id, last_album_date, last_album_name
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(artist_id) DO NOTHING
        "#,
    )
    .bind(artist_id)
    .bind(&single.id)
    .bind(&single.release_date)
    .bind(&single.name)
    .bind(&album.id)
    .bind(&album.release_date)
    .bind(&album.name)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Replace the stored release of one category, if it is still `previous`
///
/// Compare-and-set on the stored id and name: returns `false` when the row
/// was changed or deleted by another writer since `previous` was read.
pub async fn update_release(
    pool: &SqlitePool,
    artist_id: &str,
    previous: &StoredRelease,
    candidate: &ReleaseCandidate,
) -> Result<bool> {
    let (id_col, date_col, name_col) = columns(candidate.category);
    let sql = format!(
        "UPDATE artists SET {id_col} = ?, {date_col} = ?, {name_col} = ? \
         WHERE artist_id = ? AND COALESCE({id_col}, '') = ? AND COALESCE({name_col}, '') = ?"
    );

    let result = sqlx::query(&sql)
        .bind(&candidate.id)
        .bind(&candidate.release_date)
        .bind(&candidate.name)
        .bind(artist_id)
        .bind(&previous.release_id)
        .bind(&previous.release_name)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Delete the artist row if nobody subscribes to it anymore
///
/// Returns `true` when a row was deleted.
pub async fn remove_artist_if_unsubscribed(pool: &SqlitePool, artist_id: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM artists
        WHERE artist_id = ?
          AND NOT EXISTS (SELECT 1 FROM subscriptions WHERE artist_id = ?)
        "#,
    )
    .bind(artist_id)
    .bind(artist_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
