//! Spotify Web API client
//!
//! Client-credentials authentication with a cached bearer token, a
//! client-side rate limiter, and status-code classification into transient
//! vs permanent [`CatalogError`]s. Retrying is left to the caller.

use super::{ArtistInfo, Catalog, CatalogError};
use crate::release::{normalize_release_date, normalize_release_name, DatePrecision, ReleaseCandidate, ReleaseCategory};
use async_trait::async_trait;
use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const API_BASE_URL: &str = "https://api.spotify.com/v1";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const USER_AGENT: &str = concat!("release-radar/", env!("CARGO_PKG_VERSION"));
const REQUESTS_PER_SECOND: u32 = 5;
/// Refresh this long before the token actually expires
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

/// Public link to a release
pub fn release_url(release_id: &str) -> String {
    format!("https://open.spotify.com/album/{}", release_id)
}

/// Public link to an artist
pub fn artist_url(artist_id: &str) -> String {
    format!("https://open.spotify.com/artist/{}", artist_id)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
    width: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SimpleArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Album {
    id: String,
    name: String,
    album_type: Option<String>,
    release_date: String,
    release_date_precision: Option<DatePrecision>,
    #[serde(default)]
    artists: Vec<SimpleArtist>,
    #[serde(default)]
    images: Vec<Image>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

impl Album {
    fn into_candidate(self, category: ReleaseCategory) -> ReleaseCandidate {
        let cover_url = self
            .images
            .iter()
            .max_by_key(|image| image.width.unwrap_or(0))
            .map(|image| image.url.clone());
        let external_url = self
            .external_urls
            .spotify
            .unwrap_or_else(|| release_url(&self.id));

        ReleaseCandidate {
            release_date: normalize_release_date(&self.release_date, self.release_date_precision),
            name: normalize_release_name(&self.name),
            id: self.id,
            category,
            artists: self.artists.into_iter().map(|artist| artist.name).collect(),
            cover_url,
            external_url,
        }
    }

    fn category(&self) -> ReleaseCategory {
        match self.album_type.as_deref() {
            Some("single") => ReleaseCategory::Single,
            _ => ReleaseCategory::Album,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FullArtist {
    id: String,
    name: String,
    #[serde(default)]
    external_urls: ExternalUrls,
}

impl From<FullArtist> for ArtistInfo {
    fn from(artist: FullArtist) -> Self {
        let external_url = artist
            .external_urls
            .spotify
            .unwrap_or_else(|| artist_url(&artist.id));
        ArtistInfo {
            id: artist.id,
            name: artist.name,
            external_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Artists {
    artists: Vec<Option<FullArtist>>,
}

fn network_error(e: reqwest::Error) -> CatalogError {
    CatalogError::Transient {
        reason: format!("network error: {}", e),
        retry_after: None,
    }
}

fn retry_after_header(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Spotify Web API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AccessToken>>,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CatalogError::Parse(format!("HTTP client setup failed: {}", e)))?;

        let quota = Quota::per_second(NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            http_client,
            client_id,
            client_secret,
            token: Mutex::new(None),
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    /// Cached bearer token, requesting a new one when missing or about to expire
    async fn access_token(&self) -> Result<String, CatalogError> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref() {
            if current.expires_at > Instant::now() {
                return Ok(current.value.clone());
            }
        }

        tracing::debug!("Requesting Spotify access token");
        let response = self
            .http_client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(CatalogError::Transient {
                reason: format!("token endpoint returned {}", status),
                retry_after: retry_after_header(&response),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Rejected {
                status: status.as_u16(),
                message: format!("credentials rejected: {}", message),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        let lifetime = Duration::from_secs(body.expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS));
        *token = Some(AccessToken {
            value: body.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(body.access_token)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        self.rate_limiter.until_ready().await;
        let token = self.access_token().await?;

        let url = format!("{}{}", API_BASE_URL, path);
        tracing::debug!(url = %url, "Querying Spotify API");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_token().await;
            return Err(CatalogError::Transient {
                reason: "access token expired".to_string(),
                retry_after: None,
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(CatalogError::Transient {
                reason: format!("{} returned {}", path, status),
                retry_after: retry_after_header(&response),
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

#[async_trait]
impl Catalog for SpotifyClient {
    async fn latest_release(
        &self,
        artist_id: &str,
        category: ReleaseCategory,
        market: Option<&str>,
    ) -> Result<Option<ReleaseCandidate>, CatalogError> {
        let mut query = vec![
            ("include_groups", category.as_str().to_string()),
            ("limit", "1".to_string()),
        ];
        if let Some(market) = market {
            query.push(("market", market.to_string()));
        }

        let page: Page<Album> = self
            .get_json(&format!("/artists/{}/albums", artist_id), &query)
            .await?;

        Ok(page
            .items
            .into_iter()
            .next()
            .map(|album| album.into_candidate(category)))
    }

    async fn artist(&self, artist_id: &str) -> Result<ArtistInfo, CatalogError> {
        let artist: FullArtist = self.get_json(&format!("/artists/{}", artist_id), &[]).await?;
        Ok(artist.into())
    }

    async fn artists(&self, artist_ids: &[String]) -> Result<Vec<ArtistInfo>, CatalogError> {
        if artist_ids.is_empty() {
            return Ok(Vec::new());
        }
        let found: Artists = self
            .get_json("/artists", &[("ids", artist_ids.join(","))])
            .await?;
        Ok(found.artists.into_iter().flatten().map(ArtistInfo::from).collect())
    }

    async fn release(&self, release_id: &str) -> Result<ReleaseCandidate, CatalogError> {
        let album: Album = self.get_json(&format!("/albums/{}", release_id), &[]).await?;
        let category = album.category();
        Ok(album.into_candidate(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = SpotifyClient::new("id".to_string(), "secret".to_string());
        assert!(client.is_ok());
    }

    #[test]
    fn test_album_conversion_normalizes_and_picks_largest_cover() {
        let album: Album = serde_json::from_value(serde_json::json!({
            "id": "4aawyAB9vmqN3uQ7FjRGTy",
            "name": "Global Warming",
            "album_type": "album",
            "release_date": "2012-11",
            "release_date_precision": "month",
            "artists": [{ "name": "Pitbull" }, { "name": "Guest" }],
            "images": [
                { "url": "https://i.scdn.co/small", "width": 64, "height": 64 },
                { "url": "https://i.scdn.co/large", "width": 640, "height": 640 }
            ],
            "external_urls": { "spotify": "https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy" }
        }))
        .unwrap();

        assert_eq!(album.category(), ReleaseCategory::Album);
        let candidate = album.into_candidate(ReleaseCategory::Album);
        assert_eq!(candidate.release_date, "2012-11-01");
        assert_eq!(candidate.artists, vec!["Pitbull", "Guest"]);
        assert_eq!(candidate.cover_url.as_deref(), Some("https://i.scdn.co/large"));
        assert_eq!(
            candidate.external_url,
            "https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy"
        );
    }

    #[test]
    fn test_album_without_links_or_images() {
        let album: Album = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "name": "Lonely",
            "album_type": "single",
            "release_date": "1999"
        }))
        .unwrap();

        assert_eq!(album.category(), ReleaseCategory::Single);
        let candidate = album.into_candidate(ReleaseCategory::Single);
        assert_eq!(candidate.release_date, "1999-01-01");
        assert_eq!(candidate.cover_url, None);
        assert_eq!(candidate.external_url, release_url("abc"));
    }

    #[test]
    fn test_bulk_artists_skip_unknown_ids() {
        let found: Artists = serde_json::from_value(serde_json::json!({
            "artists": [
                { "id": "a", "name": "Known", "external_urls": { "spotify": "https://open.spotify.com/artist/a" } },
                null
            ]
        }))
        .unwrap();

        let infos: Vec<ArtistInfo> = found.artists.into_iter().flatten().map(ArtistInfo::from).collect();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "Known");
    }
}
