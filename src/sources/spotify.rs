//! Spotify playlists via the Web API, client-credentials flow.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::SourceTracks;
use crate::config::SpotifyCredentials;
use crate::sanitize::SanitizeMode;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistName {
    name: String,
}

#[derive(Debug, Deserialize)]
pub struct TracksPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    pub next: Option<String>,
}

/// `track` is null for removed or unavailable items.
#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<PlaylistTrack>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistTrack {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

#[derive(Debug, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub name: Option<String>,
}

/// Segment after `playlist/`, query string dropped. A bare id passes through.
pub fn playlist_id(url: &str) -> Result<String> {
    let tail = url.rsplit("playlist/").next().unwrap_or(url);
    let id = tail.split('?').next().unwrap_or(tail).trim_end_matches('/').trim();
    if id.is_empty() {
        bail!("Could not find a playlist id in '{}'", url);
    }
    Ok(id.to_string())
}

/// "{first artist} {track name}", or `None` when either is missing.
pub fn item_query(item: &PlaylistItem) -> Option<String> {
    let track = item.track.as_ref()?;
    let title = track.name.as_deref().filter(|s| !s.is_empty())?;
    let artist = track
        .artists
        .first()
        .and_then(|a| a.name.as_deref())
        .filter(|s| !s.is_empty())?;
    Some(format!("{} {}", artist, title))
}

pub struct SpotifyClient {
    http: Client,
    token: String,
}

impl SpotifyClient {
    pub fn authenticate(http: Client, credentials: &SpotifyCredentials) -> Result<Self> {
        let token: TokenResponse = http
            .post(TOKEN_URL)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .context("Spotify authentication failed")?;
        Ok(Self {
            http,
            token: token.access_token,
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .with_context(|| format!("Spotify request failed: {}", url))
    }

    pub fn playlist_name(&self, id: &str) -> Result<String> {
        let playlist: PlaylistName =
            self.get_json(&format!("{}/playlists/{}?fields=name", API_BASE, id))?;
        Ok(playlist.name)
    }

    /// Every page of the playlist, following `next` links.
    pub fn playlist_tracks(&self, id: &str) -> Result<Vec<String>> {
        let mut tracks = Vec::new();
        let mut url = Some(format!("{}/playlists/{}/tracks", API_BASE, id));
        while let Some(page_url) = url {
            let page: TracksPage = self.get_json(&page_url)?;
            tracks.extend(page.items.iter().filter_map(item_query));
            url = page.next;
        }
        Ok(tracks)
    }
}

pub fn load(http: Client, credentials: &SpotifyCredentials, url: &str) -> Result<SourceTracks> {
    let id = playlist_id(url)?;
    let client = SpotifyClient::authenticate(http, credentials)?;

    tracing::info!(playlist = %id, "fetching Spotify playlist");
    let tracks = client.playlist_tracks(&id)?;
    tracing::info!(tracks = tracks.len(), "fetched tracks from playlist");
    if tracks.is_empty() {
        bail!("No tracks found in playlist.");
    }

    Ok(SourceTracks {
        title: client.playlist_name(&id)?,
        tracks,
        folder_mode: SanitizeMode::Lenient,
        dash_fallback: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_id() {
        assert_eq!(
            playlist_id("https://open.spotify.com/playlist/37i9dQZF1DX4dyzvuaRJ0n?si=abc").unwrap(),
            "37i9dQZF1DX4dyzvuaRJ0n"
        );
        assert_eq!(playlist_id("37i9dQZF1DX4dyzvuaRJ0n").unwrap(), "37i9dQZF1DX4dyzvuaRJ0n");
        assert!(playlist_id("https://open.spotify.com/playlist/").is_err());
    }

    #[test]
    fn test_page_items_to_queries() {
        let json = r#"{
            "items": [
                {"track": {"name": "Glue", "artists": [{"name": "Bicep"}, {"name": "Other"}]}},
                {"track": null},
                {"track": {"name": "Untitled", "artists": []}},
                {"track": {"name": "", "artists": [{"name": "Nobody"}]}},
                {"track": {"name": "Baby", "artists": [{"name": "Four Tet"}]}}
            ],
            "next": "https://api.spotify.com/v1/playlists/x/tracks?offset=100"
        }"#;

        let page: TracksPage = serde_json::from_str(json).unwrap();
        let queries: Vec<String> = page.items.iter().filter_map(item_query).collect();
        assert_eq!(queries, vec!["Bicep Glue", "Four Tet Baby"]);
        assert!(page.next.is_some());
    }

    #[test]
    fn test_last_page_has_no_next() {
        let page: TracksPage = serde_json::from_str(r#"{"items": [], "next": null}"#).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next.is_none());
    }
}
