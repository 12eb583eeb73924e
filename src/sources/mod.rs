//! Where track lists come from.
//!
//! Every adapter yields a [`SourceTracks`]: the search strings plus the name
//! the download folder is derived from.

pub mod spotify;
pub mod text_file;
pub mod tracklist_page;
pub mod youtube;

use anyhow::{Context, Result};
use std::time::Duration;

use crate::sanitize::SanitizeMode;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Tracks fetched from one source.
#[derive(Debug, Clone)]
pub struct SourceTracks {
    /// Human-readable name (page title, playlist name, video title, file stem).
    pub title: String,
    /// Search strings in first-seen order.
    pub tracks: Vec<String>,
    /// How `title` becomes a folder name.
    pub folder_mode: SanitizeMode,
    /// Whether the tracklist file also gets hyphen-less retry lines.
    pub dash_fallback: bool,
}

pub fn http_client() -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")
}
