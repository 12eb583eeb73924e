//! Core data models for tracklist normalization and download bookkeeping.
//!
//! This module contains the struct definitions and enums shared by the
//! normalizer, the source adapters and both download pipelines.

use serde::Serialize;
use std::fmt;

// ============================================================================
// Separator
// ============================================================================

/// Separator convention between artist and title in a raw line.
///
/// Comment tracklists scraped for Soulseek use a bare hyphen ("Artist-Title"
/// and "Artist - Title" both split), mix tracklists for the YouTube variant
/// require the spaced form so hyphenated names survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Separator {
    /// `-`
    Hyphen,
    /// ` - `
    #[value(name = "spaced")]
    SpacedHyphen,
}

impl Separator {
    pub fn as_str(self) -> &'static str {
        match self {
            Separator::Hyphen => "-",
            Separator::SpacedHyphen => " - ",
        }
    }
}

// ============================================================================
// Track Models
// ============================================================================

/// A raw line after noise stripping, split into artist and title.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TrackCandidate {
    pub artist: String,
    pub title: String,
}

impl TrackCandidate {
    /// Free-text search string handed to the Soulseek downloader: "Artist Title".
    pub fn query(&self) -> String {
        format!("{} {}", self.artist, self.title)
    }

    /// Human-readable form used for YouTube searches and file names: "Artist - Title".
    pub fn display(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    pub fn canonical_key(&self, separator: Separator) -> CanonicalKey {
        CanonicalKey(format!(
            "{}{}{}",
            self.artist.to_lowercase(),
            separator.as_str(),
            self.title.to_lowercase()
        ))
    }
}

/// Lowercased artist + separator + title. Two candidates with the same key are the same track.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Ordered, duplicate-free sequence of tracks in first-seen order.
///
/// Only the normalizer builds one; it is read-only afterwards.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TrackList {
    tracks: Vec<TrackCandidate>,
}

impl TrackList {
    pub(crate) fn push(&mut self, track: TrackCandidate) {
        self.tracks.push(track);
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackCandidate> {
        self.tracks.iter()
    }

    /// "Artist Title" strings for the Soulseek tracklist file.
    pub fn queries(&self) -> Vec<String> {
        self.tracks.iter().map(TrackCandidate::query).collect()
    }

    /// "Artist - Title" strings.
    pub fn displays(&self) -> Vec<String> {
        self.tracks.iter().map(TrackCandidate::display).collect()
    }
}

impl<'a> IntoIterator for &'a TrackList {
    type Item = &'a TrackCandidate;
    type IntoIter = std::slice::Iter<'a, TrackCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}

// ============================================================================
// Discard Tracking
// ============================================================================

/// Why the normalizer rejected a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    Empty,
    NoSeparator,
    TooShort,
    NoLetters,
    Blacklisted,
    Duplicate,
}

impl DiscardReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscardReason::Empty => "empty",
            DiscardReason::NoSeparator => "no separator",
            DiscardReason::TooShort => "too short",
            DiscardReason::NoLetters => "no letters",
            DiscardReason::Blacklisted => "blacklisted",
            DiscardReason::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected input line together with what was left of it when it was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Discard {
    pub line: String,
    pub cleaned: String,
    pub reason: DiscardReason,
}

/// Result of one normalizer batch run: accepted tracks plus every rejection.
#[derive(Clone, Debug, Default, Serialize)]
pub struct NormalizeReport {
    pub tracks: TrackList,
    pub discards: Vec<Discard>,
}

impl NormalizeReport {
    pub fn discard_count(&self, reason: DiscardReason) -> usize {
        self.discards.iter().filter(|d| d.reason == reason).count()
    }
}

// ============================================================================
// Download Outcomes
// ============================================================================

/// Status of one track as reported on the Soulseek downloader's output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SldlStatus {
    Downloaded,
    Failed,
    Waiting,
}

/// Shared result table for the direct YouTube variant.
#[derive(Debug, Default)]
pub struct DownloadSummary {
    /// (track, source url)
    pub success: Vec<(String, String)>,
    /// (track, reason)
    pub skipped: Vec<(String, String)>,
}
