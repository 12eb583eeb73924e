//! 1001tracklists-style web pages.
//!
//! Three extraction passes, each tried only when the previous one found
//! nothing: the dedicated track markup, then any short text element shaped
//! like "Artist - Title", then raw page text lines.

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::SourceTracks;
use crate::models::NormalizeReport;
use crate::normalize::{LineNormalizer, NormalizerConfig, MULTI_SPACE};
use crate::sanitize::SanitizeMode;

pub const UNKNOWN_TITLE: &str = "Unknown Tracklist";
const SITE_SUFFIX: &str = " | 1001Tracklists";

static ELEMENT_TRACK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^-]+ - [^-]+$").unwrap());
static TEXT_LINE_TRACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w\s&.,-]+ - [\w\s&.,-]+$").unwrap());

const ELEMENT_SKIP_WORDS: &[&str] = &[
    "download", "subscribe", "comment", "share", "upload", "genre:", "bpm:", "key:", "time:",
    "length:", "duration:", "http", "www", ".com", "follow", "like", "playlist",
];

const TEXT_LINE_SKIP_WORDS: &[&str] = &[
    "download", "subscribe", "comment", "share", "upload", "genre:", "bpm:", "key:", "tracklist",
    "playlist", "http", "www", ".com", "follow", "like", "1001",
];

/// Selectors are static strings; a parse failure is a programming error.
fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

/// Concatenated text nodes, each trimmed, empty ones dropped.
fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn page_title(document: &Html) -> String {
    if let Some(h1) = document.select(&selector("h1")).next() {
        return stripped_text(h1);
    }
    if let Some(title) = document.select(&selector("title")).next() {
        return stripped_text(title).replace(SITE_SUFFIX, "");
    }
    UNKNOWN_TITLE.to_string()
}

fn within_length(text: &str) -> bool {
    let len = text.chars().count();
    len > 5 && len < 200
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    let lower = text.to_lowercase();
    words.iter().any(|w| lower.contains(w))
}

/// Both halves present, under 100 chars each.
fn plausible_halves(text: &str) -> Option<(&str, &str)> {
    let (artist, title) = text.split_once(" - ")?;
    let (artist, title) = (artist.trim(), title.trim());
    let ok = |s: &str| !s.is_empty() && s.chars().count() < 100;
    (ok(artist) && ok(title)).then_some((artist, title))
}

/// Dedicated track markup. Hyphens and ampersands get spaces around them.
fn track_value_lines(document: &Html) -> Vec<String> {
    let item = selector("div.tlpItem");
    let value = selector("span.trackValue");

    document
        .select(&item)
        .filter_map(|it| it.select(&value).next())
        .map(|span| {
            let text = stripped_text(span).replace('&', " & ").replace('-', " - ");
            MULTI_SPACE.replace_all(&text, " ").trim().to_string()
        })
        .filter(|text| text.contains(" - "))
        .collect()
}

fn element_lines(document: &Html) -> Vec<String> {
    let elements = selector("div, span, p, li");

    document
        .select(&elements)
        .map(stripped_text)
        .filter(|text| text.contains(" - ") && within_length(text))
        .filter(|text| !contains_any(text, ELEMENT_SKIP_WORDS))
        .filter(|text| ELEMENT_TRACK.is_match(text))
        .filter(|text| {
            plausible_halves(text).is_some_and(|(artist, title)| {
                !artist.to_lowercase().starts_with("http") && !title.to_lowercase().starts_with("http")
            })
        })
        .collect()
}

fn text_lines(document: &Html) -> Vec<String> {
    let all_text: String = document.root_element().text().collect();

    all_text
        .lines()
        .map(str::trim)
        .filter(|line| line.contains(" - ") && within_length(line))
        .filter(|line| !contains_any(line, TEXT_LINE_SKIP_WORDS))
        .filter(|line| TEXT_LINE_TRACK.is_match(line))
        .filter(|line| plausible_halves(line).is_some())
        .map(str::to_string)
        .collect()
}

/// Candidate lines from the first extraction pass that finds any.
pub fn candidate_lines(document: &Html) -> Vec<String> {
    let passes: [(&str, fn(&Html) -> Vec<String>); 3] = [
        ("track markup", track_value_lines),
        ("text elements", element_lines),
        ("page text", text_lines),
    ];
    for (name, pass) in passes {
        let lines = pass(document);
        if !lines.is_empty() {
            tracing::debug!(pass = name, candidates = lines.len(), "extracted tracklist lines");
            return lines;
        }
    }
    Vec::new()
}

/// Parse a page into its title and normalized tracks.
pub fn parse_page(html: &str) -> (String, NormalizeReport) {
    let document = Html::parse_document(html);
    let title = page_title(&document);
    let lines = candidate_lines(&document);
    let report = LineNormalizer::new(NormalizerConfig::page_tracklist()).normalize_lines(&lines);
    (title, report)
}

pub fn fetch_page(client: &reqwest::blocking::Client, url: &str) -> Result<String> {
    client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.text())
        .with_context(|| format!("Error fetching URL {}", url))
}

pub fn load(client: &reqwest::blocking::Client, url: &str) -> Result<SourceTracks> {
    let html = fetch_page(client, url)?;
    let (title, report) = parse_page(&html);
    tracing::info!(title = %title, tracks = report.tracks.len(), "parsed tracklist page");

    if report.tracks.is_empty() {
        bail!("No tracks found on {}", url);
    }

    Ok(SourceTracks {
        title,
        tracks: report.tracks.queries(),
        folder_mode: SanitizeMode::Strict,
        dash_fallback: false,
    })
}
