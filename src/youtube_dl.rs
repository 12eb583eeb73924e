//! Direct YouTube variant: search each track, pick a plausible upload,
//! download it as MP3 and tag it.
//!
//! Tracks run on a rayon pool. The summary and the log file share one lock
//! so log entries and summary rows stay in step.

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::Deserialize;
use std::ffi::OsStr;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use crate::models::DownloadSummary;
use crate::progress::{create_progress_bar, log_progress};
use crate::sanitize::{sanitize_filename, SanitizeMode};

pub const DOWNLOAD_LOG_FILE: &str = "download_log.txt";

/// Lowercased substrings that disqualify a search result title.
pub const TITLE_BLACKLIST: &[&str] = &["live", "dj set"];

const SEARCH_RESULTS: usize = 5;

// ============================================================================
// Search results
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SearchEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Seconds. Missing durations count as zero.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl SearchEntry {
    pub fn page_url(&self) -> String {
        self.webpage_url
            .clone()
            .or_else(|| self.url.clone())
            .unwrap_or_else(|| {
                format!(
                    "https://www.youtube.com/watch?v={}",
                    self.id.as_deref().unwrap_or_default()
                )
            })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    entries: Vec<SearchEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationBounds {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl Default for DurationBounds {
    fn default() -> Self {
        Self {
            min_secs: 150.0,
            max_secs: 630.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    TooShort,
    TooLong,
    Blacklisted,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::TooShort => "too short",
            RejectReason::TooLong => "too long",
            RejectReason::Blacklisted => "blacklisted",
        }
    }
}

#[derive(Debug, Default)]
pub struct Selection<'a> {
    pub chosen: Option<&'a SearchEntry>,
    /// (url, reason) for every entry passed over before the choice.
    pub rejected: Vec<(String, RejectReason)>,
}

/// First entry inside the duration bounds whose title avoids [`TITLE_BLACKLIST`].
pub fn select_entry(entries: &[SearchEntry], bounds: DurationBounds) -> Selection<'_> {
    let mut selection = Selection::default();
    for entry in entries {
        let duration = entry.duration.unwrap_or(0.0);
        let title = entry.title.as_deref().unwrap_or_default().to_lowercase();

        let reason = if duration < bounds.min_secs {
            Some(RejectReason::TooShort)
        } else if duration > bounds.max_secs {
            Some(RejectReason::TooLong)
        } else if TITLE_BLACKLIST.iter().any(|t| title.contains(t)) {
            Some(RejectReason::Blacklisted)
        } else {
            None
        };

        match reason {
            Some(reason) => selection.rejected.push((entry.page_url(), reason)),
            None => {
                selection.chosen = Some(entry);
                break;
            }
        }
    }
    selection
}

// ============================================================================
// Search and download backend
// ============================================================================

/// Search and download backend. Implementations must be callable from many threads.
pub trait AudioSource: Sync {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchEntry>>;

    /// Download `url` as MP3; `output_template` ends in `.%(ext)s`.
    fn download(&self, url: &str, output_template: &Path) -> Result<()>;
}

pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&str], extra: &[&OsStr]) -> Result<Vec<u8>> {
        let output = Command::new(&self.program)
            .args(args)
            .args(extra)
            .output()
            .with_context(|| format!("Failed to run {}", self.program.display()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            bail!("yt-dlp exited with {}: {}", output.status, last.trim());
        }
        Ok(output.stdout)
    }
}

impl AudioSource for YtDlp {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchEntry>> {
        let target = format!("ytsearch{}:{}", limit, query);
        let stdout = self.run(
            &["--flat-playlist", "--dump-single-json", "--no-warnings"],
            &[OsStr::new(&target)],
        )?;
        let response: SearchResponse =
            serde_json::from_slice(&stdout).context("Failed to decode yt-dlp search JSON")?;
        Ok(response.entries)
    }

    fn download(&self, url: &str, output_template: &Path) -> Result<()> {
        self.run(
            &[
                "-f",
                "bestaudio/best",
                "--no-playlist",
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "0",
                "--quiet",
                "--no-warnings",
                "-o",
            ],
            &[output_template.as_os_str(), OsStr::new(url)],
        )?;
        Ok(())
    }
}

// ============================================================================
// Per-track processing
// ============================================================================

/// `NN - <track>` with reserved characters replaced; no extension.
pub fn output_stem(index: usize, track: &str) -> String {
    format!("{:02} - {}", index, sanitize_filename(track, SanitizeMode::Lenient))
}

pub fn download_log_header(date: &str, source_url: &str) -> String {
    format!(
        "=== Download Log ===\nDate: {}\nSource Comment: {}\n\n",
        date, source_url
    )
}

/// Write ID3 artist and title, keeping any existing frames.
pub fn tag_mp3(path: &Path, artist: &str, title: &str) -> Result<()> {
    use id3::TagLike;

    let mut tag = id3::Tag::read_from_path(path).unwrap_or_else(|_| id3::Tag::new());
    tag.set_artist(artist);
    tag.set_title(title);
    tag.write_to_path(path, id3::Version::Id3v24)
        .with_context(|| format!("Failed to write ID3 tag to {}", path.display()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Success { url: String },
    Skipped { reason: String },
}

pub struct YoutubeDownloader<'a, S: AudioSource> {
    source: &'a S,
    out_dir: PathBuf,
    bounds: DurationBounds,
    log_path: PathBuf,
    summary: Mutex<DownloadSummary>,
}

impl<'a, S: AudioSource> YoutubeDownloader<'a, S> {
    /// Create `out_dir` and start a fresh download log in it.
    pub fn new(source: &'a S, out_dir: &Path, bounds: DurationBounds, source_url: &str) -> Result<Self> {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;
        let log_path = out_dir.join(DOWNLOAD_LOG_FILE);
        let date = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        fs::write(&log_path, download_log_header(&date, source_url))
            .with_context(|| format!("Failed to initialise {}", log_path.display()))?;

        Ok(Self {
            source,
            out_dir: out_dir.to_path_buf(),
            bounds,
            log_path,
            summary: Mutex::new(DownloadSummary::default()),
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    fn append_log(&self, text: &str) {
        let result = OpenOptions::new()
            .append(true)
            .open(&self.log_path)
            .and_then(|mut f| f.write_all(text.as_bytes()));
        if let Err(e) = result {
            tracing::warn!(error = %e, "could not append to download log");
        }
    }

    /// Record an outcome and its log entry under one lock.
    fn record(&self, track: &str, outcome: &TrackOutcome, log_entry: Option<String>) {
        let mut summary = match self.summary.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match outcome {
            TrackOutcome::Success { url } => summary.success.push((track.to_string(), url.clone())),
            TrackOutcome::Skipped { reason } => {
                summary.skipped.push((track.to_string(), reason.clone()))
            }
        }
        if let Some(entry) = log_entry {
            self.append_log(&entry);
        }
    }

    /// Search, filter, download and tag one track. `index` is 1-based.
    pub fn process_track(&self, index: usize, track: &str) -> TrackOutcome {
        let entries = match self.source.search(track, SEARCH_RESULTS) {
            Ok(entries) => entries,
            Err(e) => {
                let reason = format!("search error: {:#}", e);
                let entry = format!("\n[SKIPPED] {} - {}\n", track, reason);
                let outcome = TrackOutcome::Skipped { reason };
                self.record(track, &outcome, Some(entry));
                return outcome;
            }
        };

        let selection = select_entry(&entries, self.bounds);
        let Some(chosen) = selection.chosen else {
            let mut entry = format!("\n[SKIPPED] {}\n", track);
            for (url, reason) in &selection.rejected {
                entry.push_str(&format!("  - {} ({})\n", url, reason.as_str()));
            }
            let outcome = TrackOutcome::Skipped {
                reason: "no valid match".to_string(),
            };
            self.record(track, &outcome, Some(entry));
            return outcome;
        };

        let url = chosen.page_url();
        let stem = output_stem(index, track);
        let template = self.out_dir.join(format!("{}.%(ext)s", stem));

        if let Err(e) = self.source.download(&url, &template) {
            let entry = format!("\n[FAILED] {} - download error: {:#}\n", track, e);
            let outcome = TrackOutcome::Skipped {
                reason: format!("download error: {:#}", e),
            };
            self.record(track, &outcome, Some(entry));
            return outcome;
        }

        let outcome = TrackOutcome::Success { url: url.clone() };
        self.record(track, &outcome, Some(format!("[SUCCESS] {} -> {}\n", track, url)));

        let mp3 = self.out_dir.join(format!("{}.mp3", stem));
        if mp3.is_file() {
            if let Some((artist, title)) = track.split_once(" - ") {
                if let Err(e) = tag_mp3(&mp3, artist.trim(), title.trim()) {
                    tracing::warn!(file = %mp3.display(), error = %e, "tagging failed");
                }
            }
        }

        outcome
    }

    /// Process every track on a pool of `workers` threads and return the summary.
    pub fn run(self, tracks: &[String], workers: usize) -> Result<DownloadSummary> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
            .context("Failed to build download thread pool")?;

        let total = tracks.len() as u64;
        let pb = create_progress_bar(total, "Tracks");
        let done = std::sync::atomic::AtomicU64::new(0);

        pool.install(|| {
            tracks.par_iter().enumerate().for_each(|(i, track)| {
                let outcome = self.process_track(i + 1, track);
                tracing::debug!(track = %track, ?outcome, "track finished");
                pb.inc(1);
                let n = done.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
                log_progress("tracks", n, total, 5);
            });
        });
        pb.finish_and_clear();

        Ok(match self.summary.into_inner() {
            Ok(summary) => summary,
            Err(poisoned) => poisoned.into_inner(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;
    use tempfile::TempDir;

    fn entry(id: &str, title: &str, duration: Option<f64>) -> SearchEntry {
        SearchEntry {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
            duration,
            webpage_url: None,
            url: None,
        }
    }

    #[derive(Default)]
    struct FakeSource {
        results: FxHashMap<String, Vec<SearchEntry>>,
        broken_urls: Vec<String>,
    }

    impl AudioSource for FakeSource {
        fn search(&self, query: &str, _limit: usize) -> Result<Vec<SearchEntry>> {
            match self.results.get(query) {
                Some(entries) => Ok(entries.clone()),
                None => bail!("network unreachable"),
            }
        }

        fn download(&self, url: &str, output_template: &Path) -> Result<()> {
            if self.broken_urls.iter().any(|u| u == url) {
                bail!("HTTP Error 403");
            }
            let path = output_template.to_string_lossy().replace("%(ext)s", "mp3");
            fs::write(path, b"")?;
            Ok(())
        }
    }

    #[test]
    fn test_select_entry_filters_in_order() {
        let entries = vec![
            entry("a", "Bicep - Glue (short edit)", Some(90.0)),
            entry("b", "Bicep - Glue (extended)", Some(900.0)),
            entry("c", "Bicep - Glue LIVE at Printworks", Some(300.0)),
            entry("d", "Bicep - Glue", Some(269.0)),
            entry("e", "Bicep - Glue (again)", Some(270.0)),
        ];
        let selection = select_entry(&entries, DurationBounds::default());

        assert_eq!(selection.chosen.and_then(|e| e.id.as_deref()), Some("d"));
        let reasons: Vec<RejectReason> = selection.rejected.iter().map(|(_, r)| *r).collect();
        assert_eq!(
            reasons,
            vec![RejectReason::TooShort, RejectReason::TooLong, RejectReason::Blacklisted]
        );
        assert_eq!(selection.rejected[0].0, "https://www.youtube.com/watch?v=a");
    }

    #[test]
    fn test_select_entry_missing_duration_is_too_short() {
        let entries = vec![entry("a", "Song", None)];
        let selection = select_entry(&entries, DurationBounds::default());
        assert!(selection.chosen.is_none());
        assert_eq!(selection.rejected[0].1, RejectReason::TooShort);
    }

    #[test]
    fn test_decode_flat_search_json() {
        let json = r#"{"entries": [
            {"id": "x1", "title": "Four Tet - Baby", "duration": 275.0, "url": "https://www.youtube.com/watch?v=x1"},
            {"id": "x2", "title": "Four Tet - Baby", "duration": null}
        ]}"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.entries.len(), 2);
        assert_eq!(response.entries[0].page_url(), "https://www.youtube.com/watch?v=x1");
        assert_eq!(response.entries[1].duration, None);
    }

    #[test]
    fn test_output_stem() {
        assert_eq!(output_stem(3, "AC/DC - Thunderstruck?"), "03 - AC_DC - Thunderstruck_");
        assert_eq!(output_stem(12, "Bicep - Glue"), "12 - Bicep - Glue");
    }

    #[test]
    fn test_run_outcomes_and_log() {
        let tmp = TempDir::new().unwrap();
        let mut source = FakeSource::default();
        source
            .results
            .insert("Bicep - Glue".to_string(), vec![entry("ok", "Bicep - Glue", Some(269.0))]);
        source.results.insert(
            "Four Tet - Baby".to_string(),
            vec![entry("short", "Four Tet - Baby", Some(30.0))],
        );
        source.results.insert(
            "Floating Points - Silhouettes".to_string(),
            vec![entry("bad", "Floating Points - Silhouettes", Some(300.0))],
        );
        source.broken_urls.push("https://www.youtube.com/watch?v=bad".to_string());

        let tracks: Vec<String> = [
            "Bicep - Glue",
            "Four Tet - Baby",
            "Floating Points - Silhouettes",
            "Unknown - Nothing",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let downloader = YoutubeDownloader::new(
            &source,
            tmp.path(),
            DurationBounds::default(),
            "https://www.youtube.com/watch?v=v&lc=c",
        )
        .unwrap();
        let log_path = downloader.log_path().to_path_buf();
        let summary = downloader.run(&tracks, 2).unwrap();

        assert_eq!(
            summary.success,
            vec![("Bicep - Glue".to_string(), "https://www.youtube.com/watch?v=ok".to_string())]
        );
        let mut skipped: Vec<(String, String)> = summary.skipped.clone();
        skipped.sort();
        assert_eq!(skipped.len(), 3);
        assert_eq!(skipped[0].0, "Floating Points - Silhouettes");
        assert!(skipped[0].1.starts_with("download error: HTTP Error 403"));
        assert_eq!(skipped[1], ("Four Tet - Baby".to_string(), "no valid match".to_string()));
        assert!(skipped[2].1.starts_with("search error: network unreachable"));

        assert!(tmp.path().join("01 - Bicep - Glue.mp3").is_file());

        let log = fs::read_to_string(&log_path).unwrap();
        assert!(log.starts_with("=== Download Log ===\nDate: "));
        assert!(log.contains("Source Comment: https://www.youtube.com/watch?v=v&lc=c\n"));
        assert!(log.contains("[SUCCESS] Bicep - Glue -> https://www.youtube.com/watch?v=ok\n"));
        assert!(log.contains("\n[SKIPPED] Four Tet - Baby\n  - https://www.youtube.com/watch?v=short (too short)\n"));
        assert!(log.contains("[FAILED] Floating Points - Silhouettes - download error: HTTP Error 403"));
    }

    #[test]
    fn test_tag_mp3_sets_artist_and_title() {
        use id3::TagLike;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("01 - Bicep - Glue.mp3");
        fs::write(&path, [0u8; 16]).unwrap();

        tag_mp3(&path, "Bicep", "Glue").unwrap();

        let tag = id3::Tag::read_from_path(&path).unwrap();
        assert_eq!(tag.artist(), Some("Bicep"));
        assert_eq!(tag.title(), Some("Glue"));
    }
}
