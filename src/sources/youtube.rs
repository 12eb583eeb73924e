//! Tracklists posted as a YouTube comment.
//!
//! The comment is addressed by a watch URL carrying both the video id (`v`)
//! and the comment id (`lc`). Video metadata and comments come from `yt-dlp`.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use url::Url;

use crate::models::NormalizeReport;
use crate::normalize::{LineNormalizer, NormalizerConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentUrl {
    pub video_id: String,
    pub comment_id: String,
}

impl CommentUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|_| anyhow!("Invalid URL: must include v and lc parameters."))?;
        let param = |key: &str| {
            url.query_pairs()
                .find(|(k, v)| k == key && !v.is_empty())
                .map(|(_, v)| v.into_owned())
        };
        match (param("v"), param("lc")) {
            (Some(video_id), Some(comment_id)) => Ok(Self {
                video_id,
                comment_id,
            }),
            _ => bail!("Invalid URL: must include v and lc parameters."),
        }
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub text: String,
}

/// The subset of `yt-dlp --dump-single-json` output used here.
#[derive(Debug, Deserialize)]
pub struct VideoInfo {
    pub title: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl VideoInfo {
    pub fn comment(&self, id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    pub fn folder_title(&self, video_id: &str) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => format!("video_{}", video_id),
        }
    }
}

pub fn fetch_video_info(yt_dlp: &Path, url: &CommentUrl) -> Result<VideoInfo> {
    let output = Command::new(yt_dlp)
        .args([
            "--skip-download",
            "--write-comments",
            "--dump-single-json",
            "--no-warnings",
            "--extractor-args",
            "youtube:comment_sort=top",
        ])
        .arg(url.watch_url())
        .output()
        .with_context(|| format!("Failed to run {}", yt_dlp.display()))?;

    if !output.status.success() {
        bail!(
            "yt-dlp failed for video {}: {}",
            url.video_id,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    serde_json::from_slice(&output.stdout).context("Failed to decode yt-dlp video JSON")
}

/// A parsed comment tracklist and the title of the video it was posted on.
#[derive(Debug)]
pub struct CommentTracklist {
    pub title: String,
    pub report: NormalizeReport,
}

/// Find the addressed comment in `info` and normalize its lines.
pub fn tracklist_from_info(
    info: &VideoInfo,
    url: &CommentUrl,
    config: NormalizerConfig,
) -> Result<CommentTracklist> {
    let comment = info
        .comment(&url.comment_id)
        .filter(|c| !c.text.trim().is_empty())
        .ok_or_else(|| anyhow!("Comment not found."))?;

    let report = LineNormalizer::new(config).normalize_lines(comment.text.lines());
    Ok(CommentTracklist {
        title: info.folder_title(&url.video_id),
        report,
    })
}

pub fn load(yt_dlp: &Path, raw_url: &str, config: NormalizerConfig) -> Result<CommentTracklist> {
    let url = CommentUrl::parse(raw_url)?;
    tracing::info!(video = %url.video_id, comment = %url.comment_id, "fetching comment");
    let info = fetch_video_info(yt_dlp, &url)?;
    let tracklist = tracklist_from_info(&info, &url, config)?;
    tracing::info!(
        tracks = tracklist.report.tracks.len(),
        discarded = tracklist.report.discards.len(),
        "parsed tracks from comment"
    );
    Ok(tracklist)
}
