//! A local text file with one track per line.

use anyhow::Result;
use std::path::Path;

use super::SourceTracks;
use crate::normalize::{LineNormalizer, NormalizerConfig};
use crate::sanitize::SanitizeMode;
use crate::tracklist_file::read_track_lines;

/// Load `path`. Lines are taken as ready-made search strings unless `parse`
/// is set, in which case they go through the comment-tracklist normalizer.
pub fn load(path: &Path, parse: bool) -> Result<SourceTracks> {
    let lines = read_track_lines(path)?;

    let tracks = if parse {
        let report = LineNormalizer::new(NormalizerConfig::comment_tracklist()).normalize_lines(&lines);
        tracing::info!(
            kept = report.tracks.len(),
            discarded = report.discards.len(),
            "parsed track file"
        );
        report.tracks.queries()
    } else {
        lines
    };

    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tracklist".to_string());

    Ok(SourceTracks {
        title,
        tracks,
        folder_mode: SanitizeMode::Strict,
        dash_fallback: true,
    })
}
