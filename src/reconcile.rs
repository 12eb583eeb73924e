//! Post-download reconciliation: which tracks did not produce a file?
//!
//! Best-effort name matching. The downloader may rename files however it
//! likes, so both false positives and false negatives are possible.

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use std::fs;
use std::path::Path;

use crate::sanitize::{sanitize_filename, SanitizeMode};

/// Comparable form of a track string or file stem.
pub fn match_key(s: &str) -> String {
    sanitize_filename(s, SanitizeMode::Strict).to_lowercase()
}

/// Match keys of the regular files directly inside `dir`, extension stripped.
pub fn present_basenames(dir: &Path) -> Result<FxHashSet<String>> {
    let mut names = FxHashSet::default();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if let Some(stem) = path.file_stem() {
            names.insert(match_key(&stem.to_string_lossy()));
        }
    }
    Ok(names)
}

/// Tracks whose match key is absent from `present`, in input order.
pub fn not_found<S: AsRef<str>>(tracks: &[S], present: &FxHashSet<String>) -> Vec<String> {
    tracks
        .iter()
        .map(AsRef::as_ref)
        .filter(|track| !present.contains(&match_key(track)))
        .map(str::to_string)
        .collect()
}

pub fn reconcile_directory<S: AsRef<str>>(tracks: &[S], dir: &Path) -> Result<Vec<String>> {
    let present = present_basenames(dir)?;
    Ok(not_found(tracks, &present))
}
