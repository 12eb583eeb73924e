//! Tracklist and not-found file I/O.

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::normalize::MULTI_SPACE;

pub const TRACKLIST_FILE: &str = "tracklist.txt";
pub const NOT_FOUND_FILE: &str = "not_found.txt";

/// Hyphen-less retry query for a track containing a hyphen: "Jay-Z Encore" -> "JayZ Encore".
pub fn dash_fallback(track: &str) -> Option<String> {
    if !track.contains('-') {
        return None;
    }
    let stripped = track.replace('-', "");
    let fallback = MULTI_SPACE.replace_all(&stripped, " ").trim().to_string();
    if fallback.is_empty() {
        None
    } else {
        Some(fallback)
    }
}

/// Lines of the tracklist file, unquoted. Fallback lines follow their track
/// and are dropped when identical to a line already emitted.
pub fn tracklist_lines<S: AsRef<str>>(tracks: &[S], with_dash_fallback: bool) -> Vec<String> {
    let mut written: FxHashSet<String> = FxHashSet::default();
    let mut lines = Vec::with_capacity(tracks.len());

    for track in tracks {
        let track = track.as_ref();
        lines.push(track.to_string());
        written.insert(track.to_string());

        if !with_dash_fallback {
            continue;
        }
        if let Some(fallback) = dash_fallback(track) {
            if written.insert(fallback.clone()) {
                lines.push(fallback);
            }
        }
    }

    lines
}

fn write_lines_atomic<I, S>(path: &Path, lines: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let tmp = path.with_extension("txt.tmp");
    {
        let f = fs::File::create(&tmp).with_context(|| format!("Create {}", tmp.display()))?;
        let mut w = BufWriter::new(f);
        for line in lines {
            w.write_all(line.as_ref().as_bytes())?;
            w.write_all(b"\n")?;
        }
        w.flush()?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("Rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

/// Write the downloader input: one double-quoted query per line. Returns the line count.
pub fn write_tracklist<S: AsRef<str>>(
    path: &Path,
    tracks: &[S],
    with_dash_fallback: bool,
) -> Result<usize> {
    let lines = tracklist_lines(tracks, with_dash_fallback);
    write_lines_atomic(path, lines.iter().map(|l| format!("\"{}\"", l)))?;
    Ok(lines.len())
}

/// One unquoted track per line; an empty list still produces the file.
pub fn write_not_found<S: AsRef<str>>(path: &Path, tracks: &[S]) -> Result<()> {
    write_lines_atomic(path, tracks)
}

/// Read a user-supplied track file: trimmed, non-empty lines.
pub fn read_track_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read tracklist file '{}'", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}
