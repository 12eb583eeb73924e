//! Post-download directory flattening.
//!
//! The Soulseek downloader mirrors the remote user's folder layout. This moves
//! every audio file up into the download root and drops the emptied folders.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions treated as audio (lowercase, no dot).
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "wav", "aac", "ogg", "m4a", "wma", "alac", "aiff", "ape", "opus", "wv", "tta",
    "ac3", "dts", "amr", "3gp", "mid", "midi", "mod", "xm", "it", "s3m", "mp2", "mp1", "au", "ra",
    "ram", "m4b", "m4p", "mpga", "spx", "oga", "caf", "dsf", "dff", "tak", "shn", "aif", "aifc",
    "snd", "kar",
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlattenStats {
    pub moved: usize,
    pub removed_dirs: usize,
}

pub fn has_extension_in(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_lowercase();
            extensions.iter().any(|x| *x == e)
        })
        .unwrap_or(false)
}

/// First free `root/{stem}{ext}`, then `root/{stem}_1{ext}`, `root/{stem}_2{ext}`, ...
fn free_destination(root: &Path, file_name: &Path) -> PathBuf {
    let dst = root.join(file_name);
    if !dst.exists() {
        return dst;
    }
    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file_name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1usize;
    loop {
        let candidate = root.join(format!("{stem}_{counter}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

fn move_file(src: &Path, dst: &Path) -> Result<()> {
    match fs::rename(src, dst) {
        Ok(_) => Ok(()),
        Err(e) => {
            // Cross-device fallback
            fs::copy(src, dst).with_context(|| {
                format!("Copy {} -> {} after rename error: {}", src.display(), dst.display(), e)
            })?;
            fs::remove_file(src).with_context(|| format!("Remove {} after copy", src.display()))?;
            Ok(())
        }
    }
}

/// Move audio files from nested folders into `root`, then remove folders left empty.
///
/// Walks bottom-up so a parent emptied by its children is removed in the same pass.
/// Non-audio files stay where they are, which keeps their folders alive.
pub fn flatten_directory(root: &Path, audio_extensions: &[&str]) -> Result<FlattenStats> {
    let entries = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to walk {}", root.display()))?;

    let mut stats = FlattenStats::default();

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type();

        if file_type.is_file() {
            if entry.depth() == 1 || !has_extension_in(path, audio_extensions) {
                continue;
            }
            let dst = free_destination(root, Path::new(entry.file_name()));
            move_file(path, &dst)?;
            tracing::debug!(from = %path.display(), to = %dst.display(), "moved audio file");
            stats.moved += 1;
        } else if file_type.is_dir() {
            let is_empty = fs::read_dir(path)
                .with_context(|| format!("Failed to list {}", path.display()))?
                .next()
                .is_none();
            if is_empty {
                fs::remove_dir(path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                stats.removed_dirs += 1;
            }
        }
    }

    Ok(stats)
}
