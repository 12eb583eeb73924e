//! The Soulseek download run shared by every source.
//!
//! prepare folder -> write tracklist -> sldl -> flatten -> reconcile -> not_found.txt

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::SoulseekCredentials;
use crate::flatten::{flatten_directory, FlattenStats, AUDIO_EXTENSIONS};
use crate::models::SldlStatus;
use crate::progress::{create_spinner, format_duration};
use crate::reconcile::reconcile_directory;
use crate::safety::{validate_flatten_root, validate_folder_name};
use crate::sanitize::sanitize_filename;
use crate::sldl::{command_for, SldlOptions};
use crate::sources::SourceTracks;
use crate::tracklist_file::{write_not_found, write_tracklist, NOT_FOUND_FILE, TRACKLIST_FILE};

/// A download folder with its tracklist written, ready for the downloader.
#[derive(Debug)]
pub struct PreparedDownload {
    pub root: PathBuf,
    pub tracklist_path: PathBuf,
    pub lines_written: usize,
}

/// Create `output_dir/<sanitized title>` and write the tracklist into it.
pub fn prepare_download(output_dir: &Path, source: &SourceTracks) -> Result<PreparedDownload> {
    if source.tracks.is_empty() {
        bail!("No tracks to download for '{}'", source.title);
    }

    let folder_name = sanitize_filename(&source.title, source.folder_mode);
    validate_folder_name(&folder_name)?;
    let root = output_dir.join(&folder_name);
    validate_flatten_root(output_dir, &root)?;

    fs::create_dir_all(&root)
        .with_context(|| format!("Failed to create download folder {}", root.display()))?;

    let tracklist_path = root.join(TRACKLIST_FILE);
    let lines_written = write_tracklist(&tracklist_path, &source.tracks, source.dash_fallback)?;
    println!(
        "Wrote {} lines for {} tracks to {}",
        lines_written,
        source.tracks.len(),
        tracklist_path.display()
    );

    Ok(PreparedDownload {
        root,
        tracklist_path,
        lines_written,
    })
}

#[derive(Debug)]
pub struct FinalizeReport {
    pub flatten: FlattenStats,
    pub total: usize,
    pub not_found: Vec<String>,
}

impl FinalizeReport {
    pub fn found(&self) -> usize {
        self.total - self.not_found.len()
    }
}

/// Flatten the download folder, then record which primary tracks left no file.
pub fn finalize_download(root: &Path, tracks: &[String]) -> Result<FinalizeReport> {
    let flatten = flatten_directory(root, AUDIO_EXTENSIONS)?;
    tracing::info!(
        moved = flatten.moved,
        removed_dirs = flatten.removed_dirs,
        "flattened {}",
        root.display()
    );

    let not_found = reconcile_directory(tracks, root)?;
    write_not_found(&root.join(NOT_FOUND_FILE), &not_found)?;

    Ok(FinalizeReport {
        flatten,
        total: tracks.len(),
        not_found,
    })
}

pub struct SoulseekRun<'a> {
    pub output_dir: &'a Path,
    pub sldl_program: &'a Path,
    pub credentials: SoulseekCredentials,
    pub options: SldlOptions,
}

impl SoulseekRun<'_> {
    pub fn execute(self, source: &SourceTracks) -> Result<FinalizeReport> {
        let start = Instant::now();
        let prepared = prepare_download(self.output_dir, source)?;

        let command = command_for(
            self.sldl_program,
            &prepared.tracklist_path,
            &prepared.root,
            self.credentials,
            self.options,
        );
        println!("Running: {}", command.masked_command_line());
        let outcome = command.run()?;

        if !outcome.status.success() {
            tracing::warn!(status = %outcome.status, "sldl exited unsuccessfully, checking what was downloaded");
        }
        if !outcome.statuses.is_empty() {
            println!(
                "sldl reported: {} downloaded, {} failed, {} waiting",
                outcome.statuses.count(SldlStatus::Downloaded),
                outcome.statuses.count(SldlStatus::Failed),
                outcome.statuses.count(SldlStatus::Waiting)
            );
            for (track, status) in outcome.statuses.iter() {
                if status == SldlStatus::Failed {
                    tracing::info!(track = %track, "sldl reported failure");
                }
            }
        }

        let spinner = create_spinner("Organizing downloads");
        let report = finalize_download(&prepared.root, &source.tracks);
        spinner.finish_and_clear();
        let report = report?;

        if report.not_found.is_empty() {
            println!("All tracks found.");
        } else {
            println!("Tracks not found ({}):", report.not_found.len());
            for track in &report.not_found {
                println!("  {}", track);
            }
            println!("List written to {}", prepared.root.join(NOT_FOUND_FILE).display());
        }
        println!(
            "Summary: {}/{} tracks downloaded successfully.",
            report.found(),
            report.total
        );
        tracing::info!(elapsed = %format_duration(start.elapsed()), "download run finished");

        Ok(report)
    }
}
