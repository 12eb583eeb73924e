//! Download MP3s from YouTube for a tracklist posted in a YouTube comment.
//!
//! Usage: setlist-to-mp3 <COMMENT_URL> -d <DIR> [--workers 4] [--min-duration 150] [--max-duration 630]
//!
//! Each "Artist - Title" is searched on YouTube, the first result of
//! plausible length is downloaded as `NN - Artist - Title.mp3` and tagged.
//! Everything that was skipped is listed in `download_log.txt`.

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use dj2mp3::normalize::NormalizerConfig;
use dj2mp3::progress::{format_duration, init_logging, set_log_only};
use dj2mp3::sources::youtube;
use dj2mp3::youtube_dl::{DurationBounds, YoutubeDownloader, YtDlp, DOWNLOAD_LOG_FILE};

#[derive(Parser, Debug)]
#[command(name = "setlist-to-mp3")]
#[command(about = "Download MP3s from a YouTube comment tracklist.")]
struct Args {
    /// YouTube comment URL (with v and lc parameters)
    comment_url: String,

    /// Output directory
    #[arg(short = 'd', long)]
    directory: PathBuf,

    /// Minimum duration (s)
    #[arg(long, default_value_t = 150)]
    min_duration: u32,

    /// Maximum duration (s)
    #[arg(long, default_value_t = 630)]
    max_duration: u32,

    /// Concurrent downloads
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// yt-dlp executable
    #[arg(long, env = "YT_DLP_PATH", default_value = "yt-dlp")]
    yt_dlp: PathBuf,

    /// Hide the progress bar; print plain progress lines instead
    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.log_only);
    init_logging("dj2mp3=info");

    if args.min_duration > args.max_duration {
        bail!(
            "--min-duration ({}) must not exceed --max-duration ({})",
            args.min_duration,
            args.max_duration
        );
    }

    let start = Instant::now();
    let tracklist = youtube::load(&args.yt_dlp, &args.comment_url, NormalizerConfig::mix_tracklist())?;
    let tracks = tracklist.report.tracks.displays();
    println!("Parsed {} tracks from comment.", tracks.len());
    if tracks.is_empty() {
        bail!("No valid 'Artist - Title' entries found.");
    }

    let yt_dlp = YtDlp::new(&args.yt_dlp);
    let bounds = DurationBounds {
        min_secs: f64::from(args.min_duration),
        max_secs: f64::from(args.max_duration),
    };
    let downloader = YoutubeDownloader::new(&yt_dlp, &args.directory, bounds, &args.comment_url)?;

    println!("Starting processing with {} workers...", args.workers);
    let summary = downloader.run(&tracks, args.workers)?;

    println!(
        "\nDone. {} succeeded, {} skipped.",
        summary.success.len(),
        summary.skipped.len()
    );
    if !summary.skipped.is_empty() {
        println!("See {} for details on skipped tracks.", DOWNLOAD_LOG_FILE);
    }
    println!("Elapsed: {}", format_duration(start.elapsed()));

    Ok(())
}
