use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use dj2mp3::config::{
    resolve_sldl_path, SoulseekCredentials, SpotifyCredentials, SOULSEEK_CREDENTIALS_FILE,
    SPOTIFY_CREDENTIALS_FILE,
};
use dj2mp3::normalize::NormalizerConfig;
use dj2mp3::pipeline::SoulseekRun;
use dj2mp3::progress::{init_logging, set_log_only};
use dj2mp3::sanitize::SanitizeMode;
use dj2mp3::sldl::SldlOptions;
use dj2mp3::sources::{self, SourceTracks};

#[derive(Parser, Debug)]
#[command(name = "dj2mp3")]
#[command(about = "Download the tracks of a DJ tracklist from Soulseek via sldl.")]
struct Cli {
    /// Hide progress bars; print plain progress lines instead
    #[arg(long, global = true)]
    log_only: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tracks scraped from a 1001tracklists page
    Tracklist(TracklistArgs),

    /// Tracks of a Spotify playlist
    Spotify(SpotifyArgs),

    /// Tracklist posted in a YouTube comment (URL with v= and lc=)
    Youtube(YoutubeArgs),

    /// Tracks listed one per line in a local text file
    File(FileArgs),
}

#[derive(Parser, Debug, Clone)]
struct DownloadArgs {
    /// Output directory; each run downloads into a subfolder named after the source
    #[arg(short = 'd', long)]
    directory: PathBuf,

    /// Preferred formats, comma-separated
    #[arg(long, default_value = "mp3,flac,wav")]
    pref_format: String,

    /// Minimum bitrate in kbps
    #[arg(long, default_value_t = 256)]
    min_bitrate: u32,

    /// sldl executable (default: next to this binary, then PATH)
    #[arg(long, env = "SLDL_PATH")]
    sldl: Option<PathBuf>,

    /// File with SOULSEEK_USER= and SOULSEEK_PASS= lines
    #[arg(long, env = "SOULSEEK_CREDENTIALS", default_value = SOULSEEK_CREDENTIALS_FILE)]
    soulseek_credentials: PathBuf,
}

#[derive(Parser, Debug)]
struct TracklistArgs {
    /// 1001tracklists URL
    url: String,

    #[command(flatten)]
    download: DownloadArgs,
}

#[derive(Parser, Debug)]
struct SpotifyArgs {
    /// Spotify playlist URL or id
    playlist_url: String,

    /// File with CLIENT_ID= and CLIENT_SECRET= lines
    #[arg(long, env = "SPOTIFY_CREDENTIALS", default_value = SPOTIFY_CREDENTIALS_FILE)]
    spotify_credentials: PathBuf,

    #[command(flatten)]
    download: DownloadArgs,
}

#[derive(Parser, Debug)]
struct YoutubeArgs {
    /// YouTube comment URL
    comment_url: String,

    /// yt-dlp executable
    #[arg(long, env = "YT_DLP_PATH", default_value = "yt-dlp")]
    yt_dlp: PathBuf,

    #[command(flatten)]
    download: DownloadArgs,
}

#[derive(Parser, Debug)]
struct FileArgs {
    /// Text file, one "Artist Title" per line
    tracklist: PathBuf,

    /// Run lines through the comment-tracklist cleaner instead of using them as-is
    #[arg(long)]
    parse: bool,

    #[command(flatten)]
    download: DownloadArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    set_log_only(cli.log_only);
    init_logging("dj2mp3=info");

    match cli.cmd {
        Command::Tracklist(args) => cmd_tracklist(args),
        Command::Spotify(args) => cmd_spotify(args),
        Command::Youtube(args) => cmd_youtube(args),
        Command::File(args) => cmd_file(args),
    }
}

fn download(args: &DownloadArgs, credentials: SoulseekCredentials, source: &SourceTracks) -> Result<()> {
    let sldl = resolve_sldl_path(args.sldl.as_deref());
    let run = SoulseekRun {
        output_dir: &args.directory,
        sldl_program: &sldl,
        credentials,
        options: SldlOptions {
            pref_format: args.pref_format.clone(),
            min_bitrate: args.min_bitrate,
        },
    };
    run.execute(source)?;
    Ok(())
}

/// Credentials are read before any network or file work starts.
fn soulseek_credentials(args: &DownloadArgs) -> Result<SoulseekCredentials> {
    SoulseekCredentials::from_file(&args.soulseek_credentials)
}

fn cmd_tracklist(args: TracklistArgs) -> Result<()> {
    let credentials = soulseek_credentials(&args.download)?;
    println!("Fetching tracklist from: {}", args.url);
    let client = sources::http_client()?;
    let source = sources::tracklist_page::load(&client, &args.url)?;
    println!("Found {} tracks in '{}'", source.tracks.len(), source.title);
    download(&args.download, credentials, &source)
}

fn cmd_spotify(args: SpotifyArgs) -> Result<()> {
    let credentials = soulseek_credentials(&args.download)?;
    let spotify = SpotifyCredentials::from_file(&args.spotify_credentials)?;
    println!("Fetching tracks from Spotify playlist: {}", args.playlist_url);
    let source = sources::spotify::load(sources::http_client()?, &spotify, &args.playlist_url)?;
    println!("Fetched {} tracks from playlist '{}'", source.tracks.len(), source.title);
    download(&args.download, credentials, &source)
}

fn cmd_youtube(args: YoutubeArgs) -> Result<()> {
    let credentials = soulseek_credentials(&args.download)?;
    let tracklist = sources::youtube::load(
        &args.yt_dlp,
        &args.comment_url,
        NormalizerConfig::comment_tracklist(),
    )?;
    println!("Parsed {} tracks from comment.", tracklist.report.tracks.len());
    if tracklist.report.tracks.is_empty() {
        bail!("No valid 'Artist Title' entries found.");
    }

    let source = SourceTracks {
        title: tracklist.title,
        tracks: tracklist.report.tracks.queries(),
        folder_mode: SanitizeMode::Strict,
        dash_fallback: false,
    };
    download(&args.download, credentials, &source)
}

fn cmd_file(args: FileArgs) -> Result<()> {
    let credentials = soulseek_credentials(&args.download)?;
    let source = sources::text_file::load(&args.tracklist, args.parse)?;
    println!(
        "Read {} tracks from {}",
        source.tracks.len(),
        display_name(&args.tracklist)
    );
    if source.tracks.is_empty() {
        bail!("No tracks found in {}", args.tracklist.display());
    }
    download(&args.download, credentials, &source)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
