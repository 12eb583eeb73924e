//! Run the tracklist line cleaner over a file or stdin and show what it keeps.
//!
//! Usage: normalize-lines [FILE] [--separator hyphen|spaced] [--blacklist a,b] [--mix-blacklist] [--json]
//!
//! Accepted tracks go to stdout as "Artist - Title", followed by one
//! `[SKIP]` line per discarded input line.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;

use dj2mp3::models::Separator;
use dj2mp3::normalize::{LineNormalizer, NormalizerConfig, MIX_BLACKLIST};
use dj2mp3::progress::init_logging;

#[derive(Parser, Debug)]
#[command(name = "normalize-lines")]
#[command(about = "Clean raw tracklist lines into Artist/Title pairs")]
struct Args {
    /// Input file (default: stdin)
    input: Option<PathBuf>,

    /// Artist/title separator
    #[arg(long, value_enum, default_value = "hyphen")]
    separator: Separator,

    /// Extra title denylist terms (comma-separated, case-insensitive)
    #[arg(long, value_delimiter = ',')]
    blacklist: Vec<String>,

    /// Add the mix denylist (intro, outro, mixout, timestamp, setlist)
    #[arg(long)]
    mix_blacklist: bool,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

fn read_input(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging("dj2mp3=warn");

    let mut terms: Vec<String> = args.blacklist.clone();
    if args.mix_blacklist {
        terms.extend(MIX_BLACKLIST.iter().map(|t| t.to_string()));
    }
    let config = NormalizerConfig::new(args.separator).with_blacklist(terms);

    let content = read_input(args.input.as_ref())?;
    let report = LineNormalizer::new(config).normalize_lines(content.lines());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for track in &report.tracks {
        println!("{}", track.display());
    }
    for discard in &report.discards {
        println!(
            "[SKIP] {}: '{}' -> '{}'",
            discard.reason, discard.line, discard.cleaned
        );
    }
    eprintln!(
        "{} kept, {} skipped",
        report.tracks.len(),
        report.discards.len()
    );

    Ok(())
}
