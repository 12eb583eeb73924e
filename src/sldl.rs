//! Driving the Soulseek batch downloader (`sldl`).
//!
//! The child's stdout and stderr are read on two threads and merged over a
//! channel so lines are echoed in arrival order while status lines are parsed.

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Sender};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use crate::config::SoulseekCredentials;
use crate::models::SldlStatus;

pub const OUTPUT_START: &str = "--- slsk-batchdl output ---";
pub const OUTPUT_END: &str = "--- slsk-batchdl finished ---";

static STATUS_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(Downloaded|Failed|Waiting): (.+)").unwrap());

/// Quality preferences passed through to the downloader.
#[derive(Debug, Clone)]
pub struct SldlOptions {
    /// Comma-separated, e.g. `mp3,flac,wav`.
    pub pref_format: String,
    pub min_bitrate: u32,
}

impl Default for SldlOptions {
    fn default() -> Self {
        Self {
            pref_format: "mp3,flac,wav".to_string(),
            min_bitrate: 256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SldlCommand {
    pub program: PathBuf,
    pub tracklist: PathBuf,
    pub output_dir: PathBuf,
    pub credentials: SoulseekCredentials,
    pub options: SldlOptions,
}

impl SldlCommand {
    fn build_args(&self, pass: &str) -> Vec<OsString> {
        vec![
            self.tracklist.clone().into_os_string(),
            "--user".into(),
            self.credentials.user.clone().into(),
            "--pass".into(),
            pass.into(),
            "--pref-format".into(),
            self.options.pref_format.clone().into(),
            "--min-bitrate".into(),
            self.options.min_bitrate.to_string().into(),
            "--input-type".into(),
            "list".into(),
            "-p".into(),
            self.output_dir.clone().into_os_string(),
        ]
    }

    /// Arguments in order, one per element. Nothing goes through a shell.
    pub fn args(&self) -> Vec<OsString> {
        self.build_args(&self.credentials.pass)
    }

    /// Printable command line with the password replaced by `***`.
    pub fn masked_command_line(&self) -> String {
        std::iter::once(self.program.clone().into_os_string())
            .chain(self.build_args("***"))
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion, echoing every output line between banner lines.
    pub fn run(&self) -> Result<SldlOutcome> {
        tracing::info!(command = %self.masked_command_line(), "starting sldl");

        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program.display()))?;

        let (tx, rx) = unbounded::<OutputLine>();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, Stream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, Stream::Stderr, tx.clone()));
        }
        drop(tx);

        println!("{}", OUTPUT_START);
        let mut statuses = StatusTable::default();
        for line in rx {
            match line.stream {
                Stream::Stdout => println!("{}", line.text),
                Stream::Stderr => eprintln!("{}", line.text),
            }
            if let Some((status, track)) = parse_status_line(&line.text) {
                statuses.record(track, status);
            }
        }
        println!("{}", OUTPUT_END);

        for reader in readers {
            if reader.join().is_err() {
                tracing::warn!("sldl output reader panicked");
            }
        }
        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for {}", self.program.display()))?;

        Ok(SldlOutcome { status, statuses })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

struct OutputLine {
    stream: Stream,
    text: String,
}

/// Forward every line of `pipe` until EOF. Bytes that are not UTF-8 are
/// replaced, never fatal: the pipe must stay drained or the child gets SIGPIPE.
fn pump_lines<R: Read>(pipe: R, mut forward: impl FnMut(String)) -> std::io::Result<()> {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&buf);
        forward(text.trim_end_matches(['\n', '\r']).to_string());
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: R,
    stream: Stream,
    tx: Sender<OutputLine>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        // A closed receiver only stops the echo; draining continues
        let result = pump_lines(pipe, |text| {
            let _ = tx.send(OutputLine { stream, text });
        });
        if let Err(e) = result {
            tracing::warn!(?stream, error = %e, "lost sldl output stream");
        }
    })
}

/// `Downloaded: X`, `Failed: X` or `Waiting: X` anywhere in the line.
pub fn parse_status_line(line: &str) -> Option<(SldlStatus, String)> {
    let caps = STATUS_LINE.captures(line)?;
    let status = match &caps[1] {
        "Downloaded" => SldlStatus::Downloaded,
        "Failed" => SldlStatus::Failed,
        _ => SldlStatus::Waiting,
    };
    let track = caps[2].trim();
    (!track.is_empty()).then(|| (status, track.to_string()))
}

/// Latest reported status per track, in first-reported order.
#[derive(Debug, Default)]
pub struct StatusTable {
    order: Vec<String>,
    latest: FxHashMap<String, SldlStatus>,
}

impl StatusTable {
    pub fn record(&mut self, track: String, status: SldlStatus) {
        if self.latest.insert(track.clone(), status).is_none() {
            self.order.push(track);
        }
    }

    pub fn count(&self, status: SldlStatus) -> usize {
        self.latest.values().filter(|s| **s == status).count()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SldlStatus)> + '_ {
        self.order
            .iter()
            .filter_map(move |t| self.latest.get(t).map(|s| (t.as_str(), *s)))
    }
}

#[derive(Debug)]
pub struct SldlOutcome {
    pub status: ExitStatus,
    pub statuses: StatusTable,
}

/// Program, tracklist file and output dir for a download run rooted at `root`.
pub fn command_for(
    program: &Path,
    tracklist: &Path,
    root: &Path,
    credentials: SoulseekCredentials,
    options: SldlOptions,
) -> SldlCommand {
    SldlCommand {
        program: program.to_path_buf(),
        tracklist: tracklist.to_path_buf(),
        output_dir: root.to_path_buf(),
        credentials,
        options,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> SldlCommand {
        command_for(
            Path::new("sldl"),
            Path::new("out/Mix/tracklist.txt"),
            Path::new("out/Mix"),
            SoulseekCredentials {
                user: "dj".to_string(),
                pass: "hunter2".to_string(),
            },
            SldlOptions::default(),
        )
    }

    #[test]
    fn test_args_order() {
        let args: Vec<String> = command()
            .args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "out/Mix/tracklist.txt",
                "--user",
                "dj",
                "--pass",
                "hunter2",
                "--pref-format",
                "mp3,flac,wav",
                "--min-bitrate",
                "256",
                "--input-type",
                "list",
                "-p",
                "out/Mix",
            ]
        );
    }

    #[test]
    fn test_masked_command_line() {
        let line = command().masked_command_line();
        assert!(line.starts_with("sldl out/Mix/tracklist.txt --user dj --pass *** "));
        assert!(!line.contains("hunter2"));
    }

    #[test]
    fn test_parse_status_line() {
        assert_eq!(
            parse_status_line("Downloaded: Bicep Glue"),
            Some((SldlStatus::Downloaded, "Bicep Glue".to_string()))
        );
        assert_eq!(
            parse_status_line("   Failed:   Four Tet Baby  "),
            Some((SldlStatus::Failed, "Four Tet Baby".to_string()))
        );
        assert_eq!(
            parse_status_line("Waiting: Jay-Z Encore"),
            Some((SldlStatus::Waiting, "Jay-Z Encore".to_string()))
        );
        assert_eq!(
            parse_status_line("[12:01] Downloaded: Bicep Glue"),
            Some((SldlStatus::Downloaded, "Bicep Glue".to_string()))
        );
        assert_eq!(
            parse_status_line("(3/12) Failed: Four Tet Baby"),
            Some((SldlStatus::Failed, "Four Tet Baby".to_string()))
        );
        assert_eq!(parse_status_line("Searching: Bicep Glue"), None);
        assert_eq!(parse_status_line("Downloaded:"), None);
    }

    #[test]
    fn test_pump_lines_survives_invalid_utf8() {
        let input: &[u8] = b"Searching: Caf\xe9 Del Mar\r\nnext\nDownloaded: Bicep Glue";
        let mut lines = Vec::new();
        pump_lines(input, |l| lines.push(l)).unwrap();

        assert_eq!(
            lines,
            vec!["Searching: Caf\u{FFFD} Del Mar", "next", "Downloaded: Bicep Glue"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_run_keeps_reading_after_invalid_utf8() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let script = tmp.path().join("fake-sldl");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             printf 'Searching: Caf\\351 Del Mar\\n'\n\
             i=0\n\
             while [ $i -lt 4000 ]; do echo \"filler line $i\"; i=$((i+1)); done\n\
             echo 'Failed: Four Tet Baby' >&2\n\
             echo 'Downloaded: Bicep Glue'\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut cmd = command();
        cmd.program = script;
        let outcome = cmd.run().unwrap();

        assert!(outcome.status.success(), "{}", outcome.status);
        assert_eq!(outcome.statuses.count(SldlStatus::Downloaded), 1);
        assert_eq!(outcome.statuses.count(SldlStatus::Failed), 1);
    }

    #[test]
    fn test_status_table_latest_wins() {
        let mut table = StatusTable::default();
        table.record("Bicep Glue".to_string(), SldlStatus::Waiting);
        table.record("Four Tet Baby".to_string(), SldlStatus::Failed);
        table.record("Bicep Glue".to_string(), SldlStatus::Downloaded);

        assert_eq!(table.len(), 2);
        assert_eq!(table.count(SldlStatus::Waiting), 0);
        assert_eq!(table.count(SldlStatus::Downloaded), 1);
        let rows: Vec<(&str, SldlStatus)> = table.iter().collect();
        assert_eq!(
            rows,
            vec![("Bicep Glue", SldlStatus::Downloaded), ("Four Tet Baby", SldlStatus::Failed)]
        );
    }
}
