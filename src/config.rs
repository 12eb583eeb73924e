//! Credential files and external tool locations.
//!
//! Credentials live in plain `KEY=VALUE` text files next to where the tools
//! are run. A missing file or key is a configuration error and fatal.

use anyhow::{bail, Context, Result};
use rustc_hash::FxHashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const SOULSEEK_CREDENTIALS_FILE: &str = "soulseek_credentials.txt";
pub const SPOTIFY_CREDENTIALS_FILE: &str = "spotify_credentials.txt";

/// Parse `KEY=VALUE` lines. Lines without `=` are ignored; keys and values are trimmed.
pub fn parse_key_values(content: &str) -> FxHashMap<String, String> {
    content
        .lines()
        .filter_map(|line| line.trim().split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

pub fn read_key_values(path: &Path) -> Result<FxHashMap<String, String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Credentials file '{}' not found or unreadable", path.display()))?;
    Ok(parse_key_values(&content))
}

fn required(values: &FxHashMap<String, String>, keys: [&str; 2], path: &Path) -> Result<(String, String)> {
    match (values.get(keys[0]), values.get(keys[1])) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => Ok((a.clone(), b.clone())),
        _ => bail!(
            "{} and {} must both be set in {}",
            keys[0],
            keys[1],
            path.display()
        ),
    }
}

#[derive(Clone)]
pub struct SoulseekCredentials {
    pub user: String,
    pub pass: String,
}

impl SoulseekCredentials {
    pub fn from_file(path: &Path) -> Result<Self> {
        let values = read_key_values(path)?;
        let (user, pass) = required(&values, ["SOULSEEK_USER", "SOULSEEK_PASS"], path)?;
        Ok(Self { user, pass })
    }
}

impl fmt::Debug for SoulseekCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoulseekCredentials")
            .field("user", &self.user)
            .field("pass", &"***")
            .finish()
    }
}

#[derive(Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl SpotifyCredentials {
    pub fn from_file(path: &Path) -> Result<Self> {
        let values = read_key_values(path)?;
        let (client_id, client_secret) = required(&values, ["CLIENT_ID", "CLIENT_SECRET"], path)?;
        Ok(Self {
            client_id,
            client_secret,
        })
    }
}

impl fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

fn sldl_file_name() -> &'static str {
    if cfg!(windows) {
        "sldl.exe"
    } else {
        "sldl"
    }
}

/// Explicit path, else an `sldl` binary next to the running executable, else `sldl` on PATH.
pub fn resolve_sldl_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let sibling = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(sldl_file_name())));
    match sibling {
        Some(p) if p.is_file() => p,
        _ => PathBuf::from(sldl_file_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_key_values() {
        let values = parse_key_values("SOULSEEK_USER = dj\nnoise line\nSOULSEEK_PASS=a=b\n\n");
        assert_eq!(values.get("SOULSEEK_USER").map(String::as_str), Some("dj"));
        // Only the first '=' splits
        assert_eq!(values.get("SOULSEEK_PASS").map(String::as_str), Some("a=b"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_soulseek_credentials_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SOULSEEK_CREDENTIALS_FILE);
        fs::write(&path, "SOULSEEK_USER=dj\nSOULSEEK_PASS=secret\n").unwrap();

        let creds = SoulseekCredentials::from_file(&path).unwrap();
        assert_eq!(creds.user, "dj");
        assert_eq!(creds.pass, "secret");
        assert!(!format!("{:?}", creds).contains("secret"));
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SPOTIFY_CREDENTIALS_FILE);
        fs::write(&path, "CLIENT_ID=abc\nCLIENT_SECRET=\n").unwrap();

        let err = SpotifyCredentials::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("CLIENT_ID and CLIENT_SECRET must both be set"));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = SoulseekCredentials::from_file(Path::new("/nonexistent/creds.txt")).unwrap_err();
        assert!(err.to_string().contains("not found or unreadable"));
    }

    #[test]
    fn test_resolve_sldl_path_explicit() {
        assert_eq!(
            resolve_sldl_path(Some(Path::new("/opt/sldl/sldl"))),
            PathBuf::from("/opt/sldl/sldl")
        );
    }
}
