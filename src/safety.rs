//! Guards for destructive filesystem work.
//!
//! Flattening moves files and deletes directories under the download root,
//! so the root must be a real subfolder of the output directory and never
//! the output directory itself or anything above it.

use anyhow::{bail, Result};
use std::path::{Component, Path, PathBuf};

/// Reject folder names that would escape or alias the output directory.
///
/// Sanitized names cannot contain separators, but an empty name or a bare
/// `.`/`..` still slips through.
pub fn validate_folder_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("Safety check failed: folder name is empty after sanitizing");
    }
    if trimmed == "." || trimmed == ".." {
        bail!("Safety check failed: folder name '{}' is not allowed", name);
    }
    if trimmed.contains('/') || trimmed.contains('\\') {
        bail!(
            "Safety check failed: folder name '{}' contains a path separator",
            name
        );
    }
    Ok(())
}

/// Lexically normalize `.` and `..` without touching the filesystem.
fn lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Check that `root` lies strictly below `output_dir` before it is flattened.
///
/// # Returns
/// * `Ok(())` if `root` is a proper descendant
/// * `Err` naming both paths otherwise
pub fn validate_flatten_root(output_dir: &Path, root: &Path) -> Result<()> {
    let base = lexical(output_dir);
    let target = lexical(root);

    if target == base {
        bail!(
            "Safety check failed: refusing to flatten the output directory '{}' itself",
            output_dir.display()
        );
    }
    if !target.starts_with(&base) {
        bail!(
            "Safety check failed: '{}' is not inside output directory '{}'",
            root.display(),
            output_dir.display()
        );
    }
    Ok(())
}
