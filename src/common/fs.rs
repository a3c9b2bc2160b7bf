use std::{fs, path::{Path, PathBuf}};

use anyhow::{bail, Context, Result};

/// Create the directory if it doesn’t exist; error if a non-directory exists there.
pub(crate) fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            bail!("Path exists but is not a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Error unless `path` is an existing regular file.
pub(crate) fn require_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("File does not exist: {}", path.display());
    }
    if !path.is_file() {
        bail!("Path exists but is not a file: {}", path.display());
    }
    Ok(())
}

/// Directory that will hold `path`, treating a bare file name as the current directory.
pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `path` with its extension replaced by each of `exts`.
pub(crate) fn sibling_paths(path: &Path, exts: &[&str]) -> Vec<PathBuf> {
    exts.iter().map(|ext| path.with_extension(ext)).collect()
}

/// Remove every existing file in `paths`.
pub(crate) fn remove_existing(paths: &[PathBuf]) -> Result<()> {
    for path in paths.iter().filter(|p| p.exists()) {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove existing output {}", path.display()))?;
    }
    Ok(())
}
