//! Locating driver repositories and nested images on a mounted source.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Marker file identifying a driver repository directory
pub const REPO_MARKER: &str = "rhdd3";

/// The `rpms/<arch>` package directory of `dir`, if `dir` is a repository.
fn repo_packages(dir: &Path, arch: &str) -> Option<PathBuf> {
    let rpms = dir.join("rpms");
    let packages = rpms.join(arch);
    (dir.join(REPO_MARKER).is_file() && rpms.is_dir() && packages.is_dir()).then_some(packages)
}

/// Package directories (`rpms/<arch>`) of every repository under `mount`,
/// at any depth, following symlinks.
pub fn find_repos(mount: &Path, arch: &str) -> Vec<PathBuf> {
    WalkDir::new(mount)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| repo_packages(entry.path(), arch))
        .collect()
}

/// ISO images directly under `mount`. Deeper images are not considered.
pub fn find_isos(mount: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(mount).with_context(|| format!("Failed to list {}", mount.display()))?;

    let mut isos = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name.ends_with(".iso") && entry.path().is_file() {
            isos.push(entry.path());
        }
    }
    isos.sort();
    Ok(isos)
}
