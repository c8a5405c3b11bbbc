//! Filesystem helpers shared by the pipeline, activation and the ledgers.

use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Create `<stem>1`, or `<stem>2` if that exists, and so on. Returns the new directory.
pub fn mkdir_seq(stem: &Path) -> Result<PathBuf> {
    if let Some(parent) = stem.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let mut n: u32 = 1;
    loop {
        let mut name = OsString::from(stem.as_os_str());
        name.push(n.to_string());
        let dir = PathBuf::from(name);

        match fs::create_dir(&dir) {
            Ok(()) => {
                if !dir.is_dir() {
                    bail!("{} vanished right after creation", dir.display());
                }
                return Ok(dir);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", dir.display()))
            }
        }
    }
}

/// Every non-directory under `topdir` whose file name passes `filter`, in walk order.
pub fn iter_files<F>(topdir: &Path, filter: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> bool,
{
    WalkDir::new(topdir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| !entry.file_type().is_dir())
        .filter(|entry| filter(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Copy files flat into `destdir`, skipping any that already live under it.
pub fn copy_files(files: &[PathBuf], destdir: &Path) -> Result<()> {
    fs::create_dir_all(destdir)
        .with_context(|| format!("Failed to create {}", destdir.display()))?;

    for file in files.iter().filter(|f| !f.starts_with(destdir)) {
        let dest = flat_destination(file, destdir)?;
        fs::copy(file, &dest).with_context(|| {
            format!("Failed to copy {} to {}", file.display(), dest.display())
        })?;
    }

    Ok(())
}

/// Move files flat into `destdir`, skipping any that already live under it.
pub fn move_files(files: &[PathBuf], destdir: &Path) -> Result<()> {
    fs::create_dir_all(destdir)
        .with_context(|| format!("Failed to create {}", destdir.display()))?;

    for file in files.iter().filter(|f| !f.starts_with(destdir)) {
        let dest = flat_destination(file, destdir)?;
        if fs::rename(file, &dest).is_err() {
            // rename(2) cannot cross filesystems
            fs::copy(file, &dest).with_context(|| {
                format!("Failed to move {} to {}", file.display(), dest.display())
            })?;
            fs::remove_file(file)
                .with_context(|| format!("Failed to remove {}", file.display()))?;
        }
    }

    Ok(())
}

fn flat_destination(file: &Path, destdir: &Path) -> Result<PathBuf> {
    let name = file
        .file_name()
        .with_context(|| format!("{} has no file name", file.display()))?;
    Ok(destdir.join(name))
}

/// Append one newline-terminated line with a single write.
pub fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let mut record = line.to_string();
    if !record.ends_with('\n') {
        record.push('\n');
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(record.as_bytes())
        .with_context(|| format!("Failed to append to {}", path.display()))?;

    Ok(())
}

/// Lines of a file without their newlines. A missing file reads as empty.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content.lines().map(str::to_string).collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Recursively copy the contents of `src` into `dst`, keeping symlinks as symlinks.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).with_context(|| format!("Failed to create {}", dst.display()))?;

    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", src.display()))?;
        let rel = entry.path().strip_prefix(src)?;
        if rel.as_os_str().is_empty() {
            continue;
        }

        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            if fs::symlink_metadata(&target).is_ok() {
                fs::remove_file(&target)?;
            }
            std::os::unix::fs::symlink(&link, &target)
                .with_context(|| format!("Failed to link {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }

    Ok(())
}
